use crate::core::review::{
    ReviewBackend, ReviewConfig, ReviewError, ReviewJob, RunState, ThreadMessage,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// OpenAI Assistants (v2) client. Only the three calls the review cycle needs.
pub struct OpenAiAssistantsClient {
    client: Client,
    base_url: String,
}

impl OpenAiAssistantsClient {
    pub fn new(api_key: &str, base_url: impl Into<String>) -> Result<Self, ReviewError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| ReviewError::Protocol(e.to_string()))?,
        );
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ReviewError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ReviewError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ReviewError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl ReviewBackend for OpenAiAssistantsClient {
    async fn create_run(
        &self,
        text: &str,
        config: &ReviewConfig,
    ) -> Result<ReviewJob, ReviewError> {
        let payload = create_run_payload(text, config);

        let response = self
            .client
            .post(format!("{}/threads/runs", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ReviewError::Transport(e.to_string()))?;

        let run: ApiRun = Self::decode(response).await?;
        Ok(ReviewJob {
            thread_id: run.thread_id,
            run_id: run.id,
        })
    }

    async fn run_state(&self, job: &ReviewJob) -> Result<RunState, ReviewError> {
        let response = self
            .client
            .get(format!(
                "{}/threads/{}/runs/{}",
                self.base_url, job.thread_id, job.run_id
            ))
            .send()
            .await
            .map_err(|e| ReviewError::Transport(e.to_string()))?;

        let run: ApiRunStatus = Self::decode(response).await?;
        Ok(RunState::from_api_status(&run.status))
    }

    async fn thread_messages(&self, job: &ReviewJob) -> Result<Vec<ThreadMessage>, ReviewError> {
        let response = self
            .client
            .get(format!("{}/threads/{}/messages", self.base_url, job.thread_id))
            .send()
            .await
            .map_err(|e| ReviewError::Transport(e.to_string()))?;

        let list: ApiMessageList = Self::decode(response).await?;
        Ok(list.data.into_iter().map(ThreadMessage::from).collect())
    }
}

/// Body of `POST /threads/runs`: a fresh thread holding the one user message.
fn create_run_payload(text: &str, config: &ReviewConfig) -> Value {
    json!({
        "assistant_id": config.assistant_id,
        "thread": {
            "messages": [
                { "role": "user", "content": text }
            ]
        },
        "temperature": config.temperature,
        "top_p": config.top_p,
    })
}

#[derive(Debug, Deserialize)]
struct ApiRun {
    id: String,
    thread_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiRunStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessageList {
    data: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    content: Vec<ApiContent>,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<ApiText>,
}

#[derive(Debug, Deserialize)]
struct ApiText {
    value: String,
}

impl From<ApiMessage> for ThreadMessage {
    fn from(api: ApiMessage) -> Self {
        // Only text parts matter; image parts and the like are skipped.
        let text = api
            .content
            .into_iter()
            .filter(|part| part.kind == "text")
            .filter_map(|part| part.text.map(|t| t.value))
            .collect::<Vec<_>>()
            .join("\n");

        ThreadMessage {
            role: api.role,
            created_at: api.created_at,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_list_decoding() {
        let body = r#"{
            "object": "list",
            "data": [
                {
                    "id": "msg_2",
                    "role": "assistant",
                    "created_at": 1700000010,
                    "content": [
                        {"type": "text", "text": {"value": "{\"status\": \"approve\", \"feedback\": \"\"}", "annotations": []}}
                    ]
                },
                {
                    "id": "msg_1",
                    "role": "user",
                    "created_at": 1700000000,
                    "content": [
                        {"type": "image_file", "image_file": {"file_id": "file_1"}},
                        {"type": "text", "text": {"value": "hello", "annotations": []}}
                    ]
                }
            ],
            "has_more": false
        }"#;

        let list: ApiMessageList = serde_json::from_str(body).unwrap();
        let messages: Vec<ThreadMessage> = list.data.into_iter().map(ThreadMessage::from).collect();

        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_assistant());
        assert_eq!(messages[0].created_at, 1700000010);
        assert_eq!(messages[0].text, r#"{"status": "approve", "feedback": ""}"#);
        assert_eq!(messages[1].text, "hello");
    }

    #[test]
    fn test_run_decoding() {
        let run: ApiRun = serde_json::from_str(
            r#"{"id": "run_abc", "object": "thread.run", "thread_id": "thread_xyz", "status": "queued"}"#,
        )
        .unwrap();
        assert_eq!(run.id, "run_abc");
        assert_eq!(run.thread_id, "thread_xyz");

        let status: ApiRunStatus =
            serde_json::from_str(r#"{"id": "run_abc", "status": "in_progress"}"#).unwrap();
        assert_eq!(RunState::from_api_status(&status.status), RunState::Pending);
    }

    #[test]
    fn test_create_run_payload() {
        let config = ReviewConfig::new("asst_123");
        let payload = create_run_payload("hello world", &config);

        assert_eq!(payload["assistant_id"], "asst_123");
        assert_eq!(payload["temperature"], 0.4);
        assert_eq!(payload["top_p"], 0.8);
        assert_eq!(payload["thread"]["messages"][0]["role"], "user");
        assert_eq!(payload["thread"]["messages"][0]["content"], "hello world");

        // The trailing delimiter rules out a widened float sharing the prefix.
        let wire = serde_json::to_string(&payload).unwrap();
        assert!(wire.contains(r#""temperature":0.4,"#));
        assert!(wire.contains(r#""top_p":0.8}"#));
    }

    #[test]
    fn test_client_builds_with_key() {
        assert!(OpenAiAssistantsClient::new("sk-test", "https://api.openai.com/v1").is_ok());
        assert!(OpenAiAssistantsClient::new("bad\nkey", "https://api.openai.com/v1").is_err());
    }
}
