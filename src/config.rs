// Startup configuration, read once from the environment.
//
// The resulting `Config` is immutable and handed to constructors in `main`.
// Nothing else in the bot reads environment variables.

use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_DB_FILE: &str = "moderation_logs.db";
const DEFAULT_LOG_LEVEL: &str = "INFO";
const DEFAULT_LOG_FILE: &str = "discord_moderator.log";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    /// The only channel whose messages are reviewed.
    pub channel_id: u64,
    pub openai_api_key: String,
    pub assistant_id: String,
    pub openai_base_url: String,
    /// Audit webhook. `None` disables audit delivery entirely.
    pub webhook_url: Option<String>,
    pub db_file: PathBuf,
    pub log_level: String,
    pub log_file: PathBuf,
    /// Records older than this are purged at startup.
    pub retention_days: u32,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset. Every missing required variable is
    /// reported at once rather than failing on the first.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN");
        let channel_raw = get("CHANNEL_ID");
        let openai_api_key = get("OPENAI_API_KEY");
        let assistant_id = get("ASSISTANT_ID");

        let mut missing = Vec::new();
        if discord_token.is_none() {
            missing.push("DISCORD_TOKEN");
        }
        if channel_raw.is_none() {
            missing.push("CHANNEL_ID");
        }
        if openai_api_key.is_none() {
            missing.push("OPENAI_API_KEY");
        }
        if assistant_id.is_none() {
            missing.push("ASSISTANT_ID");
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let channel_raw = channel_raw.unwrap_or_default();
        let channel_id = match channel_raw.trim().parse::<u64>() {
            Ok(id) if id != 0 => id,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "CHANNEL_ID",
                    value: channel_raw,
                })
            }
        };

        let retention_days = match get("LOG_RETENTION_DAYS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::Invalid {
                    var: "LOG_RETENTION_DAYS",
                    value: raw.clone(),
                })?,
            None => DEFAULT_RETENTION_DAYS,
        };

        Ok(Self {
            discord_token: discord_token.unwrap_or_default(),
            channel_id,
            openai_api_key: openai_api_key.unwrap_or_default(),
            assistant_id: assistant_id.unwrap_or_default(),
            openai_base_url: get("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            webhook_url: get("WEBHOOK_URL"),
            db_file: get("DB_FILE")
                .unwrap_or_else(|| DEFAULT_DB_FILE.to_string())
                .into(),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_file: get("LOG_FILE")
                .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())
                .into(),
            retention_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DISCORD_TOKEN", "token"),
        ("CHANNEL_ID", "1234"),
        ("OPENAI_API_KEY", "sk-test"),
        ("ASSISTANT_ID", "asst_1"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.channel_id, 1234);
        assert_eq!(config.webhook_url, None);
        assert_eq!(config.db_file, PathBuf::from("moderation_logs.db"));
        assert_eq!(config.log_level, "INFO");
        assert_eq!(config.log_file, PathBuf::from("discord_moderator.log"));
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.retention_days, 30);
    }

    #[test]
    fn test_all_missing_vars_reported() {
        let err = Config::from_lookup(lookup_from(&[("CHANNEL_ID", "1")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec!["DISCORD_TOKEN", "OPENAI_API_KEY", "ASSISTANT_ID"])
        );
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: DISCORD_TOKEN, OPENAI_API_KEY, ASSISTANT_ID"
        );
    }

    #[test]
    fn test_zero_channel_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("CHANNEL_ID", "0");
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "CHANNEL_ID", .. }));
    }

    #[test]
    fn test_empty_webhook_means_unset() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WEBHOOK_URL", "  "));
        pairs.push(("OPENAI_BASE_URL", "http://localhost:8080/v1/"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.webhook_url, None);
        assert_eq!(config.openai_base_url, "http://localhost:8080/v1");
    }
}
