pub mod openai_assistants_client;

pub use openai_assistants_client::OpenAiAssistantsClient;
