pub mod webhook_sink;

pub use webhook_sink::WebhookAuditSink;
