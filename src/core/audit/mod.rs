// Core audit module - best-effort broadcast of review outcomes.

pub mod audit_models;

pub use audit_models::*;

use async_trait::async_trait;

/// Destination for audit entries.
///
/// Fire-and-forget: implementations log delivery problems and never return them.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn emit(&self, entry: AuditEntry);
}
