// Core moderation module - the per-message review pipeline and its records.
// Following the same layout as the review and audit modules.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
