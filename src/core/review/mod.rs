// Review module - asks the moderation assistant for a verdict on one message.

pub mod review_models;
pub mod review_service;

pub use review_models::*;
pub use review_service::*;
