// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "audit/mod.rs"]
pub mod audit;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "review/mod.rs"]
pub mod review;
