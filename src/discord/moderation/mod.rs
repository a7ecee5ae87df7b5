// Discord-side moderation adapters: the message listener and the DM notifier.

pub mod dm_notifier;
pub mod events;

pub use dm_notifier::DmNotifier;
