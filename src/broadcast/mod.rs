//! Live observer notifications.

pub mod hub;

pub use hub::{BroadcastHub, Broadcaster, PipelineEvent, Subscription};
