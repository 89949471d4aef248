//! Per-instance publish/subscribe channel for lifecycle events

pub mod bus;

pub use bus::{EventBus, Subscriber, Subscription};
