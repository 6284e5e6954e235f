#![forbid(unsafe_code)]

//! Typed publish/subscribe for supervisor notifications.

pub mod event_bus;

pub use event_bus::{EventBus, Subscription};
