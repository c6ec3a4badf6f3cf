//! Broadcast hub: event types and subscriber fan-out.

pub mod broadcast;
pub mod events;

pub use broadcast::{BroadcastHub, Fanout, Subscriber, SubscriberId, DEFAULT_SUBSCRIBER_CAPACITY};
pub use events::{Event, Sample, TapClass, TapEvent};
