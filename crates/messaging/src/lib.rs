//! Message channel abstraction for the order/inventory saga.
//!
//! A channel is an ordered byte-payload transport addressed by topic, with a
//! short string key identifying the event type. Services only need two
//! capabilities from it: publish a message and block until the next inbound
//! message is available. Delivery guarantees (at-least-once, per-partition
//! ordering) come from the underlying transport; the channel adds no buffering,
//! retry or deduplication of its own.

pub mod channel;
pub mod error;
pub mod fake;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod message;

pub use channel::MessageChannel;
pub use error::{ChannelError, Result};
pub use fake::FakeChannel;
#[cfg(feature = "kafka")]
pub use kafka::{KafkaChannel, KafkaConfig};
pub use memory::{InMemoryBroker, InMemoryChannel};
pub use message::Message;
