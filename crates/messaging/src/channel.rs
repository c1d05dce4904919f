use std::sync::Arc;

use async_trait::async_trait;

use crate::{Message, Result};

/// Capability to publish and consume messages.
///
/// `send` resolves once the transport has accepted the message. Dropping the
/// returned future abandons the send, which is how callers cancel it.
/// `receive` resolves once one message is available on the channel's inbound
/// topic, or fails with [`ChannelError::Closed`](crate::ChannelError::Closed)
/// once that topic can never yield another message.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Publishes a message to `message.topic`.
    async fn send(&self, message: Message) -> Result<()>;

    /// Waits for the next inbound message.
    async fn receive(&self) -> Result<Message>;
}

#[async_trait]
impl<T: MessageChannel + ?Sized> MessageChannel for Arc<T> {
    async fn send(&self, message: Message) -> Result<()> {
        (**self).send(message).await
    }

    async fn receive(&self) -> Result<Message> {
        (**self).receive().await
    }
}
