use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{ChannelError, Message, MessageChannel, Result};

/// Default number of messages a topic queue holds before `send` waits.
pub const DEFAULT_CAPACITY: usize = 1024;

struct Topic {
    /// `None` once the topic is closed.
    sender: Option<mpsc::Sender<Message>>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Message>>>,
}

impl Topic {
    fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender: Some(sender),
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
        }
    }
}

struct BrokerInner {
    capacity: usize,
    topics: Mutex<HashMap<String, Topic>>,
}

/// In-process broker with one bounded FIFO queue per topic.
///
/// Topics are created on first use. Channels reading the same topic compete for
/// its messages, so each message is delivered to exactly one of them.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<BrokerInner>,
}

impl InMemoryBroker {
    /// Creates a broker whose topic queues hold at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                capacity: capacity.max(1),
                topics: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns a channel that publishes to any topic and consumes `read_topic`.
    pub fn channel(&self, read_topic: impl Into<String>) -> InMemoryChannel {
        let read_topic = read_topic.into();
        let receiver = self.with_topic(&read_topic, |topic| topic.receiver.clone());
        InMemoryChannel {
            broker: self.clone(),
            read_topic,
            receiver,
        }
    }

    /// Closes a topic.
    ///
    /// Further sends fail. Messages already queued are still delivered, after
    /// which receivers observe [`ChannelError::Closed`].
    pub fn close(&self, topic: &str) {
        self.with_topic(topic, |topic| topic.sender = None);
        tracing::debug!(topic, "in-memory topic closed");
    }

    fn sender(&self, topic: &str) -> Option<mpsc::Sender<Message>> {
        self.with_topic(topic, |topic| topic.sender.clone())
    }

    fn with_topic<T>(&self, name: &str, f: impl FnOnce(&mut Topic) -> T) -> T {
        let mut topics = self
            .inner
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let capacity = self.inner.capacity;
        let topic = topics
            .entry(name.to_string())
            .or_insert_with(|| Topic::new(capacity));
        f(topic)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A channel bound to an [`InMemoryBroker`].
#[derive(Clone)]
pub struct InMemoryChannel {
    broker: InMemoryBroker,
    read_topic: String,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Message>>>,
}

impl InMemoryChannel {
    /// The topic this channel consumes.
    pub fn read_topic(&self) -> &str {
        &self.read_topic
    }
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn send(&self, message: Message) -> Result<()> {
        let Some(sender) = self.broker.sender(&message.topic) else {
            return Err(ChannelError::SendFailed {
                topic: message.topic,
                reason: "topic closed".to_string(),
            });
        };

        sender
            .send(message)
            .await
            .map_err(|mpsc::error::SendError(message)| ChannelError::SendFailed {
                topic: message.topic,
                reason: "topic closed".to_string(),
            })
    }

    async fn receive(&self) -> Result<Message> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await.ok_or(ChannelError::Closed)
    }
}
