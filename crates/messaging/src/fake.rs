use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::{ChannelError, Message, MessageChannel, Result};

#[derive(Debug, Default)]
struct FakeState {
    sent: Vec<Message>,
    inbound: VecDeque<Message>,
    fail_sends: bool,
}

/// Deterministic channel for tests.
///
/// Records every message sent through it and replays scripted inbound
/// messages in FIFO order. Once the script is exhausted `receive` reports
/// [`ChannelError::Closed`], which ends any consumer loop reading from it.
#[derive(Debug, Clone, Default)]
pub struct FakeChannel {
    state: Arc<Mutex<FakeState>>,
}

impl FakeChannel {
    /// Creates an empty fake channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message to be returned by a later `receive`.
    pub fn push_inbound(&self, message: Message) {
        self.state().inbound.push_back(message);
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.state().fail_sends = fail;
    }

    /// All messages sent so far, in send order.
    pub fn sent(&self) -> Vec<Message> {
        self.state().sent.clone()
    }

    /// Messages sent to `topic`, in send order.
    pub fn sent_to(&self, topic: &str) -> Vec<Message> {
        self.state()
            .sent
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Number of scripted messages not yet received.
    pub fn pending_inbound(&self) -> usize {
        self.state().inbound.len()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MessageChannel for FakeChannel {
    async fn send(&self, message: Message) -> Result<()> {
        let mut state = self.state();
        if state.fail_sends {
            return Err(ChannelError::SendFailed {
                topic: message.topic,
                reason: "send failure injected".to_string(),
            });
        }
        state.sent.push(message);
        Ok(())
    }

    async fn receive(&self) -> Result<Message> {
        self.state().inbound.pop_front().ok_or(ChannelError::Closed)
    }
}
