//! Long-lived consumer loop shared by both reactors.

use std::time::Instant;

use async_trait::async_trait;
use messaging::{ChannelError, Message, MessageChannel};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{Result, SagaError};

/// What a reactor did with one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The key was recognized and its handler ran to completion. Keys that
    /// are part of the protocol but need no action here also count as handled.
    Handled,
    /// The key is not one this reactor handles; the message was dropped.
    Ignored,
}

/// A consumer that reacts to events read from one topic.
#[async_trait]
pub trait Reactor: Send + Sync + 'static {
    /// Name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Checks that the reactor's store is reachable.
    async fn health_check(&self) -> store::Result<()>;

    /// Routes a message to its handler by key.
    ///
    /// Unknown keys return `Ok(Dispatch::Ignored)`, never an error.
    async fn dispatch(&self, message: &Message) -> Result<Dispatch>;
}

/// Handle to a running reactor loop.
///
/// Dropping the handle also stops the loop once any in-flight handler returns.
pub struct ReactorHandle {
    name: &'static str,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ReactorHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the loop and waits for it to exit.
    ///
    /// A blocked `receive` is abandoned. A handler that is already running
    /// completes first.
    pub async fn stop(self) {
        let ReactorHandle {
            name,
            shutdown,
            task,
        } = self;
        let _ = shutdown.send(());
        wait(name, task).await;
    }

    /// Waits for the loop to exit on its own, i.e. when its channel closes.
    pub async fn join(self) {
        let ReactorHandle {
            name,
            shutdown,
            task,
        } = self;
        wait(name, task).await;
        drop(shutdown);
    }
}

async fn wait(name: &'static str, task: JoinHandle<()>) {
    if let Err(error) = task.await {
        tracing::error!(reactor = name, %error, "reactor task failed");
    }
}

/// Starts a reactor reading from `channel`.
///
/// The store health check runs first. If it fails the loop is never started
/// and `SagaError::StoreUnavailable` is returned; there is no retry.
pub async fn spawn<R, C>(reactor: R, channel: C) -> Result<ReactorHandle>
where
    R: Reactor,
    C: MessageChannel + 'static,
{
    let name = reactor.name();
    if let Err(source) = reactor.health_check().await {
        tracing::error!(
            reactor = name,
            error = %source,
            "store health check failed, reactor not started"
        );
        return Err(SagaError::StoreUnavailable {
            reactor: name,
            source,
        });
    }

    let (shutdown, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(run(reactor, channel, shutdown_rx));

    Ok(ReactorHandle {
        name,
        shutdown,
        task,
    })
}

async fn run<R, C>(reactor: R, channel: C, mut shutdown: oneshot::Receiver<()>)
where
    R: Reactor,
    C: MessageChannel,
{
    let name = reactor.name();
    tracing::info!(reactor = name, "reactor started");

    loop {
        let received = tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(reactor = name, "reactor stopping");
                break;
            }
            received = channel.receive() => received,
        };

        match received {
            Ok(message) => process(&reactor, &message).await,
            Err(ChannelError::Closed) => {
                tracing::info!(reactor = name, "channel closed, reactor exiting");
                break;
            }
            Err(error) => {
                tracing::error!(reactor = name, %error, "failed to receive message");
            }
        }
    }
}

async fn process<R: Reactor>(reactor: &R, message: &Message) {
    let name = reactor.name();
    let started = Instant::now();
    metrics::counter!("saga_messages_received_total", "reactor" => name).increment(1);

    tracing::info!(
        reactor = name,
        topic = %message.topic,
        key = %message.key,
        key_hex = %message.key_hex(),
        value = %message.value_str(),
        "message received"
    );

    match reactor.dispatch(message).await {
        Ok(Dispatch::Handled) => {}
        Ok(Dispatch::Ignored) => {
            metrics::counter!("saga_messages_ignored_total", "reactor" => name).increment(1);
            tracing::warn!(reactor = name, key = %message.key, "unknown message key, dropped");
        }
        Err(error) => {
            metrics::counter!("saga_handler_errors_total", "reactor" => name).increment(1);
            tracing::error!(reactor = name, key = %message.key, %error, "failed to handle message");
        }
    }

    metrics::histogram!("saga_handler_duration_seconds", "reactor" => name)
        .record(started.elapsed().as_secs_f64());
}
