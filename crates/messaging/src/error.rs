use thiserror::Error;

/// Errors raised by a message channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The transport refused or failed to accept a message.
    #[error("Failed to send message to topic '{topic}': {reason}")]
    SendFailed { topic: String, reason: String },

    /// Reading the next message failed. The channel is still usable.
    #[error("Failed to receive message: {0}")]
    ReceiveFailed(String),

    /// The inbound stream is closed and drained; no further messages will arrive.
    #[error("Channel closed")]
    Closed,

    /// The transport could not be set up.
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
