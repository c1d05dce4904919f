/// A single message carried on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Destination stream name.
    pub topic: String,
    /// Event-type discriminator. Determines how `value` must be decoded.
    pub key: String,
    /// Opaque payload bytes.
    pub value: Vec<u8>,
}

impl Message {
    /// Creates a new message.
    pub fn new(
        topic: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Lossy UTF-8 view of the payload, for logging.
    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    /// Hex encoding of the key bytes.
    ///
    /// Keys are compared byte-for-byte, so a key that looks right in a log line
    /// but carries stray bytes shows up here.
    pub fn key_hex(&self) -> String {
        self.key.bytes().map(|b| format!("{b:02x}")).collect()
    }
}
