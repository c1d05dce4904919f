//! Kafka-compatible transport built on rdkafka.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message as _;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use crate::{ChannelError, Message, MessageChannel, Result};

/// Connection settings for [`KafkaChannel`].
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Comma-separated bootstrap servers.
    pub brokers: String,
    /// Consumer group for the inbound topic.
    pub group_id: String,
    /// Topic this channel consumes.
    pub read_topic: String,
    /// How long a send may wait in the producer queue.
    pub send_timeout: Duration,
    /// Where a new consumer group starts reading: `earliest` or `latest`.
    pub auto_offset_reset: String,
}

impl KafkaConfig {
    /// Creates a config with a 5 second send timeout, reading from the earliest offset.
    pub fn new(
        brokers: impl Into<String>,
        group_id: impl Into<String>,
        read_topic: impl Into<String>,
    ) -> Self {
        Self {
            brokers: brokers.into(),
            group_id: group_id.into(),
            read_topic: read_topic.into(),
            send_timeout: Duration::from_secs(5),
            auto_offset_reset: "earliest".to_string(),
        }
    }
}

/// Channel backed by a Kafka producer and a consumer subscribed to one topic.
pub struct KafkaChannel {
    producer: FutureProducer,
    consumer: StreamConsumer,
    send_timeout: Duration,
}

impl KafkaChannel {
    /// Creates the producer and consumer and subscribes to `config.read_topic`.
    pub fn connect(config: &KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| ChannelError::Connection(format!("Failed to create producer: {e}")))?;

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| ChannelError::Connection(format!("Failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[config.read_topic.as_str()])
            .map_err(|e| {
                ChannelError::Connection(format!(
                    "Failed to subscribe to '{}': {e}",
                    config.read_topic
                ))
            })?;

        tracing::info!(
            brokers = %config.brokers,
            group_id = %config.group_id,
            read_topic = %config.read_topic,
            "Kafka channel connected"
        );

        Ok(Self {
            producer,
            consumer,
            send_timeout: config.send_timeout,
        })
    }
}

#[async_trait]
impl MessageChannel for KafkaChannel {
    async fn send(&self, message: Message) -> Result<()> {
        let record = FutureRecord::to(&message.topic)
            .key(message.key.as_bytes())
            .payload(&message.value);

        match self
            .producer
            .send(record, Timeout::After(self.send_timeout))
            .await
        {
            Ok((partition, offset)) => {
                tracing::debug!(
                    topic = %message.topic,
                    key = %message.key,
                    partition,
                    offset,
                    "message written to Kafka"
                );
                Ok(())
            }
            Err((error, _)) => Err(ChannelError::SendFailed {
                topic: message.topic.clone(),
                reason: error.to_string(),
            }),
        }
    }

    async fn receive(&self) -> Result<Message> {
        let borrowed = self
            .consumer
            .recv()
            .await
            .map_err(|e| ChannelError::ReceiveFailed(e.to_string()))?;

        let key = borrowed
            .key()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .unwrap_or_default();
        let value = borrowed.payload().map(<[u8]>::to_vec).unwrap_or_default();

        Ok(Message {
            topic: borrowed.topic().to_string(),
            key,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kafka_channel_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KafkaChannel>();
    }

    #[test]
    fn config_defaults() {
        let config = KafkaConfig::new("localhost:9092", "inventory-service", "orders");
        assert_eq!(config.send_timeout, Duration::from_secs(5));
        assert_eq!(config.auto_offset_reset, "earliest");
        assert_eq!(config.read_topic, "orders");
    }
}
