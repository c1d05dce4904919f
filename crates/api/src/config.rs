//! Application configuration loaded from environment variables.

use std::str::FromStr;

use messaging::memory::DEFAULT_CAPACITY;

/// Which side of the saga this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceRole {
    /// Order service and order reactor. Reads the `inventory` topic.
    Orders,
    /// Inventory service and inventory reactor. Reads the `orders` topic.
    Inventory,
    /// Both sides in one process.
    #[default]
    All,
}

impl ServiceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceRole::Orders => "orders",
            ServiceRole::Inventory => "inventory",
            ServiceRole::All => "all",
        }
    }

    /// Name reported by `/health`.
    pub fn service_name(&self) -> &'static str {
        match self {
            ServiceRole::Orders => "orders-service",
            ServiceRole::Inventory => "inventory-service",
            ServiceRole::All => "saga-service",
        }
    }

    pub fn runs_orders(&self) -> bool {
        matches!(self, ServiceRole::Orders | ServiceRole::All)
    }

    pub fn runs_inventory(&self) -> bool {
        matches!(self, ServiceRole::Inventory | ServiceRole::All)
    }
}

impl FromStr for ServiceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orders" | "order" => Ok(ServiceRole::Orders),
            "inventory" => Ok(ServiceRole::Inventory),
            "all" => Ok(ServiceRole::All),
            other => Err(format!("unknown service role '{other}'")),
        }
    }
}

/// Message transport selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// In-process bounded queues. Only valid with `ServiceRole::All`.
    #[default]
    Memory,
    /// Kafka-compatible broker. Requires the `kafka` feature.
    Kafka,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(TransportKind::Memory),
            "kafka" => Ok(TransportKind::Kafka),
            other => Err(format!("unknown transport '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` (default `0.0.0.0`), `PORT` (default `8080`)
/// - `RUST_LOG` tracing filter directive (default `info`)
/// - `LOG_FORMAT` `text` or `json` (default `text`)
/// - `SERVICE_ROLE` `orders`, `inventory` or `all` (default `all`)
/// - `DATABASE_URL` PostgreSQL URL; unset selects in-memory stores
/// - `TRANSPORT` `memory` or `kafka` (default `memory`)
/// - `KAFKA_BROKERS` (default `localhost:9092`), `KAFKA_GROUP_ID` (default per role)
/// - `CHANNEL_CAPACITY` in-memory queue size per topic (default `1024`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub role: ServiceRole,
    pub database_url: Option<String>,
    pub transport: TransportKind,
    pub kafka_brokers: String,
    pub kafka_group_id: Option<String>,
    pub channel_capacity: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: parsed("HOST").unwrap_or(defaults.host),
            port: parsed("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: parsed("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parsed("LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_format),
            role: parsed("SERVICE_ROLE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.role),
            database_url: parsed("DATABASE_URL"),
            transport: parsed("TRANSPORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.transport),
            kafka_brokers: parsed("KAFKA_BROKERS").unwrap_or(defaults.kafka_brokers),
            kafka_group_id: parsed("KAFKA_GROUP_ID"),
            channel_capacity: parsed("CHANNEL_CAPACITY")
                .and_then(|v| v.parse().ok())
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.channel_capacity),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Consumer group for the reactor of `role`, unless overridden.
    pub fn group_id_for(&self, role: ServiceRole) -> String {
        self.kafka_group_id
            .clone()
            .unwrap_or_else(|| role.service_name().to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            role: ServiceRole::All,
            database_url: None,
            transport: TransportKind::Memory,
            kafka_brokers: "localhost:9092".to_string(),
            kafka_group_id: None,
            channel_capacity: DEFAULT_CAPACITY,
        }
    }
}
