//! Process wiring: stores, transport, reactors and routes for a role.

use std::sync::Arc;

use axum::Router;
use messaging::{InMemoryBroker, MessageChannel};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    INVENTORY_TOPIC, InventoryReactor, InventoryService, ORDERS_TOPIC, OrderReactor, OrderService,
    ReactorHandle, reactor,
};
use store::{
    InMemoryInventoryStore, InMemoryOrderStore, InventoryStore, OrderStore,
    PostgresInventoryStore, PostgresOrderStore,
};

use crate::config::{Config, ServiceRole, TransportKind};
use crate::error::StartupError;

/// A started process: the HTTP app plus the reactors running behind it.
pub struct Runtime {
    app: Router,
    reactors: Vec<ReactorHandle>,
}

impl Runtime {
    /// The router to serve.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Names of the running reactors.
    pub fn reactors(&self) -> Vec<&'static str> {
        self.reactors.iter().map(ReactorHandle::name).collect()
    }

    /// Stops every reactor and waits for their loops to exit.
    pub async fn shutdown(self) {
        stop_all(self.reactors).await;
        tracing::info!("reactors stopped");
    }
}

struct Stores {
    orders: Arc<dyn OrderStore>,
    inventory: Arc<dyn InventoryStore>,
}

async fn open_stores(config: &Config) -> Result<Stores, StartupError> {
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = store::postgres::connect(url).await?;
            store::postgres::run_migrations(&pool).await?;
            tracing::info!("connected to PostgreSQL, migrations applied");

            Ok(Stores {
                orders: Arc::new(PostgresOrderStore::new(pool.clone())),
                inventory: Arc::new(PostgresInventoryStore::new(pool)),
            })
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            Ok(Stores {
                orders: Arc::new(InMemoryOrderStore::new()),
                inventory: Arc::new(InMemoryInventoryStore::new()),
            })
        }
    }
}

enum Transport {
    Memory(InMemoryBroker),
    #[cfg(feature = "kafka")]
    Kafka,
}

impl Transport {
    fn from_config(config: &Config) -> Result<Self, StartupError> {
        match config.transport {
            TransportKind::Memory => {
                if config.role != ServiceRole::All {
                    return Err(StartupError::MemoryTransportSplitRole {
                        role: config.role.as_str(),
                    });
                }
                Ok(Transport::Memory(InMemoryBroker::new(
                    config.channel_capacity,
                )))
            }
            #[cfg(feature = "kafka")]
            TransportKind::Kafka => Ok(Transport::Kafka),
            #[cfg(not(feature = "kafka"))]
            TransportKind::Kafka => Err(StartupError::KafkaUnsupported),
        }
    }

    /// A channel that publishes anywhere and consumes `read_topic`.
    #[cfg_attr(not(feature = "kafka"), allow(unused_variables))]
    fn channel(
        &self,
        config: &Config,
        role: ServiceRole,
        read_topic: &str,
    ) -> Result<Arc<dyn MessageChannel>, StartupError> {
        match self {
            Transport::Memory(broker) => Ok(Arc::new(broker.channel(read_topic))),
            #[cfg(feature = "kafka")]
            Transport::Kafka => {
                let kafka = messaging::KafkaConfig::new(
                    config.kafka_brokers.as_str(),
                    config.group_id_for(role),
                    read_topic,
                );
                Ok(Arc::new(messaging::KafkaChannel::connect(&kafka)?))
            }
        }
    }
}

/// Opens the stores and transport, starts the reactors of `config.role` and
/// builds the HTTP app.
///
/// If any step fails after a reactor has started, the reactors already
/// running are stopped before the error is returned.
pub async fn start(
    config: &Config,
    metrics_handle: PrometheusHandle,
) -> Result<Runtime, StartupError> {
    describe_metrics();
    let stores = open_stores(config).await?;
    let transport = Transport::from_config(config)?;
    launch(config, &stores, &transport, metrics_handle).await
}

async fn launch(
    config: &Config,
    stores: &Stores,
    transport: &Transport,
    metrics_handle: PrometheusHandle,
) -> Result<Runtime, StartupError> {
    let mut reactors = Vec::new();

    let role_routes = match start_roles(config, stores, transport, &mut reactors).await {
        Ok(routes) => routes,
        Err(error) => {
            stop_all(reactors).await;
            return Err(error);
        }
    };

    tracing::info!(
        role = config.role.as_str(),
        reactors = reactors.len(),
        "runtime started"
    );

    Ok(Runtime {
        app: crate::create_app(config.role.service_name(), role_routes, metrics_handle),
        reactors,
    })
}

async fn start_roles(
    config: &Config,
    stores: &Stores,
    transport: &Transport,
    reactors: &mut Vec<ReactorHandle>,
) -> Result<Router, StartupError> {
    let mut role_routes = Router::new();

    if config.role.runs_inventory() {
        let channel = transport.channel(config, ServiceRole::Inventory, ORDERS_TOPIC)?;
        let reactor = InventoryReactor::new(stores.inventory.clone(), channel.clone());
        reactors.push(reactor::spawn(reactor, channel.clone()).await?);

        let service = Arc::new(InventoryService::new(stores.inventory.clone(), channel));
        role_routes = role_routes.merge(crate::create_inventory_router(service));
    }

    if config.role.runs_orders() {
        let channel = transport.channel(config, ServiceRole::Orders, INVENTORY_TOPIC)?;
        let reactor = OrderReactor::new(stores.orders.clone());
        reactors.push(reactor::spawn(reactor, channel.clone()).await?);

        let service = Arc::new(OrderService::new(stores.orders.clone(), channel));
        role_routes = role_routes.merge(crate::create_orders_router(service));
    }

    Ok(role_routes)
}

fn describe_metrics() {
    metrics::describe_counter!(
        "saga_messages_received_total",
        "Messages read by a reactor loop"
    );
    metrics::describe_counter!(
        "saga_messages_ignored_total",
        "Messages dropped because of an unknown key"
    );
    metrics::describe_counter!(
        "saga_handler_errors_total",
        "Messages whose handler returned an error"
    );
    metrics::describe_counter!(
        "saga_compensations_total",
        "RevertOrder events emitted, by reason"
    );
    metrics::describe_counter!(
        "saga_compensation_publish_failures_total",
        "RevertOrder events that could not be published"
    );
    metrics::describe_counter!("inventory_reservations_total", "Successful stock reservations");
    metrics::describe_counter!("orders_created_total", "Orders persisted by the order service");
    metrics::describe_counter!("orders_canceled_total", "Orders canceled by a compensation");
    metrics::describe_histogram!(
        "saga_handler_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent handling one message"
    );
}

async fn stop_all(reactors: Vec<ReactorHandle>) {
    for handle in reactors {
        let name = handle.name();
        handle.stop().await;
        tracing::debug!(reactor = name, "reactor stopped");
    }
}
