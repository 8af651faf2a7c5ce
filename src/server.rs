//! Node Assembly
//!
//! Wires storage, the peer client, the coordinator and the HTTP router into a
//! running node. Used by the binary and by the integration tests.

use crate::config::NodeConfig;
use crate::replication::coordinator::Coordinator;
use crate::replication::handlers::{handle_delete, handle_get, handle_put, handle_status};
use crate::replication::peer::HttpPeerClient;
use crate::replication::protocol::{ENDPOINT_ENTITY, ENDPOINT_STATUS};
use crate::storage::engine::{ByteStore, FjallStore, MemoryStore};
use crate::storage::local::LocalStore;
use crate::storage::sweeper::ExpirySweeper;

use anyhow::Context;
use axum::{Extension, Router, routing::get};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route(ENDPOINT_STATUS, get(handle_status))
        .route(
            ENDPOINT_ENTITY,
            get(handle_get).put(handle_put).delete(handle_delete),
        )
        .layer(Extension(coordinator))
}

pub struct Node {
    pub coordinator: Arc<Coordinator>,
    pub store: Arc<LocalStore>,
    pub sweeper: Arc<ExpirySweeper>,
}

impl Node {
    pub fn build(config: &NodeConfig) -> anyhow::Result<Self> {
        let engine: Arc<dyn ByteStore> = match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).context("create data dir")?;
                Arc::new(FjallStore::open(dir).context("open fjall store")?)
            }
            None => {
                tracing::info!("No data dir given, keeping records in memory");
                Arc::new(MemoryStore::new())
            }
        };

        let store = Arc::new(
            LocalStore::new(engine).with_tombstone_retention(config.tombstone_retention_ms),
        );
        let peers = Arc::new(HttpPeerClient::new(config.peer_timeout).context("build peer client")?);

        let coordinator = Arc::new(
            Coordinator::new(Arc::new(config.topology.clone()), store.clone(), peers)
                .with_default_replicas(config.default_replicas)
                .with_default_ttl(config.default_ttl_ms),
        );

        let sweeper = ExpirySweeper::new(store.clone(), config.sweep_policy, config.sweep_interval);

        Ok(Self {
            coordinator,
            store,
            sweeper,
        })
    }

    /// Serves HTTP on `listener` until `shutdown` resolves, with the expiry
    /// sweeper running alongside. Flushes storage on the way out.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let topology = self.coordinator.topology();
        tracing::info!(
            "Node {} of {} listening on {} (default replicas {})",
            topology.url(topology.local()),
            topology.size(),
            listener.local_addr()?,
            self.coordinator.default_replicas()
        );

        let sweeper_handle = self.sweeper.clone().start();

        let app = router(self.coordinator.clone());
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        sweeper_handle.abort();
        if let Err(e) = self.store.flush() {
            tracing::error!("Failed to flush store on shutdown: {}", e);
        }

        served.context("http server")
    }
}
