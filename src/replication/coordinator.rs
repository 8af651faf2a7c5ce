//! Request Coordinator
//!
//! Every node can coordinate any request. For a client request the coordinator
//! picks the replica set for the key, sends the same proxied operation to each
//! replica concurrently (itself included, through the local store), counts
//! acknowledgements and resolves what the client sees.
//!
//! ## Resolution Rules
//! - **Reads**: at least `ack` replicas must answer. The answer with the
//!   greatest timestamp wins; ties go to the earliest replica in placement
//!   order. A winning tombstone or "no entry" is a miss. A winning value whose
//!   TTL has passed is tombstoned on the replica set and reported as a miss.
//! - **Writes**: success once `ack` replicas applied the write. The timestamp
//!   is taken once per request and shipped to every replica, so all copies of
//!   one write carry the same timestamp.
//!
//! No request is retried here; falling short of `ack` is final.

use super::peer::PeerClient;
use crate::cluster::replicas::{ReplicationSpec, ReplicationSpecError};
use crate::cluster::selector::select_replicas;
use crate::cluster::types::{ClusterConfig, NodeIndex};
use crate::storage::local::{LocalStore, StoreError};
use crate::storage::record::{Record, RecordState, expiry_after, now_ms};

use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    InvalidReplicas(#[from] ReplicationSpecError),
    #[error("quorum not reached: need {needed}, got {got}")]
    Timeout { needed: usize, got: usize },
}

/// What a client read resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    Found(Vec<u8>),
    NotFound,
}

#[derive(Debug, Clone, Copy)]
enum WriteOp<'a> {
    Put { payload: &'a [u8], ttl: i64 },
    Delete,
}

pub struct Coordinator {
    topology: Arc<ClusterConfig>,
    store: Arc<LocalStore>,
    peers: Arc<dyn PeerClient>,
    default_replicas: ReplicationSpec,
    default_ttl_ms: Option<u64>,
}

impl Coordinator {
    /// Creates a coordinator using the majority spec as the default.
    pub fn new(
        topology: Arc<ClusterConfig>,
        store: Arc<LocalStore>,
        peers: Arc<dyn PeerClient>,
    ) -> Self {
        let default_replicas = ReplicationSpec::majority(topology.size());
        Self {
            topology,
            store,
            peers,
            default_replicas,
            default_ttl_ms: None,
        }
    }

    pub fn with_default_replicas(mut self, spec: ReplicationSpec) -> Self {
        self.default_replicas = spec;
        self
    }

    /// Lifetime given to writes that do not carry an explicit TTL.
    /// `None` means such writes never expire.
    pub fn with_default_ttl(mut self, ttl_ms: Option<u64>) -> Self {
        self.default_ttl_ms = ttl_ms;
        self
    }

    pub fn topology(&self) -> &ClusterConfig {
        &self.topology
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn default_replicas(&self) -> ReplicationSpec {
        self.default_replicas
    }

    // ============================================================
    // PROXIED (LOCAL) BRANCH
    // ============================================================

    /// Reads the local copy. A missing key yields [`Record::unknown`].
    pub fn local_get(&self, id: &str) -> Result<Record, StoreError> {
        match self.store.get(id.as_bytes()) {
            Ok(record) => Ok(record),
            Err(StoreError::NotFound) => Ok(Record::unknown()),
            Err(e) => Err(e),
        }
    }

    /// Applies a replica write. Missing `timestamp` means "now"; missing
    /// `ttl` means the configured default lifetime.
    pub fn local_put(
        &self,
        id: &str,
        payload: Vec<u8>,
        timestamp: Option<i64>,
        ttl: Option<i64>,
    ) -> Result<(), StoreError> {
        let timestamp = timestamp.unwrap_or_else(now_ms);
        let ttl = ttl.unwrap_or_else(|| expiry_after(timestamp, self.default_ttl_ms));
        self.store
            .put(id.as_bytes(), &Record::present(payload, timestamp, ttl))
    }

    pub fn local_delete(&self, id: &str, timestamp: Option<i64>) -> Result<(), StoreError> {
        self.store
            .delete(id.as_bytes(), timestamp.unwrap_or_else(now_ms))
    }

    // ============================================================
    // COORDINATING BRANCH
    // ============================================================

    pub async fn get(&self, id: &str, replicas: Option<&str>) -> Result<GetOutcome, CoordinatorError> {
        let (spec, nodes) = self.plan(id, replicas)?;
        let responses = self.fan_out_get(id, &nodes).await;

        if responses.len() < spec.ack {
            tracing::warn!(
                "GET {}: {} of {} replicas answered, need {}",
                id,
                responses.len(),
                spec.from,
                spec.ack
            );
            return Err(CoordinatorError::Timeout {
                needed: spec.ack,
                got: responses.len(),
            });
        }

        let Some(winner) = resolve_latest(&responses) else {
            return Ok(GetOutcome::NotFound);
        };

        match winner.state {
            RecordState::Present => {
                let now = now_ms();
                if !winner.is_expired(now) {
                    return Ok(GetOutcome::Found(winner.payload.clone()));
                }

                // The tombstone must beat the expired value everywhere.
                let timestamp = now.max(winner.timestamp.saturating_add(1));
                let acked = self
                    .fan_out_write(id, WriteOp::Delete, timestamp, &nodes)
                    .await;
                tracing::debug!(
                    "GET {}: value expired at {}, tombstoned on {}/{} replicas",
                    id,
                    winner.ttl,
                    acked,
                    nodes.len()
                );
                Ok(GetOutcome::NotFound)
            }
            RecordState::Deleted | RecordState::Unknown => Ok(GetOutcome::NotFound),
        }
    }

    /// `ttl` is an absolute expiry; `None` applies the default lifetime.
    pub async fn put(
        &self,
        id: &str,
        payload: &[u8],
        replicas: Option<&str>,
        ttl: Option<i64>,
    ) -> Result<(), CoordinatorError> {
        let (spec, nodes) = self.plan(id, replicas)?;
        let timestamp = now_ms();
        let ttl = ttl.unwrap_or_else(|| expiry_after(timestamp, self.default_ttl_ms));

        let acked = self
            .fan_out_write(id, WriteOp::Put { payload, ttl }, timestamp, &nodes)
            .await;
        check_quorum("PUT", id, spec, acked)
    }

    pub async fn delete(&self, id: &str, replicas: Option<&str>) -> Result<(), CoordinatorError> {
        let (spec, nodes) = self.plan(id, replicas)?;
        let acked = self
            .fan_out_write(id, WriteOp::Delete, now_ms(), &nodes)
            .await;
        check_quorum("DELETE", id, spec, acked)
    }

    /// Validates the request and computes its replica set. Runs before any
    /// storage or network I/O.
    fn plan(
        &self,
        id: &str,
        replicas: Option<&str>,
    ) -> Result<(ReplicationSpec, Vec<NodeIndex>), CoordinatorError> {
        if id.is_empty() {
            return Err(CoordinatorError::BadRequest("empty id".to_string()));
        }

        let spec = match replicas {
            Some(raw) if !raw.trim().is_empty() => ReplicationSpec::parse(raw, self.topology.size())?,
            _ => self.default_replicas,
        };
        let nodes = select_replicas(id.as_bytes(), spec.from, &self.topology);

        Ok((spec, nodes))
    }

    /// Answers from every replica that responded, in placement order.
    /// Failed replicas are logged and left out.
    async fn fan_out_get(&self, id: &str, nodes: &[NodeIndex]) -> Vec<Record> {
        let calls = nodes.iter().map(|&node| async move {
            if self.topology.is_local(node) {
                self.local_get(id).map_err(|e| e.to_string())
            } else {
                self.peers
                    .get(self.topology.url(node), id)
                    .await
                    .map_err(|e| e.to_string())
            }
        });

        join_all(calls)
            .await
            .into_iter()
            .zip(nodes)
            .filter_map(|(result, node)| match result {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("GET {}: replica {} dropped: {}", id, node, e);
                    None
                }
            })
            .collect()
    }

    /// Applies `op` on every replica and returns how many acknowledged.
    async fn fan_out_write(
        &self,
        id: &str,
        op: WriteOp<'_>,
        timestamp: i64,
        nodes: &[NodeIndex],
    ) -> usize {
        let calls = nodes.iter().map(|&node| async move {
            if self.topology.is_local(node) {
                let applied = match op {
                    WriteOp::Put { payload, ttl } => {
                        self.local_put(id, payload.to_vec(), Some(timestamp), Some(ttl))
                    }
                    WriteOp::Delete => self.local_delete(id, Some(timestamp)),
                };
                applied.map_err(|e| e.to_string())
            } else {
                let url = self.topology.url(node);
                let applied = match op {
                    WriteOp::Put { payload, ttl } => {
                        self.peers.put(url, id, payload, timestamp, ttl).await
                    }
                    WriteOp::Delete => self.peers.delete(url, id, timestamp).await,
                };
                applied.map_err(|e| e.to_string())
            }
        });

        join_all(calls)
            .await
            .into_iter()
            .zip(nodes)
            .filter(|(result, node)| match result {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Write {}: replica {} did not acknowledge: {}", id, node, e);
                    false
                }
            })
            .count()
    }
}

fn check_quorum(
    operation: &str,
    id: &str,
    spec: ReplicationSpec,
    acked: usize,
) -> Result<(), CoordinatorError> {
    if acked >= spec.ack {
        tracing::debug!("{} {}: acknowledged by {}/{}", operation, id, acked, spec.from);
        Ok(())
    } else {
        tracing::warn!(
            "{} {}: only {} of {} replicas acknowledged, need {}",
            operation,
            id,
            acked,
            spec.from,
            spec.ack
        );
        Err(CoordinatorError::Timeout {
            needed: spec.ack,
            got: acked,
        })
    }
}

/// Latest write wins: the record with the greatest timestamp, the first one
/// seen on a tie.
pub fn resolve_latest(responses: &[Record]) -> Option<&Record> {
    responses.iter().fold(None, |best, candidate| match best {
        Some(current) if current.timestamp >= candidate.timestamp => Some(current),
        _ => Some(candidate),
    })
}
