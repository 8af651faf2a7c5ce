//! Quorum Parser
//!
//! `ack/from` replication specs: write (or read) to `from` replicas and
//! succeed once `ack` of them answer.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplicationSpecError {
    #[error("malformed replicas spec {0:?}, expected \"ack/from\"")]
    Malformed(String),
    #[error("ack must be at least 1")]
    ZeroAck,
    #[error("ack {ack} is greater than from {from}")]
    AckAboveFrom { ack: usize, from: usize },
    #[error("from {from} exceeds the cluster size {cluster_size}")]
    FromAboveCluster { from: usize, cluster_size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationSpec {
    pub ack: usize,
    pub from: usize,
}

impl ReplicationSpec {
    pub fn new(ack: usize, from: usize, cluster_size: usize) -> Result<Self, ReplicationSpecError> {
        if ack < 1 {
            return Err(ReplicationSpecError::ZeroAck);
        }
        if ack > from {
            return Err(ReplicationSpecError::AckAboveFrom { ack, from });
        }
        if from > cluster_size {
            return Err(ReplicationSpecError::FromAboveCluster { from, cluster_size });
        }
        Ok(Self { ack, from })
    }

    pub fn parse(spec: &str, cluster_size: usize) -> Result<Self, ReplicationSpecError> {
        let malformed = || ReplicationSpecError::Malformed(spec.to_string());

        let (ack, from) = spec.trim().split_once('/').ok_or_else(|| malformed())?;
        let ack: usize = ack.trim().parse().map_err(|_| malformed())?;
        let from: usize = from.trim().parse().map_err(|_| malformed())?;

        Self::new(ack, from, cluster_size)
    }

    /// `floor(n/2) + 1` acknowledgements out of all `n` nodes.
    pub fn majority(cluster_size: usize) -> Self {
        Self {
            ack: cluster_size / 2 + 1,
            from: cluster_size,
        }
    }
}

impl fmt::Display for ReplicationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ack, self.from)
    }
}
