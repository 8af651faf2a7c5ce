//! Cluster Topology Module
//!
//! Static description of the cluster and the pure functions computed from it.
//!
//! ## Core Concepts
//! - **Topology**: `ClusterConfig` is the ordered node list plus this node's position.
//!   It is fixed at startup; membership never changes while the process runs.
//! - **Placement**: `select_replicas` maps a key to a contiguous circular run of nodes,
//!   identical on every node.
//! - **Quorum**: `ReplicationSpec` is the validated `ack/from` pair for one request.

pub mod replicas;
pub mod selector;
pub mod types;
