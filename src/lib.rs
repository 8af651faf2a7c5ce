//! Quorum-Replicated Key-Value Store Library
//!
//! This library crate defines the modules that make up a cluster node.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`cluster`**: The static topology, replica placement and `ack/from` quorum specs.
//! - **`storage`**: Versioned records, their binary codec, the byte store engines and
//!   the local record adapter with its background expiry sweeper.
//! - **`replication`**: The request coordinator (fan-out, acknowledgement counting,
//!   latest-write-wins resolution), the peer client and the HTTP handlers.
//! - **`config`**: Command-line options and their validated `NodeConfig`.
//! - **`server`**: Assembles a node from a `NodeConfig` and serves it.

pub mod cluster;
pub mod config;
pub mod replication;
pub mod server;
pub mod storage;
