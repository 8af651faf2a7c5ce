//! Replication Module
//!
//! Quorum replication over the static cluster (Dynamo-style `ack/from`).
//!
//! ## Request Flow
//! 1. **Entry**: a client hits `/v0/entity` on any node; that node coordinates.
//! 2. **Placement**: the key's replica set is computed locally, identically on every node.
//! 3. **Fan-out**: the operation is sent to every replica at once, marked `proxied`.
//!    The coordinator's own slot goes straight to its local store.
//! 4. **Resolution**: acknowledgements are counted against `ack`; reads pick the
//!    latest timestamp and honour tombstones and TTLs.
//!
//! ## Submodules
//! - **`coordinator`**: the per-request decision procedure (both branches).
//! - **`peer`**: the `PeerClient` seam and its HTTP implementation.
//! - **`handlers`**: axum handlers translating HTTP to coordinator calls.
//! - **`protocol`**: endpoints, headers and query parameters.

pub mod coordinator;
pub mod handlers;
pub mod peer;
pub mod protocol;
