//! Entity Network Protocol
//!
//! Endpoints, query parameters and headers shared by clients, the HTTP
//! handlers and the peer client.
//!
//! Replica-to-replica traffic reuses the public `/v0/entity` endpoint and is
//! told apart by the `proxied` header. A node receiving a proxied request
//! serves it from local storage and never fans out again.

use serde::Deserialize;

// --- API Endpoints ---

/// Liveness probe.
pub const ENDPOINT_STATUS: &str = "/v0/status";
/// Get, put and delete of a single key.
pub const ENDPOINT_ENTITY: &str = "/v0/entity";

// --- Headers ---

/// Marks a replica request. Presence alone counts; the value is ignored.
pub const HEADER_PROXIED: &str = "proxied";
/// Write timestamp (ms since epoch) on proxied writes and proxied GET responses.
pub const HEADER_TIMESTAMP: &str = "timestamp";
/// Record state ordinal on proxied GET responses.
pub const HEADER_STATE: &str = "state";
/// Absolute expiry (ms since epoch) on proxied GET responses.
pub const HEADER_TTL: &str = "ttl";

// --- Query Parameters ---

/// Query string of `/v0/entity`.
#[derive(Debug, Default, Deserialize)]
pub struct EntityParams {
    /// The key. Required and non-empty.
    pub id: Option<String>,
    /// Optional `"ack/from"` replication spec.
    pub replicas: Option<String>,
    /// Optional absolute expiry in ms since epoch (PUT only).
    #[serde(rename = "TTL")]
    pub ttl: Option<i64>,
}
