//! Peer Client
//!
//! Sends proxied requests to other replicas. Every request carries the
//! `proxied` header so the receiver answers from its own storage instead of
//! coordinating again.

use super::protocol::*;
use crate::storage::record::{NO_EXPIRY, Record, RecordState};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// The single failure kind of a peer call: the peer did not acknowledge.
///
/// Covers connection errors, timeouts, non-success statuses and responses
/// that cannot be turned back into a record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("peer {node} unavailable: {reason}")]
pub struct PeerError {
    pub node: String,
    pub reason: String,
}

impl PeerError {
    pub fn new(node: &str, reason: impl ToString) -> Self {
        Self {
            node: node.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Replica-side operations the coordinator needs from remote nodes.
#[async_trait]
pub trait PeerClient: Send + Sync + 'static {
    /// Reads `key` on `node`. A peer without the key answers
    /// [`Record::unknown`], not an error.
    async fn get(&self, node: &str, key: &str) -> Result<Record, PeerError>;

    async fn put(
        &self,
        node: &str,
        key: &str,
        payload: &[u8],
        timestamp: i64,
        ttl: i64,
    ) -> Result<(), PeerError>;

    async fn delete(&self, node: &str, key: &str, timestamp: i64) -> Result<(), PeerError>;
}

/// [`PeerClient`] over HTTP. Every call is bounded by the client timeout, so
/// a dead replica cannot stall the requests that touch its keys.
pub struct HttpPeerClient {
    http_client: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { http_client })
    }

    fn entity_url(node: &str) -> String {
        format!("{}{}", node, ENDPOINT_ENTITY)
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn get(&self, node: &str, key: &str) -> Result<Record, PeerError> {
        let response = self
            .http_client
            .get(Self::entity_url(node))
            .query(&[("id", key)])
            .header(HEADER_PROXIED, "true")
            .send()
            .await
            .map_err(|e| PeerError::new(node, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Record::unknown());
        }
        if !status.is_success() {
            return Err(PeerError::new(node, format!("GET returned {}", status)));
        }

        let record = record_from_headers(response.headers()).map_err(|e| PeerError::new(node, e))?;
        let payload = response
            .bytes()
            .await
            .map_err(|e| PeerError::new(node, e))?;

        Ok(Record {
            payload: payload.to_vec(),
            ..record
        })
    }

    async fn put(
        &self,
        node: &str,
        key: &str,
        payload: &[u8],
        timestamp: i64,
        ttl: i64,
    ) -> Result<(), PeerError> {
        let ttl = ttl.to_string();
        let response = self
            .http_client
            .put(Self::entity_url(node))
            .query(&[("id", key), ("TTL", ttl.as_str())])
            .header(HEADER_PROXIED, "true")
            .header(HEADER_TIMESTAMP, timestamp.to_string())
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| PeerError::new(node, e))?;

        if !response.status().is_success() {
            return Err(PeerError::new(
                node,
                format!("PUT returned {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn delete(&self, node: &str, key: &str, timestamp: i64) -> Result<(), PeerError> {
        let response = self
            .http_client
            .delete(Self::entity_url(node))
            .query(&[("id", key)])
            .header(HEADER_PROXIED, "true")
            .header(HEADER_TIMESTAMP, timestamp.to_string())
            .send()
            .await
            .map_err(|e| PeerError::new(node, e))?;

        if !response.status().is_success() {
            return Err(PeerError::new(
                node,
                format!("DELETE returned {}", response.status()),
            ));
        }
        Ok(())
    }
}

/// Rebuilds the record metadata of a proxied GET response. The payload is
/// left empty; it travels in the body.
fn record_from_headers(headers: &HeaderMap) -> Result<Record, String> {
    let timestamp: i64 = header_value(headers, HEADER_TIMESTAMP)
        .ok_or_else(|| format!("missing or invalid {} header", HEADER_TIMESTAMP))?;
    let ordinal: i32 = header_value(headers, HEADER_STATE)
        .ok_or_else(|| format!("missing or invalid {} header", HEADER_STATE))?;
    let state = RecordState::from_ordinal(ordinal)
        .ok_or_else(|| format!("unknown state ordinal {}", ordinal))?;
    let ttl = header_value(headers, HEADER_TTL).unwrap_or(NO_EXPIRY);

    Ok(Record {
        payload: Vec::new(),
        timestamp,
        state,
        ttl,
    })
}

fn header_value<T: FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_record_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_TIMESTAMP, HeaderValue::from_static("42"));
        headers.insert(HEADER_STATE, HeaderValue::from_static("1"));
        headers.insert(HEADER_TTL, HeaderValue::from_static("99"));

        let record = record_from_headers(&headers).unwrap();
        assert_eq!(record, Record::tombstone(42, 99));
    }

    #[test]
    fn test_record_from_headers_defaults_ttl() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_TIMESTAMP, HeaderValue::from_static("-5"));
        headers.insert(HEADER_STATE, HeaderValue::from_static("0"));

        let record = record_from_headers(&headers).unwrap();
        assert_eq!(record.timestamp, -5);
        assert_eq!(record.state, RecordState::Present);
        assert_eq!(record.ttl, NO_EXPIRY);
    }

    #[test]
    fn test_record_from_headers_rejects_garbage() {
        let mut headers = HeaderMap::new();
        assert!(record_from_headers(&headers).is_err());

        headers.insert(HEADER_TIMESTAMP, HeaderValue::from_static("12"));
        headers.insert(HEADER_STATE, HeaderValue::from_static("9"));
        assert!(record_from_headers(&headers).is_err());

        headers.insert(HEADER_STATE, HeaderValue::from_static("zero"));
        assert!(record_from_headers(&headers).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_unavailable() {
        // Grab a free port and release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let node = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = HttpPeerClient::new(Duration::from_millis(200)).unwrap();
        let err = client.get(&node, "k1").await.unwrap_err();
        assert_eq!(err.node, node);

        let err = client.delete(&node, "k1", 1).await.unwrap_err();
        assert_eq!(err.node, node);
    }

    #[tokio::test]
    async fn test_silent_peer_is_bounded_by_timeout() {
        // Accepts connections and never writes a byte back.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let node = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let timeout = Duration::from_millis(200);
        let limit = timeout * 5;
        let client = HttpPeerClient::new(timeout).unwrap();

        let started = std::time::Instant::now();
        let err = client.get(&node, "k1").await.unwrap_err();
        assert_eq!(err.node, node);
        assert!(started.elapsed() < limit, "GET took {:?}", started.elapsed());

        let started = std::time::Instant::now();
        assert!(client.put(&node, "k1", b"v1", 1, NO_EXPIRY).await.is_err());
        assert!(started.elapsed() < limit, "PUT took {:?}", started.elapsed());

        let started = std::time::Instant::now();
        assert!(client.delete(&node, "k1", 1).await.is_err());
        assert!(started.elapsed() < limit, "DELETE took {:?}", started.elapsed());
    }
}
