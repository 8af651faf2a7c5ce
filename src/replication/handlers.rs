use axum::{
    body::Bytes,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::coordinator::{Coordinator, CoordinatorError, GetOutcome};
use super::protocol::{
    EntityParams, HEADER_PROXIED, HEADER_STATE, HEADER_TIMESTAMP, HEADER_TTL,
};
use crate::storage::record::RecordState;

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status = match self {
            CoordinatorError::BadRequest(_) | CoordinatorError::InvalidReplicas(_) => {
                StatusCode::BAD_REQUEST
            }
            CoordinatorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        };
        (status, self.to_string()).into_response()
    }
}

pub async fn handle_status() -> StatusCode {
    StatusCode::OK
}

pub async fn handle_get(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    headers: HeaderMap,
    Query(params): Query<EntityParams>,
) -> Response {
    let Some(id) = request_id(&params) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if is_proxied(&headers) {
        return match coordinator.local_get(id) {
            Ok(record) if record.state == RecordState::Unknown => {
                StatusCode::NOT_FOUND.into_response()
            }
            Ok(record) => (
                StatusCode::OK,
                [
                    (HEADER_TIMESTAMP, record.timestamp.to_string()),
                    (HEADER_STATE, record.state.ordinal().to_string()),
                    (HEADER_TTL, record.ttl.to_string()),
                ],
                record.payload,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Local GET {} failed: {}", id, e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    match coordinator.get(id, params.replicas.as_deref()).await {
        Ok(GetOutcome::Found(payload)) => (StatusCode::OK, payload).into_response(),
        Ok(GetOutcome::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn handle_put(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    headers: HeaderMap,
    Query(params): Query<EntityParams>,
    body: Bytes,
) -> Response {
    let Some(id) = request_id(&params) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if is_proxied(&headers) {
        let timestamp = match write_timestamp(&headers) {
            Ok(timestamp) => timestamp,
            Err(status) => return status.into_response(),
        };
        return match coordinator.local_put(id, body.to_vec(), timestamp, params.ttl) {
            Ok(()) => StatusCode::CREATED.into_response(),
            Err(e) => {
                tracing::error!("Local PUT {} failed: {}", id, e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    match coordinator
        .put(id, &body, params.replicas.as_deref(), params.ttl)
        .await
    {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn handle_delete(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    headers: HeaderMap,
    Query(params): Query<EntityParams>,
) -> Response {
    let Some(id) = request_id(&params) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if is_proxied(&headers) {
        let timestamp = match write_timestamp(&headers) {
            Ok(timestamp) => timestamp,
            Err(status) => return status.into_response(),
        };
        return match coordinator.local_delete(id, timestamp) {
            Ok(()) => StatusCode::ACCEPTED.into_response(),
            Err(e) => {
                tracing::error!("Local DELETE {} failed: {}", id, e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    match coordinator.delete(id, params.replicas.as_deref()).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => e.into_response(),
    }
}

fn request_id(params: &EntityParams) -> Option<&str> {
    params.id.as_deref().filter(|id| !id.is_empty())
}

fn is_proxied(headers: &HeaderMap) -> bool {
    headers.contains_key(HEADER_PROXIED)
}

/// Timestamp chosen by the coordinator for a proxied write. Absent means the
/// replica stamps the write itself; present but unparsable is a 400.
fn write_timestamp(headers: &HeaderMap) -> Result<Option<i64>, StatusCode> {
    let Some(value) = headers.get(HEADER_TIMESTAMP) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Some)
        .ok_or(StatusCode::BAD_REQUEST)
}
