use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::error::ClientError;

/// Body returned by every control endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    pub action: String,
    pub service: Option<String>,
    /// Cached clients evicted by a refresh.
    pub evicted: Option<usize>,
}

pub struct AdminError(ClientError);

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ClientError::UnknownService(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.0.to_string(), "kind": self.0.kind() });
        (status, Json(body)).into_response()
    }
}

impl From<ClientError> for AdminError {
    fn from(e: ClientError) -> Self {
        Self(e)
    }
}

pub async fn reset_all_breakers(State(state): State<AdminState>) -> Json<ActionResult> {
    state.manager.reset_all_circuit_breakers();
    Json(ActionResult {
        action: "reset_breakers".into(),
        service: None,
        evicted: None,
    })
}

pub async fn reset_breaker(
    State(state): State<AdminState>,
    Path(service): Path<String>,
) -> Result<Json<ActionResult>, AdminError> {
    state.manager.reset_circuit_breaker(&service)?;
    tracing::info!(service = %service, "Circuit breaker reset by operator");
    Ok(Json(ActionResult {
        action: "reset_breaker".into(),
        service: Some(service),
        evicted: None,
    }))
}

pub async fn refresh_all_clients(State(state): State<AdminState>) -> Json<ActionResult> {
    let evicted = state.manager.refresh_all();
    Json(ActionResult {
        action: "refresh_clients".into(),
        service: None,
        evicted: Some(evicted),
    })
}

pub async fn refresh_client(
    State(state): State<AdminState>,
    Path(service): Path<String>,
) -> Result<Json<ActionResult>, AdminError> {
    let evicted = state.manager.force_refresh(&service)?;
    Ok(Json(ActionResult {
        action: "refresh_client".into(),
        service: Some(service),
        evicted: Some(usize::from(evicted)),
    }))
}
