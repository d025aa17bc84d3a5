//! HTTP/JSON binding.
//!
//! | Method | Path                    | Body / Response                        |
//! |--------|-------------------------|----------------------------------------|
//! | POST   | `/api/input`            | `{user_id?, bits?, mode?}` → `{translated, full_text}` |
//! | GET    | `/api/get/:user_id`     | → `{text}` from the durable mirror     |
//! | GET    | `/api/buffer/:user_id`  | → `{text}` from the in-memory buffer   |
//! | GET    | `/health`               | → `{status, users}`                    |

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use brailler_core::{CellInput, GatewayError, TranscribeError, UserId, env::Environment};
use serde::{Deserialize, Serialize};

use crate::service::TranscriptionService;

/// Submit-cell request body. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmitRequest {
    /// Submitting user
    pub user_id: Option<String>,
    /// Six-character cell
    pub bits: Option<String>,
    /// Mode name
    pub mode: Option<String>,
}

impl From<SubmitRequest> for CellInput {
    fn from(req: SubmitRequest) -> Self {
        Self { user_id: req.user_id, bits: req.bits, mode: req.mode }
    }
}

/// Submit-cell response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Symbol for the submitted cell
    pub translated: String,
    /// Entire accumulated text after the append
    pub full_text: String,
}

/// Accumulated-text response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResponse {
    /// Accumulated text, empty if none
    pub text: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    users: usize,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Strict policy rejected the cell.
    #[error(transparent)]
    Rejected(#[from] TranscribeError),

    /// The durable mirror could not be read.
    #[error("mirror unavailable: {0}")]
    MirrorUnavailable(#[from] GatewayError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MirrorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Build the router over `service`.
pub fn router<E>(service: Arc<TranscriptionService<E>>) -> Router
where
    E: Environment,
{
    Router::new()
        .route("/health", get(health::<E>))
        .route("/api/input", post(submit::<E>))
        .route("/api/get/:user_id", get(read_mirror::<E>))
        .route("/api/buffer/:user_id", get(read_buffer::<E>))
        .with_state(service)
}

async fn health<E>(State(service): State<Arc<TranscriptionService<E>>>) -> impl IntoResponse
where
    E: Environment,
{
    Json(HealthResponse { status: "ok", users: service.user_count() })
}

async fn submit<E>(
    State(service): State<Arc<TranscriptionService<E>>>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError>
where
    E: Environment,
{
    let submission = service.submit(req.into()).await?;
    Ok(Json(SubmitResponse {
        translated: submission.translated.to_string(),
        full_text: submission.full_text,
    }))
}

async fn read_mirror<E>(
    State(service): State<Arc<TranscriptionService<E>>>,
    Path(user_id): Path<String>,
) -> Result<Json<TextResponse>, ApiError>
where
    E: Environment,
{
    let text = service.read_mirror(&UserId::from(user_id)).await?;
    Ok(Json(TextResponse { text: text.unwrap_or_default() }))
}

async fn read_buffer<E>(
    State(service): State<Arc<TranscriptionService<E>>>,
    Path(user_id): Path<String>,
) -> Json<TextResponse>
where
    E: Environment,
{
    Json(TextResponse { text: service.snapshot(&user_id) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_fields_are_optional() {
        let req: SubmitRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(CellInput::from(req), CellInput::default());

        let req: SubmitRequest =
            serde_json::from_str(r#"{"user_id":"alice","bits":"100000","mode":"UEB"}"#).unwrap();
        assert_eq!(CellInput::from(req), CellInput::new("alice", "100000", "UEB"));
    }

    #[test]
    fn api_errors_map_to_statuses() {
        let rejected = ApiError::from(TranscribeError::Mode(brailler_core::ModeError::Unknown(
            "x".to_string(),
        )));
        assert_eq!(rejected.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let unavailable = ApiError::from(GatewayError::Unavailable("down".to_string()));
        assert_eq!(unavailable.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
