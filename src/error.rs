use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/* -------------------------
   Engine errors
--------------------------*/

/// Required fields missing or malformed on submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid or missing fields: {}", fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<&'static str>,
}

/// The backend call failed. Never retried by the engine.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum AgendaError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("no conflict is awaiting an override decision")]
    NoPendingDecision,
}

/* -------------------------
   HTTP errors
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    BadRequest(&'static str, String),
    Conflict(&'static str, String),
    BadGateway(&'static str, String),
}

impl ApiError {
    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl From<AgendaError> for ApiError {
    fn from(e: AgendaError) -> Self {
        match e {
            AgendaError::Validation(_) => {
                ApiError::BadRequest("VALIDATION_ERROR", e.to_string())
            }
            AgendaError::Transport(_) => ApiError::BadGateway("BACKEND_UNAVAILABLE", e.to_string()),
            AgendaError::NoPendingDecision => {
                ApiError::Conflict("NO_PENDING_DECISION", e.to_string())
            }
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(e: TransportError) -> Self {
        AgendaError::from(e).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(code, msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Conflict(code, msg) => {
                (StatusCode::CONFLICT, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadGateway(code, msg) => {
                (StatusCode::BAD_GATEWAY, ApiError::to_error_response(code, &msg)).into_response()
            }
        }
    }
}
