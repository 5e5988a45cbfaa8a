use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy exposed at the component boundaries. A missing carrier
/// record is deliberately not represented here: it is a valid scoring input,
/// not a failure.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl VerifyError {
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::InvalidInput(_) => "invalid_input",
            VerifyError::SessionNotFound => "session_not_found",
            VerifyError::UnknownEventType(_) => "unknown_event_type",
            VerifyError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for VerifyError {
    fn status_code(&self) -> StatusCode {
        match self {
            VerifyError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            VerifyError::SessionNotFound => StatusCode::NOT_FOUND,
            VerifyError::UnknownEventType(_) => StatusCode::BAD_REQUEST,
            VerifyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal faults are logged here and surfaced opaquely; a single
        // failed request must never take the process down or leak detail.
        let message = match self {
            VerifyError::Internal(err) => {
                log::error!("internal error: {:#}", err);
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": message,
        }))
    }
}
