use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use labflow_core::{CaseError, ErrorKind};
use serde::Serialize;
use tracing::{debug, error};

/// Error body returned by every case endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

/// Wraps a [`CaseError`] so handlers can use `?`.
#[derive(Debug)]
pub struct ApiError(pub CaseError);

impl From<CaseError> for ApiError {
    fn from(e: CaseError) -> Self {
        Self(e)
    }
}

/// Unreadable or incomplete JSON bodies are validation errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CaseError::Validation(rejection.body_text()))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation | ErrorKind::Guard => StatusCode::BAD_REQUEST,
        ErrorKind::Storage => StatusCode::BAD_GATEWAY,
        ErrorKind::Transaction => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        match kind {
            ErrorKind::Storage | ErrorKind::Transaction => {
                error!(error = %self.0, "Request failed");
            }
            _ => debug!(error = %self.0, "Request rejected"),
        }

        let body = ErrorResponse {
            ok: false,
            error: self.0.public_message(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}
