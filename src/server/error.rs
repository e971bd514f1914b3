//! Error responses for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use crate::error::{EcoError, ErrorKind};

/// Handler error. Renders as `{"error": {"kind": ..., "message": ...}}`.
#[derive(Debug)]
pub struct ApiError(pub EcoError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::CorsRejected => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EcoError> for ApiError {
    fn from(err: EcoError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.0.kind();
        let message = self.0.to_string();

        if status.is_server_error() {
            error!(%kind, error = %message, "request failed");
        } else {
            warn!(%kind, error = %message, "request rejected");
        }

        let body = serde_json::json!({
            "error": {
                "kind": kind,
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}
