use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{ErrorCategory, PaymentError};

/// JSON error body returned by every payment endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

/// Handler error: a [`PaymentError`] rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub PaymentError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0.category() {
            ErrorCategory::Validation
            | ErrorCategory::Verification
            | ErrorCategory::MalformedResponse => StatusCode::BAD_REQUEST,
            ErrorCategory::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCategory::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        let body = ErrorBody {
            status: "error",
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
