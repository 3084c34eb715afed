use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::webhooks::VerificationFailure;

/// The main error type for floodgate
#[derive(Debug, thiserror::Error)]
pub enum FloodgateError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The counter store could not complete a command.
    ///
    /// Never converted into an "allowed" decision; callers choose what a
    /// store outage means for them.
    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// JSON body returned for failed requests.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    error_id: String,
}

impl FloodgateError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        Self::TooManyRequests(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) | Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to hand to a client.
    ///
    /// 4xx messages are passed through, 5xx details stay in the server logs.
    fn safe_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::Unauthorized(msg) => format!("Unauthorized: {}", msg),
            Self::TooManyRequests(msg) => format!("Too many requests: {}", msg),

            Self::Internal(_) | Self::Anyhow(_) => "Internal server error".to_string(),
            Self::ServiceUnavailable(_) | Self::Store(_) => "Service unavailable".to_string(),
        }
    }
}

impl IntoResponse for FloodgateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id,
        });

        (status, body).into_response()
    }
}

impl From<VerificationFailure> for FloodgateError {
    fn from(failure: VerificationFailure) -> Self {
        match failure {
            VerificationFailure::MalformedEnvelope(reason) => {
                FloodgateError::BadRequest(format!("Malformed webhook envelope: {}", reason))
            }
            VerificationFailure::SignatureMismatch => {
                FloodgateError::Unauthorized("Invalid webhook signature".to_string())
            }
            VerificationFailure::DecryptionError(reason) => {
                FloodgateError::Internal(format!("Webhook decryption failed: {}", reason))
            }
        }
    }
}

impl From<serde_json::Error> for FloodgateError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            FloodgateError::BadRequest(format!("JSON error: {}", err))
        } else {
            FloodgateError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

/// Result type alias for floodgate operations
pub type Result<T> = std::result::Result<T, FloodgateError>;
