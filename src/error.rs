// src/error.rs
use hyper::{Body, Response, StatusCode};

/// Every failure a caller can hit. All of these are recoverable by the
/// caller; none of them leaves shared state partially mutated.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("backend with address {0} is already registered")]
    DuplicateBackend(String),

    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    #[error("no backend available")]
    NoBackendAvailable,

    #[error("source {0} exceeded the admission rate")]
    Rejected(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RouterError {
    /// Stable machine-readable kind, carried in every error response body.
    pub fn kind(&self) -> &'static str {
        match self {
            RouterError::DuplicateBackend(_) => "duplicate_backend",
            RouterError::UnknownBackend(_) => "unknown_backend",
            RouterError::NoBackendAvailable => "no_backend_available",
            RouterError::Rejected(_) => "rejected",
            RouterError::InvalidInput(_) => "invalid_input",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RouterError::DuplicateBackend(_) => StatusCode::CONFLICT,
            RouterError::UnknownBackend(_) => StatusCode::NOT_FOUND,
            RouterError::NoBackendAvailable => StatusCode::SERVICE_UNAVAILABLE,
            RouterError::Rejected(_) => StatusCode::TOO_MANY_REQUESTS,
            RouterError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<RouterError> for Response<Body> {
    fn from(err: RouterError) -> Self {
        let body = serde_json::json!({ "error": err.kind() });
        Response::builder()
            .status(err.status())
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
