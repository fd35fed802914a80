use axum::{ http::StatusCode, response::{ IntoResponse, Response }, Json };
use thiserror::Error;

use crate::models::chat::ErrorBody;

pub const MALFORMED_REQUEST_MESSAGE: &str = "No messages provided or invalid format";
pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no working model found among {tried} candidates, check the API key")]
    NoWorkingModel {
        tried: usize,
    },

    #[error("{}", MALFORMED_REQUEST_MESSAGE)]
    MalformedRequest,

    #[error("provider invocation failed: {0}")]
    ProviderInvocation(String),

    #[error("{}", METHOD_NOT_ALLOWED_MESSAGE)]
    UnsupportedMethod,
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MalformedRequest => StatusCode::BAD_REQUEST,
            RelayError::UnsupportedMethod => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Configuration(_) |
            RelayError::NoWorkingModel { .. } |
            RelayError::ProviderInvocation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for the failures that the degraded policy is allowed to mask.
    pub fn is_degradable(&self) -> bool {
        matches!(self, RelayError::NoWorkingModel { .. } | RelayError::ProviderInvocation(_))
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
