use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::model::PINPOINT_SOURCE_HEADER;
use crate::resolver::ResolveError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing required parameter: {0}")]
    MissingParameters(&'static str),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ResolveError> for GatewayError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::MissingParameters(name) => GatewayError::MissingParameters(name),
        }
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub status: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GatewayError::MissingParameters(_) => (StatusCode::BAD_REQUEST, "MISSING_PARAMETERS"),
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            GatewayError::UnknownOperation(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_OPERATION"),
            GatewayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            PINPOINT_SOURCE_HEADER,
            HeaderValue::from_str(code).unwrap_or(HeaderValue::from_static("error")),
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code,
            status: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
