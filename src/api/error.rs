use thiserror::Error;

use crate::types::Operation;

/// Failures talking to the certificate registry
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Certificate API integration is disabled")]
    Disabled,

    #[error("Invalid API base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid API key header value")]
    InvalidApiKey,

    #[error("{operation} failed with HTTP {status}: {body}")]
    Status {
        operation: Operation,
        status: u16,
        body: String,
    },

    #[error("{operation} timed out after {attempts} attempt(s)")]
    Timeout { operation: Operation, attempts: u32 },

    #[error("Could not connect to API service for {operation} after {attempts} attempt(s)")]
    Connection { operation: Operation, attempts: u32 },

    #[error("{operation} request failed: {source}")]
    Request {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} returned an invalid JSON body: {message}")]
    InvalidResponse { operation: Operation, message: String },
}

impl ApiError {
    /// HTTP status returned by the service, if it answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Stable code for JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Disabled => "API_DISABLED",
            ApiError::InvalidBaseUrl { .. } => "INVALID_BASE_URL",
            ApiError::InvalidApiKey => "INVALID_API_KEY",
            ApiError::Status { status: 400, .. } => "BAD_REQUEST",
            ApiError::Status { status: 401, .. } => "UNAUTHORIZED",
            ApiError::Status { status: 403, .. } => "FORBIDDEN",
            ApiError::Status { status: 404, .. } => "NOT_FOUND",
            ApiError::Status { status: 409, .. } => "CONFLICT",
            ApiError::Status { status: 429, .. } => "TOO_MANY_REQUESTS",
            ApiError::Status { status, .. } if *status >= 500 => "SERVER_ERROR",
            ApiError::Status { .. } => "HTTP_ERROR",
            ApiError::Timeout { .. } => "TIMEOUT",
            ApiError::Connection { .. } => "CONNECTION_ERROR",
            ApiError::Request { .. } => "REQUEST_ERROR",
            ApiError::InvalidResponse { .. } => "INVALID_RESPONSE",
        }
    }
}

/// Statuses worth another attempt: throttling and server-side failures
pub fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}
