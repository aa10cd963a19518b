// Error types for the Girder dispatch layer

use crate::HttpStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {path} (allowed: {})", .allowed.join(", "))]
    MethodNotAllowed { path: String, allowed: Vec<String> },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid path pattern '{template}': {reason}")]
    InvalidPattern { template: String, reason: String },

    #[error("Handler '{handler}' failed: {message}")]
    Handler { handler: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("View error: {0}")]
    View(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        match self {
            Error::RouteNotFound(_) => HttpStatus::NotFound,
            Error::MethodNotAllowed { .. } => HttpStatus::MethodNotAllowed,
            Error::Unauthorized(_) => HttpStatus::Unauthorized,
            Error::Forbidden(_) => HttpStatus::Forbidden,
            Error::BadRequest(_) => HttpStatus::BadRequest,
            Error::PayloadTooLarge(_) => HttpStatus::PayloadTooLarge,
            Error::InvalidPattern { .. }
            | Error::Handler { .. }
            | Error::Serialization(_)
            | Error::View(_)
            | Error::Internal(_)
            | Error::Io(_) => HttpStatus::InternalServerError,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }

    /// Short message shown to the client in rendered error pages.
    pub fn public_message(&self) -> String {
        match self {
            Error::RouteNotFound(path) => format!("Resource not found: {}", path),
            Error::MethodNotAllowed { .. } => "Method Not Allowed".to_string(),
            Error::Unauthorized(message) | Error::Forbidden(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
