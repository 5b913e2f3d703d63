//! Error types for testcluster

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Lifecycle Errors ===
    #[error("Failed to start {service}: {reason}")]
    ServiceStart { service: String, reason: String },

    #[error("{0} is already running")]
    AlreadyRunning(String),

    #[error("{0} is not running")]
    NotRunning(String),

    #[error("Cluster start was already attempted")]
    AlreadyStarted,

    #[error("Client failed to start: {0}")]
    ClientStart(String),

    #[error("Teardown failed: {}", .0.join("; "))]
    Teardown(Vec<String>),

    // === Catalog / Storage Errors ===
    #[error("Volume not found: {0}")]
    VolumeNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Object {object_no} of file {file_id} not found")]
    ObjectNotFound { file_id: String, object_no: u64 },

    #[error("No storage devices registered")]
    NoStorageDevices,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid byte range: {0}")]
    InvalidRange(String),

    // === Network Errors ===
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Is this a retryable error?
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::ConnectionFailed(_) => true,
            Error::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> StatusCode {
        match self {
            Error::VolumeNotFound(_) | Error::FileNotFound(_) | Error::ObjectNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::InvalidPath(_) | Error::InvalidRange(_) | Error::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Error::NoStorageDevices | Error::NotRunning(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.to_http_status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
