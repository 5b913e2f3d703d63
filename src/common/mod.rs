//! Common utilities and types shared across testcluster

pub mod auth;
pub mod config;
pub mod error;
pub mod hash;
pub mod server;
pub mod service;
pub mod utils;

pub use auth::Credentials;
pub use config::{ClusterConfig, TlsOptions};
pub use error::{Error, Result};
pub use hash::blake3_hash;
pub use server::{health_router, HealthResponse, MockServer};
pub use service::{CatalogService, DirectoryService, ServiceKind, ServiceMock, StorageService};
pub use utils::{
    format_bytes, parse_duration, retry_with_backoff, timestamp_now, validate_path, ServiceState,
};
