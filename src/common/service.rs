//! Capabilities the cluster orchestrator drives
//!
//! Every stand-in service implements [`ServiceMock`]; the role-specific traits
//! add the registration calls used while wiring the cluster together.

use crate::common::Result;
use async_trait::async_trait;

/// Role of a service in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Directory,
    MetadataCatalog,
    StorageDevice,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceKind::Directory => write!(f, "directory"),
            ServiceKind::MetadataCatalog => write!(f, "metadata catalog"),
            ServiceKind::StorageDevice => write!(f, "storage device"),
        }
    }
}

/// A service that can be started, stopped and addressed
#[async_trait]
pub trait ServiceMock: Send {
    fn kind(&self) -> ServiceKind;

    /// Bring the service up. Fails if it cannot bind or is already running.
    async fn start(&mut self) -> Result<()>;

    /// Shut the service down. A service that is not running treats this as a no-op.
    async fn stop(&mut self) -> Result<()>;

    /// Endpoint (`host:port`) of the running service
    fn address(&self) -> Option<String>;
}

/// Resolves volume names to metadata catalog endpoints
pub trait DirectoryService: ServiceMock {
    fn register_volume(&self, volume: &str, catalog_address: &str);

    fn resolve_volume(&self, volume: &str) -> Option<String>;
}

/// Knows which storage devices back the volume
pub trait CatalogService: ServiceMock {
    fn register_storage_device(&self, address: &str);

    /// Registered storage device endpoints, in registration order
    fn storage_devices(&self) -> Vec<String>;
}

/// Stores object data
pub trait StorageService: ServiceMock {}
