//! Client for the test cluster
//!
//! The orchestrator only needs [`ClusterClient`] (start / shutdown) and a
//! [`ClientFactory`] to build one; [`Client`] is the implementation talking
//! HTTP to the mock services.

pub mod file;
pub mod handle;
pub mod rpc;

use crate::common::{ClusterConfig, Credentials, Result, TlsOptions};
use async_trait::async_trait;

pub use file::{FileHandle, Volume};
pub use handle::Client;
pub use rpc::RpcClient;

/// Connection to a cluster through its directory
#[async_trait]
pub trait ClusterClient: Send {
    /// Set up the connection to the directory service
    async fn start(&mut self) -> Result<()>;

    async fn shutdown(&mut self) -> Result<()>;
}

/// Builds a client from `(service_address, credentials, tls, config)`
pub type ClientFactory<C> = Box<
    dyn Fn(&str, &Credentials, Option<&TlsOptions>, &ClusterConfig) -> Result<C> + Send + Sync,
>;
