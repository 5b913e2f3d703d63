//! Client handle attached to one directory endpoint

use crate::client::file::Volume;
use crate::client::rpc::RpcClient;
use crate::client::ClusterClient;
use crate::common::{
    retry_with_backoff, ClusterConfig, Credentials, Error, Result, ServiceKind, TlsOptions,
};
use async_trait::async_trait;
use std::time::Duration;

/// Health probes made by `start()` before giving up on the directory
const START_ATTEMPTS: usize = 3;
const START_RETRY_DELAY: Duration = Duration::from_millis(50);

pub struct Client {
    service_address: String,
    credentials: Credentials,
    rpc: RpcClient,
}

impl Client {
    /// Build a client for the directory at `service_address`. No network traffic
    /// happens until [`ClusterClient::start`].
    pub fn create(
        service_address: &str,
        credentials: &Credentials,
        tls: Option<&TlsOptions>,
        config: &ClusterConfig,
    ) -> Result<Self> {
        if service_address.trim().is_empty() {
            return Err(Error::InvalidConfig("service address cannot be empty".into()));
        }

        Ok(Self {
            service_address: service_address.to_string(),
            credentials: credentials.clone(),
            rpc: RpcClient::new(credentials, tls, config)?,
        })
    }

    pub fn service_address(&self) -> &str {
        &self.service_address
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn is_running(&self) -> bool {
        self.rpc.is_running()
    }

    /// Resolve `name` through the directory and return a handle on it
    pub async fn open_volume(&self, name: &str) -> Result<Volume> {
        let record = self.rpc.resolve_volume(&self.service_address, name).await?;
        tracing::debug!(
            "Volume {} served by catalog {}",
            record.name,
            record.catalog_address
        );
        Ok(Volume::new(record.name, record.catalog_address, self.rpc.clone()))
    }
}

#[async_trait]
impl ClusterClient for Client {
    async fn start(&mut self) -> Result<()> {
        if self.rpc.is_running() {
            return Err(Error::AlreadyRunning("client".into()));
        }

        let rpc = &self.rpc;
        let address = self.service_address.as_str();
        let health = retry_with_backoff(|| rpc.health(address), START_ATTEMPTS, START_RETRY_DELAY)
            .await
            .map_err(|e| Error::ClientStart(e.to_string()))?;
        let expected = ServiceKind::Directory.to_string();
        if health.service != expected {
            return Err(Error::ClientStart(format!(
                "{} is a {}, not a {}",
                self.service_address, health.service, expected
            )));
        }

        self.rpc.set_running(true);
        tracing::info!(
            "Client for {} connected to directory {}",
            self.credentials.username(),
            self.service_address
        );
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if !self.rpc.is_running() {
            tracing::debug!("Client already shut down");
            return Ok(());
        }
        self.rpc.set_running(false);
        tracing::info!("Client for directory {} shut down", self.service_address);
        Ok(())
    }
}
