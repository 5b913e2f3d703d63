//! Storage device mock server

use crate::common::{
    ClusterConfig, MockServer, Result, ServiceKind, ServiceMock, ServiceState, StorageService,
};
use crate::storage::http::{create_router, StorageState};
use async_trait::async_trait;

pub struct StorageDeviceMock {
    device_id: String,
    bind_host: String,
    state: StorageState,
    server: MockServer,
}

impl StorageDeviceMock {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            device_id: uuid::Uuid::new_v4().to_string(),
            bind_host: config.bind_host.clone(),
            state: StorageState::default(),
            server: MockServer::new(ServiceKind::StorageDevice, config.shutdown_timeout()),
        }
    }

    /// Unique id of this device
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn state(&self) -> ServiceState {
        self.server.state()
    }

    pub fn objects(&self) -> &StorageState {
        &self.state
    }
}

impl Default for StorageDeviceMock {
    fn default() -> Self {
        Self::new(&ClusterConfig::default())
    }
}

#[async_trait]
impl ServiceMock for StorageDeviceMock {
    fn kind(&self) -> ServiceKind {
        ServiceKind::StorageDevice
    }

    async fn start(&mut self) -> Result<()> {
        let router = create_router(self.state.clone());
        let addr = self.server.start(&self.bind_host, router).await?;
        tracing::debug!("Storage device {} serving on {}", self.device_id, addr);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.server.stop().await
    }

    fn address(&self) -> Option<String> {
        self.server.local_addr().map(|addr| addr.to_string())
    }
}

impl StorageService for StorageDeviceMock {}
