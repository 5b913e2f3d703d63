//! Metadata catalog mock server

use crate::catalog::http::{create_router, CatalogState};
use crate::common::{
    CatalogService, ClusterConfig, MockServer, Result, ServiceKind, ServiceMock, ServiceState,
};
use async_trait::async_trait;

pub struct MetadataCatalogMock {
    bind_host: String,
    state: CatalogState,
    server: MockServer,
}

impl MetadataCatalogMock {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            bind_host: config.bind_host.clone(),
            state: CatalogState::new(config.stripe_size),
            server: MockServer::new(ServiceKind::MetadataCatalog, config.shutdown_timeout()),
        }
    }

    pub fn state(&self) -> ServiceState {
        self.server.state()
    }

    pub fn catalog(&self) -> &CatalogState {
        &self.state
    }
}

impl Default for MetadataCatalogMock {
    fn default() -> Self {
        Self::new(&ClusterConfig::default())
    }
}

#[async_trait]
impl ServiceMock for MetadataCatalogMock {
    fn kind(&self) -> ServiceKind {
        ServiceKind::MetadataCatalog
    }

    async fn start(&mut self) -> Result<()> {
        let router = create_router(self.state.clone());
        self.server.start(&self.bind_host, router).await?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.server.stop().await
    }

    fn address(&self) -> Option<String> {
        self.server.local_addr().map(|addr| addr.to_string())
    }
}

impl CatalogService for MetadataCatalogMock {
    fn register_storage_device(&self, address: &str) {
        self.state.register_storage_device(address);
    }

    fn storage_devices(&self) -> Vec<String> {
        self.state.storage_devices()
    }
}
