//! Directory mock server

use crate::common::{
    ClusterConfig, DirectoryService, MockServer, Result, ServiceKind, ServiceMock, ServiceState,
};
use crate::directory::http::{create_router, DirectoryState};
use async_trait::async_trait;

pub struct DirectoryMock {
    bind_host: String,
    state: DirectoryState,
    server: MockServer,
}

impl DirectoryMock {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            bind_host: config.bind_host.clone(),
            state: DirectoryState::default(),
            server: MockServer::new(ServiceKind::Directory, config.shutdown_timeout()),
        }
    }

    pub fn state(&self) -> ServiceState {
        self.server.state()
    }

    /// Handle on the registry, for assertions
    pub fn registry(&self) -> &DirectoryState {
        &self.state
    }
}

impl Default for DirectoryMock {
    fn default() -> Self {
        Self::new(&ClusterConfig::default())
    }
}

#[async_trait]
impl ServiceMock for DirectoryMock {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Directory
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

impl DirectoryService for DirectoryMock {
    fn register_volume(&self, volume: &str, catalog_address: &str) {
        self.state.register_volume(volume, catalog_address);
    }

    fn resolve_volume(&self, volume: &str) -> Option<String> {
        self.state.resolve_volume(volume)
    }
}
