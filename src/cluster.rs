//! Test cluster orchestrator
//!
//! Owns one directory, one metadata catalog and an append-only fleet of
//! storage devices. [`TestCluster::start`] brings them up one after another,
//! wires them together and hands out a started client;
//! [`TestCluster::stop`] tears everything down again.
//!
//! A failed start does not roll back: services that came up keep running
//! until `stop()` (or drop) releases them.

use crate::catalog::MetadataCatalogMock;
use crate::client::{Client, ClientFactory, ClusterClient, Volume};
use crate::common::{
    CatalogService, ClusterConfig, Credentials, DirectoryService, Error, Result, ServiceKind,
    ServiceMock, StorageService,
};
use crate::directory::DirectoryMock;
use crate::storage::StorageDeviceMock;

/// Name of the single volume every test cluster exposes
pub const TEST_VOLUME_NAME: &str = "test";

pub struct TestCluster<
    D = DirectoryMock,
    M = MetadataCatalogMock,
    S = StorageDeviceMock,
    C = Client,
> {
    config: ClusterConfig,
    credentials: Credentials,
    volume_name: String,
    directory: D,
    catalog: M,
    storage_devices: Vec<S>,
    new_storage_device: Box<dyn FnMut() -> S + Send>,
    new_client: ClientFactory<C>,
    client: Option<C>,
    start_attempted: bool,
}

impl TestCluster {
    /// Cluster of default mocks: one directory, one catalog, one storage device
    pub fn new() -> Self {
        Self::with_config(ClusterConfig::default())
    }

    pub fn with_config(config: ClusterConfig) -> Self {
        let directory = DirectoryMock::new(&config);
        let catalog = MetadataCatalogMock::new(&config);
        let device_config = config.clone();
        Self::from_parts(
            config,
            directory,
            catalog,
            move || StorageDeviceMock::new(&device_config),
            Box::new(Client::create),
        )
    }
}

impl Default for TestCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, M, S, C> TestCluster<D, M, S, C>
where
    D: DirectoryService,
    M: CatalogService,
    S: StorageService,
    C: ClusterClient,
{
    /// Assemble a cluster from caller-provided services.
    /// `new_storage_device` builds the first device right away and every
    /// device added later.
    pub fn from_parts(
        config: ClusterConfig,
        directory: D,
        catalog: M,
        mut new_storage_device: impl FnMut() -> S + Send + 'static,
        new_client: ClientFactory<C>,
    ) -> Self {
        let first_device = new_storage_device();
        Self {
            config,
            credentials: Credentials::test_user(),
            volume_name: TEST_VOLUME_NAME.to_string(),
            directory,
            catalog,
            storage_devices: vec![first_device],
            new_storage_device: Box::new(new_storage_device),
            new_client,
            client: None,
            start_attempted: false,
        }
    }

    /// Grow the fleet by `count - 1` devices (the first one exists from
    /// construction). Additive across calls; 0 and 1 change nothing.
    ///
    /// Devices added after `start()` would never be started or registered,
    /// so that is rejected with [`Error::AlreadyStarted`].
    pub fn add_storage_devices(&mut self, count: usize) -> Result<()> {
        if self.start_attempted {
            return Err(Error::AlreadyStarted);
        }
        for _ in 1..count {
            let device = (self.new_storage_device)();
            self.storage_devices.push(device);
        }
        tracing::debug!("Storage device fleet size: {}", self.storage_devices.len());
        Ok(())
    }

    /// Bring the cluster up. `true` only if every service and the client started.
    pub async fn start(&mut self) -> bool {
        match self.try_start().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Test cluster failed to start: {}", e);
                false
            }
        }
    }

    /// Same sequence as [`start`](Self::start), reporting which step failed
    pub async fn try_start(&mut self) -> Result<()> {
        self.start_attempted = true;

        start_service(&mut self.directory, ServiceKind::Directory.to_string()).await?;
        start_service(&mut self.catalog, ServiceKind::MetadataCatalog.to_string()).await?;

        let catalog_address = running_address(&self.catalog)?;
        self.directory.register_volume(&self.volume_name, &catalog_address);
        tracing::info!(
            "Volume {} registered with catalog {}",
            self.volume_name,
            catalog_address
        );

        for (idx, device) in self.storage_devices.iter_mut().enumerate() {
            start_service(device, format!("{} #{}", ServiceKind::StorageDevice, idx)).await?;
            let address = running_address(&*device)?;
            self.catalog.register_storage_device(&address);
        }

        if self.config.service_address.is_empty() {
            self.config.service_address = running_address(&self.directory)?;
        }

        if let Some(mut previous) = self.client.take() {
            if let Err(e) = previous.shutdown().await {
                tracing::warn!("Previous client failed to shut down: {}", e);
            }
        }
        let mut client = (self.new_client)(
            &self.config.service_address,
            &self.credentials,
            self.config.tls.as_ref(),
            &self.config,
        )
        .map_err(|e| Error::ClientStart(e.to_string()))?;
        let started = client.start().await;
        // Owned even when it failed to start so stop() still shuts it down
        self.client = Some(client);
        started.map_err(|e| match e {
            Error::ClientStart(_) => e,
            other => Error::ClientStart(other.to_string()),
        })?;

        tracing::info!(
            "✓ Test cluster ready: directory {}, {} storage device(s)",
            self.config.service_address,
            self.storage_devices.len()
        );
        Ok(())
    }

    /// Tear the cluster down, attempting every step. Failures are logged.
    pub async fn stop(&mut self) {
        let _ = self.try_stop().await;
    }

    /// Same sequence as [`stop`](Self::stop), returning every failure as one
    /// [`Error::Teardown`]
    pub async fn try_stop(&mut self) -> Result<()> {
        let mut failures = Vec::new();

        if let Some(mut client) = self.client.take() {
            if let Err(e) = client.shutdown().await {
                failures.push(format!("client: {}", e));
            }
        }
        if let Err(e) = self.directory.stop().await {
            failures.push(format!("{}: {}", ServiceKind::Directory, e));
        }
        if let Err(e) = self.catalog.stop().await {
            failures.push(format!("{}: {}", ServiceKind::MetadataCatalog, e));
        }
        for (idx, device) in self.storage_devices.iter_mut().enumerate() {
            if let Err(e) = device.stop().await {
                failures.push(format!("{} #{}: {}", ServiceKind::StorageDevice, idx, e));
            }
        }

        if failures.is_empty() {
            tracing::info!("Test cluster stopped");
            return Ok(());
        }
        for failure in &failures {
            tracing::warn!("Teardown step failed: {}", failure);
        }
        Err(Error::Teardown(failures))
    }

    // === Accessors ===

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Options are read by `start()`; changes afterwards have no effect on
    /// the running cluster.
    pub fn config_mut(&mut self) -> &mut ClusterConfig {
        &mut self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn catalog(&self) -> &M {
        &self.catalog
    }

    pub fn storage_devices(&self) -> &[S] {
        &self.storage_devices
    }

    pub fn client(&self) -> Option<&C> {
        self.client.as_ref()
    }

    pub fn client_mut(&mut self) -> Option<&mut C> {
        self.client.as_mut()
    }
}

impl<D, M, S> TestCluster<D, M, S, Client>
where
    D: DirectoryService,
    M: CatalogService,
    S: StorageService,
{
    /// Open the cluster's volume through the started client
    pub async fn open_volume(&self) -> Result<Volume> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::NotRunning("client".into()))?;
        client.open_volume(&self.volume_name).await
    }
}

async fn start_service<T: ServiceMock + ?Sized>(service: &mut T, label: String) -> Result<()> {
    match service.start().await {
        Ok(()) => Ok(()),
        Err(Error::ServiceStart { reason, .. }) => Err(Error::ServiceStart {
            service: label,
            reason,
        }),
        Err(e) => Err(Error::ServiceStart {
            service: label,
            reason: e.to_string(),
        }),
    }
}

fn running_address<T: ServiceMock + ?Sized>(service: &T) -> Result<String> {
    service
        .address()
        .ok_or_else(|| Error::NotRunning(service.kind().to_string()))
}
