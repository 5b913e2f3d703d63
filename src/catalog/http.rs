//! Metadata catalog HTTP API
//!
//! Keeps the storage devices backing the volume and one record per file
//! (size, owner, stripe layout).

use crate::common::{
    health_router, timestamp_now, validate_path, Credentials, Error, Result, ServiceKind,
};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// File metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: String,
    pub path: String,
    pub size: u64,
    pub owner: String,
    pub group: String,
    /// Storage devices the file is striped over; object `n` lives on `replicas[n % len]`
    pub replicas: Vec<String>,
    pub stripe_size: u64,
    pub created_at: u64,
    pub modified_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRequest {
    pub path: String,
    #[serde(default)]
    pub create: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSizeRequest {
    pub size: u64,
    /// Shrink allowed only when set; otherwise the size only grows
    #[serde(default)]
    pub truncate: bool,
}

#[derive(Default)]
struct Catalog {
    storage_devices: Vec<String>,
    files: HashMap<String, FileRecord>,
    paths: HashMap<String, String>,
}

#[derive(Clone)]
pub struct CatalogState {
    catalog: Arc<RwLock<Catalog>>,
    stripe_size: u64,
}

impl CatalogState {
    pub fn new(stripe_size: u64) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(Catalog::default())),
            stripe_size,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }

    // === Storage devices ===

    pub fn register_storage_device(&self, address: &str) {
        let mut catalog = self.write();
        if catalog.storage_devices.iter().any(|d| d == address) {
            tracing::debug!("Storage device {} already registered", address);
            return;
        }
        catalog.storage_devices.push(address.to_string());
        tracing::debug!(
            "Storage device {} registered ({} total)",
            address,
            catalog.storage_devices.len()
        );
    }

    pub fn storage_devices(&self) -> Vec<String> {
        self.read().storage_devices.clone()
    }

    // === Files ===

    /// Open a file by path, creating it when asked
    pub fn open(&self, credentials: Option<&Credentials>, req: &OpenRequest) -> Result<FileRecord> {
        validate_path(&req.path)?;

        let mut catalog = self.write();
        if let Some(file_id) = catalog.paths.get(&req.path) {
            if let Some(record) = catalog.files.get(file_id) {
                return Ok(record.clone());
            }
        }

        if !req.create {
            return Err(Error::FileNotFound(req.path.clone()));
        }
        let credentials = credentials.ok_or_else(|| {
            Error::PermissionDenied(format!("anonymous users cannot create {}", req.path))
        })?;
        if catalog.storage_devices.is_empty() {
            return Err(Error::NoStorageDevices);
        }

        let now = timestamp_now();
        let record = FileRecord {
            file_id: uuid::Uuid::new_v4().to_string(),
            path: req.path.clone(),
            size: 0,
            owner: credentials.username().to_string(),
            group: credentials.primary_group().unwrap_or_default().to_string(),
            replicas: catalog.storage_devices.clone(),
            stripe_size: self.stripe_size,
            created_at: now,
            modified_at: now,
        };
        catalog.paths.insert(record.path.clone(), record.file_id.clone());
        catalog.files.insert(record.file_id.clone(), record.clone());

        tracing::debug!(
            "Created {} ({}) striped over {} device(s)",
            record.path,
            record.file_id,
            record.replicas.len()
        );
        Ok(record)
    }

    pub fn get_file(&self, file_id: &str) -> Result<FileRecord> {
        self.read()
            .files
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::FileNotFound(file_id.to_string()))
    }

    pub fn set_size(&self, file_id: &str, req: &SetSizeRequest) -> Result<FileRecord> {
        let mut catalog = self.write();
        let record = catalog
            .files
            .get_mut(file_id)
            .ok_or_else(|| Error::FileNotFound(file_id.to_string()))?;

        record.size = if req.truncate {
            req.size
        } else {
            record.size.max(req.size)
        };
        record.modified_at = timestamp_now();
        Ok(record.clone())
    }
}

pub fn create_router(state: CatalogState) -> Router {
    Router::new()
        .route("/storage-devices", get(list_storage_devices))
        .route("/files/open", post(open_file))
        .route("/files/:file_id", get(get_file))
        .route("/files/:file_id/size", post(set_size))
        .with_state(state)
        .merge(health_router(ServiceKind::MetadataCatalog))
}

async fn list_storage_devices(State(state): State<CatalogState>) -> Json<Vec<String>> {
    Json(state.storage_devices())
}

async fn open_file(
    State(state): State<CatalogState>,
    headers: HeaderMap,
    Json(req): Json<OpenRequest>,
) -> Result<Json<FileRecord>> {
    let credentials = Credentials::from_headers(&headers);
    state.open(credentials.as_ref(), &req).map(Json)
}

async fn get_file(
    State(state): State<CatalogState>,
    Path(file_id): Path<String>,
) -> Result<Json<FileRecord>> {
    state.get_file(&file_id).map(Json)
}

async fn set_size(
    State(state): State<CatalogState>,
    Path(file_id): Path<String>,
    Json(req): Json<SetSizeRequest>,
) -> Result<Json<FileRecord>> {
    state.set_size(&file_id, &req).map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_req(path: &str, create: bool) -> OpenRequest {
        OpenRequest {
            path: path.to_string(),
            create,
        }
    }

    #[test]
    fn test_storage_device_registry_keeps_order() {
        let state = CatalogState::new(4096);
        state.register_storage_device("127.0.0.1:3");
        state.register_storage_device("127.0.0.1:1");
        state.register_storage_device("127.0.0.1:3");
        assert_eq!(state.storage_devices(), vec!["127.0.0.1:3", "127.0.0.1:1"]);
    }

    #[test]
    fn test_create_and_reopen() {
        let state = CatalogState::new(4096);
        state.register_storage_device("127.0.0.1:1");
        state.register_storage_device("127.0.0.1:2");
        let creds = Credentials::test_user();

        let created = state.open(Some(&creds), &open_req("/a", true)).unwrap();
        assert_eq!(created.owner, "ClientTest");
        assert_eq!(created.group, "ClientTest");
        assert_eq!(created.replicas.len(), 2);
        assert_eq!(created.stripe_size, 4096);
        assert_eq!(created.size, 0);

        let reopened = state.open(None, &open_req("/a", false)).unwrap();
        assert_eq!(reopened.file_id, created.file_id);
    }

    #[test]
    fn test_open_errors() {
        let state = CatalogState::new(4096);
        let creds = Credentials::test_user();

        assert!(matches!(
            state.open(Some(&creds), &open_req("/missing", false)),
            Err(Error::FileNotFound(_))
        ));
        assert!(matches!(
            state.open(Some(&creds), &open_req("relative", true)),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            state.open(Some(&creds), &open_req("/new", true)),
            Err(Error::NoStorageDevices)
        ));

        state.register_storage_device("127.0.0.1:1");
        assert!(matches!(
            state.open(None, &open_req("/new", true)),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_set_size_grows_unless_truncating() {
        let state = CatalogState::new(4096);
        state.register_storage_device("127.0.0.1:1");
        let record = state
            .open(Some(&Credentials::test_user()), &open_req("/f", true))
            .unwrap();

        let grow = |size| SetSizeRequest {
            size,
            truncate: false,
        };
        assert_eq!(state.set_size(&record.file_id, &grow(100)).unwrap().size, 100);
        assert_eq!(state.set_size(&record.file_id, &grow(50)).unwrap().size, 100);

        let shrunk = state
            .set_size(
                &record.file_id,
                &SetSizeRequest {
                    size: 10,
                    truncate: true,
                },
            )
            .unwrap();
        assert_eq!(shrunk.size, 10);
        assert_eq!(state.get_file(&record.file_id).unwrap().size, 10);

        assert!(matches!(
            state.set_size("nope", &grow(1)),
            Err(Error::FileNotFound(_))
        ));
    }
}
