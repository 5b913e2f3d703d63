//! Storage device HTTP API
//!
//! Objects are addressed by `(file_id, object_no)` and kept in memory.

use crate::common::{blake3_hash, health_router, Error, Result, ServiceKind};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type ObjectKey = (String, u64);

/// Size and checksum of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub size: u64,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncateRequest {
    /// New file size in bytes
    pub size: u64,
    pub stripe_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncateResponse {
    pub objects_removed: usize,
}

#[derive(Clone, Default)]
pub struct StorageState {
    objects: Arc<RwLock<HashMap<ObjectKey, Bytes>>>,
}

impl StorageState {
    pub fn put_object(&self, file_id: &str, object_no: u64, data: Bytes) -> ObjectInfo {
        let info = ObjectInfo {
            size: data.len() as u64,
            checksum: blake3_hash(&data),
        };
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((file_id.to_string(), object_no), data);
        info
    }

    pub fn get_object(&self, file_id: &str, object_no: u64) -> Result<Bytes> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(file_id.to_string(), object_no))
            .cloned()
            .ok_or_else(|| Error::ObjectNotFound {
                file_id: file_id.to_string(),
                object_no,
            })
    }

    pub fn object_info(&self, file_id: &str, object_no: u64) -> Result<ObjectInfo> {
        let data = self.get_object(file_id, object_no)?;
        Ok(ObjectInfo {
            size: data.len() as u64,
            checksum: blake3_hash(&data),
        })
    }

    /// Drop objects past `size` and trim the one straddling it.
    /// Returns the number of objects removed.
    pub fn truncate(&self, file_id: &str, size: u64, stripe_size: u64) -> Result<usize> {
        if stripe_size == 0 {
            return Err(Error::InvalidConfig("stripe_size must be positive".into()));
        }

        let mut removed = 0;
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, object_no), data| {
                if id != file_id {
                    return true;
                }
                let start = object_no.saturating_mul(stripe_size);
                if start >= size {
                    removed += 1;
                    return false;
                }
                let keep = (size - start).min(stripe_size) as usize;
                if data.len() > keep {
                    *data = data.slice(..keep);
                }
                true
            });

        tracing::debug!(
            "Truncated {} to {} bytes, {} object(s) removed",
            file_id,
            size,
            removed
        );
        Ok(removed)
    }

    /// Number of objects held for `file_id`
    pub fn object_count(&self, file_id: &str) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(id, _)| id == file_id)
            .count()
    }
}

pub fn create_router(state: StorageState) -> Router {
    Router::new()
        .route(
            "/objects/:file_id/:object_no",
            get(read_object).put(write_object),
        )
        .route("/objects/:file_id/:object_no/checksum", get(check_object))
        .route("/files/:file_id/truncate", post(truncate_file))
        .with_state(state)
        .merge(health_router(ServiceKind::StorageDevice))
}

async fn write_object(
    State(state): State<StorageState>,
    Path((file_id, object_no)): Path<(String, u64)>,
    body: Bytes,
) -> Json<ObjectInfo> {
    Json(state.put_object(&file_id, object_no, body))
}

async fn read_object(
    State(state): State<StorageState>,
    Path((file_id, object_no)): Path<(String, u64)>,
) -> Result<Bytes> {
    state.get_object(&file_id, object_no)
}

async fn check_object(
    State(state): State<StorageState>,
    Path((file_id, object_no)): Path<(String, u64)>,
) -> Result<Json<ObjectInfo>> {
    state.object_info(&file_id, object_no).map(Json)
}

async fn truncate_file(
    State(state): State<StorageState>,
    Path(file_id): Path<String>,
    Json(req): Json<TruncateRequest>,
) -> Result<Json<TruncateResponse>> {
    let objects_removed = state.truncate(&file_id, req.size, req.stripe_size)?;
    Ok(Json(TruncateResponse { objects_removed }))
}
