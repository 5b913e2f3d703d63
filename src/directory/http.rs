//! Directory HTTP API

use crate::common::{health_router, Error, Result, ServiceKind};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Volume → catalog registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub name: String,
    pub catalog_address: String,
}

/// Registry shared between the in-process API and the HTTP handlers
#[derive(Clone, Default)]
pub struct DirectoryState {
    volumes: Arc<RwLock<BTreeMap<String, String>>>,
}

impl DirectoryState {
    /// Register (or re-point) a volume
    pub fn register_volume(&self, volume: &str, catalog_address: &str) {
        let previous = self
            .volumes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(volume.to_string(), catalog_address.to_string());
        match previous {
            Some(old) if old != catalog_address => {
                tracing::debug!("Volume {} moved from {} to {}", volume, old, catalog_address)
            }
            _ => tracing::debug!("Volume {} registered at {}", volume, catalog_address),
        }
    }

    pub fn resolve_volume(&self, volume: &str) -> Option<String> {
        self.volumes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(volume)
            .cloned()
    }

    pub fn list_volumes(&self) -> Vec<VolumeRecord> {
        self.volumes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, catalog_address)| VolumeRecord {
                name: name.clone(),
                catalog_address: catalog_address.clone(),
            })
            .collect()
    }
}

pub fn create_router(state: DirectoryState) -> Router {
    Router::new()
        .route("/volumes", get(list_volumes))
        .route("/volumes/:name", get(get_volume))
        .with_state(state)
        .merge(health_router(ServiceKind::Directory))
}

async fn list_volumes(State(state): State<DirectoryState>) -> Json<Vec<VolumeRecord>> {
    Json(state.list_volumes())
}

async fn get_volume(
    State(state): State<DirectoryState>,
    Path(name): Path<String>,
) -> Result<Json<VolumeRecord>> {
    let catalog_address = state
        .resolve_volume(&name)
        .ok_or_else(|| Error::VolumeNotFound(name.clone()))?;
    Ok(Json(VolumeRecord {
        name,
        catalog_address,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let state = DirectoryState::default();
        assert!(state.resolve_volume("test").is_none());

        state.register_volume("test", "127.0.0.1:4000");
        assert_eq!(state.resolve_volume("test").as_deref(), Some("127.0.0.1:4000"));

        state.register_volume("test", "127.0.0.1:4001");
        assert_eq!(state.resolve_volume("test").as_deref(), Some("127.0.0.1:4001"));
        assert_eq!(state.list_volumes().len(), 1);
    }

    #[test]
    fn test_clones_share_registry() {
        let state = DirectoryState::default();
        let handler_view = state.clone();
        state.register_volume("a", "127.0.0.1:1");
        state.register_volume("b", "127.0.0.1:2");

        let names: Vec<String> = handler_view
            .list_volumes()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
