//! # testcluster
//!
//! Stand up a minimal storage cluster of mock services for client tests:
//! - a directory resolving volume names to metadata catalogs
//! - a metadata catalog holding file records and the storage devices backing the volume
//! - one or more storage devices holding object data
//! - a client wired to the directory
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────┐
//!   Client ─▶│  Directory   │  volume "test" → catalog address
//!     │      └──────────────┘
//!     │      ┌──────────────┐
//!     ├─────▶│   Catalog    │  files, stripe layout, storage devices
//!     │      └──────────────┘
//!     │      ┌──────────────┬──────────────┬──────────────┐
//!     └─────▶│  Storage #0  │  Storage #1  │  Storage #N  │  objects
//!            └──────────────┴──────────────┴──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! # async fn demo() -> testcluster::Result<()> {
//! use testcluster::TestCluster;
//!
//! let mut cluster = TestCluster::new();
//! cluster.add_storage_devices(3)?;
//! assert!(cluster.start().await);
//!
//! let volume = cluster.open_volume().await?;
//! let mut file = volume.open("/hello.txt", true).await?;
//! file.write(0, b"hello").await?;
//! assert_eq!(file.read(0, 5).await?, b"hello");
//!
//! cluster.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod client;
pub mod cluster;
pub mod common;
pub mod directory;
pub mod storage;

// Re-export commonly used types
pub use client::{Client, ClusterClient, FileHandle, Volume};
pub use cluster::{TestCluster, TEST_VOLUME_NAME};
pub use common::{ClusterConfig, Credentials, Error, Result};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
