//! Metadata / replica catalog mock
//!
//! Holds per-file metadata and the storage devices backing the volume.

pub mod http;
pub mod server;

pub use http::{CatalogState, FileRecord, OpenRequest, SetSizeRequest};
pub use server::MetadataCatalogMock;
