//! Storage device mock
//!
//! In-memory object store addressed by file id and object number.

pub mod http;
pub mod server;

pub use http::{ObjectInfo, StorageState, TruncateRequest, TruncateResponse};
pub use server::StorageDeviceMock;
