//! Directory mock
//!
//! Resolves volume names to the endpoint of the metadata catalog serving them.

pub mod http;
pub mod server;

pub use http::{DirectoryState, VolumeRecord};
pub use server::DirectoryMock;
