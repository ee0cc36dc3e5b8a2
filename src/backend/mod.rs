mod http;
mod local;

#[cfg(test)]
mod mock;

pub use http::HttpBackend;
pub use local::LocalBackend;

#[cfg(test)]
pub use mock::{Call, MockBackend};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Entry, EntryKind};

/// Remote file store behind the tree. Every call is a full round-trip.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Flat listing, ordered parent-before-child.
    async fn list(&self) -> Result<Vec<Entry>>;

    async fn create(&self, path: &str, kind: EntryKind) -> Result<()>;

    /// Delete a file or a directory with everything below it.
    async fn delete(&self, path: &str) -> Result<()>;

    async fn read_file(&self, path: &str) -> Result<String>;

    /// Replace the content of an existing file.
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;
}
