//! Store adapter abstract contract and the closed enum that dispatches to
//! the three concrete backends via static enum matching rather than `dyn`.

mod azure;
mod gcs;
mod s3;

pub use azure::{AzureAdapter, AzureConfig};
pub use gcs::{GcsAdapter, GcsConfig};
pub use s3::{S3Adapter, S3Config};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;

use crate::error::Result;
use crate::model::FilePointer;

/// One store-native catalog entry, as returned by a listing round-trip.
/// Fields beyond `key` are `None` when the listing page didn't carry them
/// and a secondary per-entry fetch is required to fill them in
/// (`entry_to_pointer` does that fetch when needed).
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub key: String,
    pub version: Option<String>,
    pub size: Option<u64>,
    pub last_modified: Option<OffsetDateTime>,
}

/// An ordered batch of catalog entries from one listing round-trip.
pub type Page = Vec<RawEntry>;

#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Splits `<scheme>://<bucket>/<path>` into `<scheme>://<bucket>` and the
    /// path suffix. Implemented once per scheme, not per instance, so it
    /// lives as an associated function on each concrete adapter type rather
    /// than on the trait.
    fn source(&self) -> &str;

    /// Asynchronous producer: puts catalog pages on `sink` in store order,
    /// then drops `sink` to signal end-of-stream. Errors propagate to the
    /// pipeline, which cancels peers.
    async fn list_pages(&self, prefix: &str, sink: async_channel::Sender<Page>) -> Result<()>;

    /// Projects a native entry into a `FilePointer`, applying scheme-specific
    /// version cleaning and, for Azure/GCS when fields are missing, a
    /// secondary metadata fetch.
    async fn entry_to_pointer(&self, entry: RawEntry) -> Result<FilePointer>;

    /// Downloads the full body for a specific (path, version).
    async fn read(&self, path: &str, version: &str) -> Result<Bytes>;

    /// Releases any session or HTTP client. Idempotent; safe after a
    /// partially consumed iteration.
    async fn close(&mut self) -> Result<()>;
}

/// Closed set of concrete adapters. Static dispatch via `match`, no `dyn`.
pub enum Adapter {
    S3(S3Adapter),
    Gcs(GcsAdapter),
    Azure(AzureAdapter),
}

#[async_trait]
impl StoreAdapter for Adapter {
    fn source(&self) -> &str {
        match self {
            Adapter::S3(a) => a.source(),
            Adapter::Gcs(a) => a.source(),
            Adapter::Azure(a) => a.source(),
        }
    }

    async fn list_pages(&self, prefix: &str, sink: async_channel::Sender<Page>) -> Result<()> {
        match self {
            Adapter::S3(a) => a.list_pages(prefix, sink).await,
            Adapter::Gcs(a) => a.list_pages(prefix, sink).await,
            Adapter::Azure(a) => a.list_pages(prefix, sink).await,
        }
    }

    async fn entry_to_pointer(&self, entry: RawEntry) -> Result<FilePointer> {
        match self {
            Adapter::S3(a) => a.entry_to_pointer(entry).await,
            Adapter::Gcs(a) => a.entry_to_pointer(entry).await,
            Adapter::Azure(a) => a.entry_to_pointer(entry).await,
        }
    }

    async fn read(&self, path: &str, version: &str) -> Result<Bytes> {
        match self {
            Adapter::S3(a) => a.read(path, version).await,
            Adapter::Gcs(a) => a.read(path, version).await,
            Adapter::Azure(a) => a.read(path, version).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Adapter::S3(a) => a.close().await,
            Adapter::Gcs(a) => a.close().await,
            Adapter::Azure(a) => a.close().await,
        }
    }
}
