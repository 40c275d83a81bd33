//! GCS store adapter.
//!
//! Listing paginates per-prefix with versioning included. In this SDK the
//! list response already carries size/updated/generation, so the secondary
//! metadata fetch is an explicit `get_object` fallback taken only when a
//! field is genuinely absent.

use async_trait::async_trait;
use bytes::Bytes;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use time::OffsetDateTime;

use super::{Page, RawEntry, StoreAdapter};
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::model::{normalize_version, FilePointer};

#[derive(Debug, Clone, Default)]
pub struct GcsConfig {
    pub bucket: String,
    pub anon: bool,
}

impl GcsConfig {
    pub fn from_fetch_config(bucket: &str, config: &FetchConfig) -> Self {
        Self {
            bucket: bucket.to_string(),
            anon: config.anon(),
        }
    }
}

pub struct GcsAdapter {
    client: Client,
    config: GcsConfig,
    source: String,
}

impl GcsAdapter {
    pub async fn open(config: GcsConfig) -> Result<Self> {
        let client_config = if config.anon {
            ClientConfig::default().anonymous()
        } else {
            ClientConfig::default()
                .with_auth()
                .await
                .map_err(|e| FetchError::AuthMissing(e.to_string()))?
        };

        let client = Client::new(client_config);
        let source = format!("gs://{}", config.bucket);

        Ok(Self {
            client,
            config,
            source,
        })
    }
}

#[async_trait]
impl StoreAdapter for GcsAdapter {
    fn source(&self) -> &str {
        &self.source
    }

    async fn list_pages(&self, prefix: &str, sink: async_channel::Sender<Page>) -> Result<()> {
        let mut page_token: Option<String> = None;

        loop {
            let request = ListObjectsRequest {
                bucket: self.config.bucket.clone(),
                prefix: Some(prefix.to_string()),
                versions: Some(true),
                page_token: page_token.clone(),
                ..Default::default()
            };

            let response = self
                .client
                .list_objects(&request)
                .await
                .map_err(|e| FetchError::Transport(anyhow::Error::new(e)))?;

            let entries: Page = response
                .items
                .unwrap_or_default()
                .into_iter()
                .map(|obj| RawEntry {
                    key: obj.name,
                    version: Some(obj.generation.to_string()),
                    size: Some(obj.size as u64),
                    last_modified: obj
                        .updated
                        .and_then(|t| OffsetDateTime::from_unix_timestamp(t.seconds).ok()),
                })
                .collect();

            if sink.send(entries).await.is_err() {
                break;
            }

            page_token = response.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(())
    }

    async fn entry_to_pointer(&self, entry: RawEntry) -> Result<FilePointer> {
        let (size, last_modified) = match (entry.size, entry.last_modified) {
            (Some(size), Some(last_modified)) => (size, last_modified),
            _ => {
                let request = GetObjectRequest {
                    bucket: self.config.bucket.clone(),
                    object: entry.key.clone(),
                    ..Default::default()
                };
                let meta = self
                    .client
                    .get_object(&request)
                    .await
                    .map_err(|e| FetchError::Transport(anyhow::Error::new(e)))?;
                (
                    meta.size as u64,
                    meta.updated
                        .and_then(|t| OffsetDateTime::from_unix_timestamp(t.seconds).ok())
                        .unwrap_or(OffsetDateTime::UNIX_EPOCH),
                )
            }
        };

        Ok(FilePointer::new(
            self.source.clone(),
            entry.key,
            size,
            normalize_version(entry.version.as_deref()),
            last_modified,
        ))
    }

    async fn read(&self, path: &str, version: &str) -> Result<Bytes> {
        let generation = if version.is_empty() {
            None
        } else {
            version.parse::<i64>().ok()
        };

        let request = GetObjectRequest {
            bucket: self.config.bucket.clone(),
            object: path.to_string(),
            generation,
            ..Default::default()
        };

        let data = self
            .client
            .download_object(&request, &Range::default())
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    FetchError::NotFoundObject {
                        path: path.to_string(),
                        version: version.to_string(),
                    }
                } else {
                    FetchError::Transport(anyhow::Error::new(e))
                }
            })?;

        Ok(Bytes::from(data))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn is_not_found(err: &google_cloud_storage::http::Error) -> bool {
    err.to_string().contains("404")
}
