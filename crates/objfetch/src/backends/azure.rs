//! Azure Blob store adapter.
//!
//! Listing uses container-level blob listing with metadata and versions
//! included; key field is `name`. A per-entry detail fetch fills
//! size/version/last_modified when the list page didn't carry them, before
//! projecting to a `FilePointer`.

use async_trait::async_trait;
use azure_core::error::ErrorKind as AzureErrorKind;
use azure_storage::prelude::*;
use azure_storage_blobs::prelude::*;
use bytes::Bytes;
use futures::StreamExt;
use time::OffsetDateTime;

use super::{Page, RawEntry, StoreAdapter};
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::model::{normalize_version, FilePointer};

#[derive(Debug, Clone, Default)]
pub struct AzureConfig {
    pub account: String,
    pub container: String,
    pub access_key: Option<String>,
    pub anon: bool,
}

impl AzureConfig {
    /// The storage account is not part of an `az://container/prefix` URI,
    /// so it is forwarded through the config mapping's `azure_account` key
    /// as an additional transport-specific setting.
    pub fn from_fetch_config(container: &str, config: &FetchConfig) -> Self {
        Self {
            account: config.str_opt("azure_account").unwrap_or_default().to_string(),
            container: container.to_string(),
            access_key: config.str_opt("azure_access_key").map(str::to_string),
            anon: config.anon(),
        }
    }
}

pub struct AzureAdapter {
    client: ContainerClient,
    source: String,
}

impl AzureAdapter {
    pub fn open(config: AzureConfig) -> Result<Self> {
        let storage_credentials = if config.anon {
            StorageCredentials::anonymous()
        } else if let Some(key) = &config.access_key {
            StorageCredentials::access_key(config.account.clone(), key.clone())
        } else {
            StorageCredentials::anonymous()
        };

        let client = ClientBuilder::new(config.account.clone(), storage_credentials)
            .container_client(config.container.clone());

        let source = format!("az://{}", config.container);
        Ok(Self { client, source })
    }
}

#[async_trait]
impl StoreAdapter for AzureAdapter {
    fn source(&self) -> &str {
        &self.source
    }

    async fn list_pages(&self, prefix: &str, sink: async_channel::Sender<Page>) -> Result<()> {
        let mut builder = self.client.list_blobs();
        if !prefix.is_empty() {
            builder = builder.prefix(prefix.to_string());
        }
        builder = builder.include_metadata(true).include_versions(true);

        let mut stream = builder.into_stream();
        while let Some(page) = stream.next().await {
            let page = page.map_err(|e| map_azure_error(e, ""))?;
            let entries: Page = page
                .blobs
                .blobs()
                .map(|b| RawEntry {
                    key: b.name.clone(),
                    version: b.version_id.clone(),
                    size: Some(b.properties.content_length),
                    last_modified: Some(b.properties.last_modified),
                })
                .collect();

            if sink.send(entries).await.is_err() {
                break;
            }
        }

        Ok(())
    }

    async fn entry_to_pointer(&self, entry: RawEntry) -> Result<FilePointer> {
        // Fields the list page already carries are used as-is; a second
        // round-trip only happens when something is genuinely missing.
        let (size, last_modified) = match (entry.size, entry.last_modified) {
            (Some(size), Some(last_modified)) => (size, last_modified),
            _ => {
                let blob_client = self.client.blob_client(&entry.key);
                let props = blob_client
                    .get_properties()
                    .await
                    .map_err(|e| map_azure_error(e, &entry.key))?;
                (
                    props.blob.properties.content_length,
                    props.blob.properties.last_modified,
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
        let blob_client = self.client.blob_client(path);
        let mut builder = blob_client.get();
        if !version.is_empty() {
            builder = builder.blob_versioning(version.to_string().into());
        }

        let mut stream = builder.into_stream();
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_azure_error(e, path))?;
            let data = chunk
                .data
                .collect()
                .await
                .map_err(|e| FetchError::Transport(anyhow::Error::new(e)))?;
            buf.extend_from_slice(&data);
        }

        Ok(Bytes::from(buf))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn map_azure_error(err: azure_core::Error, path: &str) -> FetchError {
    match err.kind() {
        AzureErrorKind::HttpResponse { status, .. } if status.as_u16() == 404 => {
            FetchError::NotFoundObject {
                path: path.to_string(),
                version: String::new(),
            }
        }
        _ => FetchError::Transport(anyhow::Error::new(err)),
    }
}
