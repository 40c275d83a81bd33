//! S3 store adapter.
//!
//! Listing uses `list_object_versions` so every version of every key is
//! yielded as a separate entry. A `VersionId` of the literal string `"null"`
//! or absent normalizes to the empty string.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures::StreamExt;
use time::OffsetDateTime;

use super::{Page, RawEntry, StoreAdapter};
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::model::normalize_version;

#[derive(Debug, Clone, Default)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub key: Option<String>,
    pub secret: Option<String>,
    pub token: Option<String>,
    pub region_name: Option<String>,
    pub anon: bool,
}

impl S3Config {
    /// Forwards the recognized config keys:
    /// `aws_endpoint_url`, `aws_key/secret/token`, `region_name`, `anon`.
    pub fn from_fetch_config(bucket: &str, config: &FetchConfig) -> Self {
        Self {
            bucket: bucket.to_string(),
            endpoint_url: config.aws_endpoint_url().map(str::to_string),
            key: config.aws_key().map(str::to_string),
            secret: config.aws_secret().map(str::to_string),
            token: config.aws_token().map(str::to_string),
            region_name: config.region_name().map(str::to_string),
            anon: config.anon(),
        }
    }
}

pub struct S3Adapter {
    client: Client,
    config: S3Config,
    source: String,
}

impl S3Adapter {
    pub async fn open(config: S3Config) -> Result<Self> {
        let region = config
            .region_name
            .clone()
            .map(aws_config::Region::new)
            .unwrap_or_else(|| aws_config::Region::new("us-east-1"));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);

        // Forward explicitly supplied credentials; otherwise fall through to
        // the SDK's default provider chain (env -> profile -> web identity ->
        // IMDS), falling back to anonymous if nothing resolves and `anon`
        // was requested or no credentials can be located.
        if !config.anon {
            if let (Some(key), Some(secret)) = (config.key.clone(), config.secret.clone()) {
                let creds = Credentials::new(key, secret, config.token.clone(), None, "objfetch");
                loader = loader.credentials_provider(creds);
            }
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config).force_path_style(true);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        if config.anon {
            builder = builder.credentials_provider(Credentials::new("", "", None, None, "anon"));
        }

        let client = Client::from_conf(builder.build());
        let source = format!("s3://{}", config.bucket);

        Ok(Self {
            client,
            config,
            source,
        })
    }
}

#[async_trait]
impl StoreAdapter for S3Adapter {
    fn source(&self) -> &str {
        &self.source
    }

    async fn list_pages(&self, prefix: &str, sink: async_channel::Sender<Page>) -> Result<()> {
        let mut stream = self
            .client
            .list_object_versions()
            .bucket(&self.config.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = stream.next().await {
            let page = page.map_err(|e| FetchError::Transport(anyhow::Error::new(e)))?;
            let entries: Page = page
                .versions()
                .iter()
                .map(|v| RawEntry {
                    key: v.key().unwrap_or_default().to_string(),
                    version: v.version_id().map(str::to_string),
                    size: v.size().map(|n| n.max(0) as u64),
                    last_modified: v
                        .last_modified()
                        .and_then(|t| OffsetDateTime::from_unix_timestamp(t.secs()).ok()),
                })
                .collect();

            if sink.send(entries).await.is_err() {
                break;
            }
        }

        Ok(())
    }

    async fn entry_to_pointer(&self, entry: RawEntry) -> Result<crate::model::FilePointer> {
        Ok(crate::model::FilePointer::new(
            self.source.clone(),
            entry.key,
            entry.size.unwrap_or(0),
            normalize_version(entry.version.as_deref()),
            entry.last_modified.unwrap_or(OffsetDateTime::UNIX_EPOCH),
        ))
    }

    async fn read(&self, path: &str, version: &str) -> Result<Bytes> {
        let mut request = self.client.get_object().bucket(&self.config.bucket).key(path);
        if !version.is_empty() {
            request = request.version_id(version);
        }

        let output = request.send().await.map_err(|e| {
            let service_err = e.as_service_error();
            if service_err.map(|e| e.is_no_such_key()).unwrap_or(false) {
                FetchError::NotFoundObject {
                    path: path.to_string(),
                    version: version.to_string(),
                }
            } else {
                FetchError::Transport(anyhow::Error::new(e))
            }
        })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| FetchError::Transport(anyhow::Error::new(e)))?;

        Ok(body.into_bytes())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_forwards_recognized_keys() {
        let fc = FetchConfig::new()
            .set("aws_endpoint_url", "http://localhost:9000")
            .set("aws_key", "AKIA")
            .set("aws_secret", "secret")
            .set("region_name", "eu-west-1")
            .set("anon", false);

        let cfg = S3Config::from_fetch_config("my-bucket", &fc);
        assert_eq!(cfg.bucket, "my-bucket");
        assert_eq!(cfg.endpoint_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(cfg.key.as_deref(), Some("AKIA"));
        assert_eq!(cfg.region_name.as_deref(), Some("eu-west-1"));
        assert!(!cfg.anon);
    }
}
