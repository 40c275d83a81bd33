//! In-memory fake adapter driving the scenario tests in this module,
//! letting the pipeline engine's concurrency and cancellation behavior be
//! exercised without a real cloud endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;

use crate::backends::{Page, RawEntry, StoreAdapter};
use crate::error::{FetchError, Result};
use crate::model::{normalize_version, FilePointer};

pub struct FakeAdapter {
    source: String,
    pages: Mutex<Vec<Page>>,
    read_delay: Duration,
    fail_paths: HashMap<String, ()>,
    pub close_calls: Arc<AtomicUsize>,
}

impl FakeAdapter {
    pub fn new(source: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            source: source.into(),
            pages: Mutex::new(pages),
            read_delay: Duration::ZERO,
            fail_paths: HashMap::new(),
            close_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn failing_read(mut self, path: &str) -> Self {
        self.fail_paths.insert(path.to_string(), ());
        self
    }
}

#[async_trait]
impl StoreAdapter for FakeAdapter {
    fn source(&self) -> &str {
        &self.source
    }

    async fn list_pages(&self, _prefix: &str, sink: async_channel::Sender<Page>) -> Result<()> {
        let pages = std::mem::take(&mut *self.pages.lock().unwrap());
        for page in pages {
            if sink.send(page).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn entry_to_pointer(&self, entry: RawEntry) -> Result<FilePointer> {
        Ok(FilePointer::new(
            self.source.clone(),
            entry.key,
            entry.size.unwrap_or(0),
            normalize_version(entry.version.as_deref()),
            entry.last_modified.unwrap_or(OffsetDateTime::UNIX_EPOCH),
        ))
    }

    async fn read(&self, path: &str, version: &str) -> Result<Bytes> {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        if self.fail_paths.contains_key(path) {
            return Err(FetchError::NotFoundObject {
                path: path.to_string(),
                version: version.to_string(),
            });
        }
        Ok(Bytes::from(format!("{path}@{version}")))
    }

    async fn close(&mut self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn entry(key: &str, version: Option<&str>) -> RawEntry {
    RawEntry {
        key: key.to_string(),
        version: version.map(str::to_string),
        size: Some(0),
        last_modified: None,
    }
}
