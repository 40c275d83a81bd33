//! The shared three-stage fetch engine: page producer → page processor →
//! read workers → result channel. Both prefix mode and pointer-list mode
//! funnel into the same per-read-task logic.

use std::sync::Arc;

use async_channel::{Receiver, Sender};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::bounds::Bounds;
use crate::backends::{Page, RawEntry, StoreAdapter};
use crate::error::{FetchError, Result};
use crate::glob::Matcher;
use crate::model::{File, FilePointer};

/// One driven pipeline run: the result stream plus the cancellation handle
/// the sync bridge (or an abandoning async consumer) triggers on drop.
pub struct PipelineRun {
    pub results: Receiver<Result<File>>,
    pub cancel: CancellationToken,
    pub driver: JoinHandle<()>,
}

/// Strips leading/trailing delimiters and appends exactly one trailing
/// delimiter, unless `prefix` is empty. A bare or trailing-slash prefix is
/// tolerated and normalized rather than rejected.
pub fn normalize_prefix(prefix: &str) -> String {
    let stripped = prefix.trim_matches('/');
    if stripped.is_empty() {
        String::new()
    } else {
        format!("{stripped}/")
    }
}

pub fn spawn_prefix_run<A: StoreAdapter + 'static>(
    adapter: A,
    prefix: String,
    matcher: Option<Matcher>,
    bounds: Bounds,
) -> PipelineRun {
    let adapter = Arc::new(adapter);
    let sem = Arc::new(Semaphore::new(bounds.read_concurrency));
    let cancel = CancellationToken::new();
    let (result_tx, result_rx) = async_channel::bounded(bounds.result_queue_depth);

    let driver_adapter = adapter.clone();
    let driver_cancel = cancel.clone();
    let prefix = normalize_prefix(&prefix);
    let driver = tokio::spawn(drive_prefix(
        driver_adapter,
        prefix,
        matcher,
        bounds,
        sem,
        result_tx,
        driver_cancel,
    ));

    PipelineRun {
        results: result_rx,
        cancel,
        driver,
    }
}

pub fn spawn_pointer_run<A: StoreAdapter + 'static>(
    adapter: A,
    pointers: Vec<FilePointer>,
    bounds: Bounds,
) -> PipelineRun {
    let adapter = Arc::new(adapter);
    let sem = Arc::new(Semaphore::new(bounds.read_concurrency));
    let cancel = CancellationToken::new();
    let (result_tx, result_rx) = async_channel::bounded(bounds.result_queue_depth);

    let driver_adapter = adapter.clone();
    let driver_cancel = cancel.clone();
    let driver = tokio::spawn(drive_pointers(
        driver_adapter,
        pointers,
        bounds,
        sem,
        result_tx,
        driver_cancel,
    ));

    PipelineRun {
        results: result_rx,
        cancel,
        driver,
    }
}

async fn drive_prefix<A: StoreAdapter + 'static>(
    adapter: Arc<A>,
    prefix: String,
    matcher: Option<Matcher>,
    bounds: Bounds,
    sem: Arc<Semaphore>,
    result_tx: Sender<Result<File>>,
    cancel: CancellationToken,
) {
    let (page_tx, page_rx) = async_channel::bounded::<Page>(bounds.page_queue_depth);

    let list_adapter = adapter.clone();
    let list_prefix = prefix.clone();
    let list_cancel = cancel.clone();
    let list_task: JoinHandle<Result<()>> = tokio::spawn(async move {
        tokio::select! {
            res = list_adapter.list_pages(&list_prefix, page_tx) => res,
            _ = list_cancel.cancelled() => Ok(()),
        }
    });

    let mut found = false;
    let mut read_handles = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            page = page_rx.recv() => {
                let Ok(page) = page else { break };
                if !page.is_empty() {
                    found = true;
                }
                for entry in page {
                    if !crate::glob::should_read(&entry.key, matcher.as_ref()) {
                        continue;
                    }
                    read_handles.push(spawn_entry_read_task(
                        adapter.clone(),
                        sem.clone(),
                        entry,
                        result_tx.clone(),
                        cancel.clone(),
                    ));
                }
            }
        }
    }

    let list_result = list_task.await;
    if !matches!(list_result, Ok(Ok(()))) {
        // A listing failure aborts the pipeline: cancel before draining
        // reads already in flight so they stop instead of each delivering
        // a File ahead of the error.
        cancel.cancel();
    }

    for handle in read_handles {
        let _ = handle.await;
    }

    let mut terminal_err = match list_result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(join_err) => Some(FetchError::Transport(anyhow::anyhow!(
            "list task panicked: {join_err}"
        ))),
    };

    if terminal_err.is_none() && !found && !cancel.is_cancelled() {
        terminal_err = Some(FetchError::NotFoundPrefix(prefix));
    }

    if let Some(err) = terminal_err {
        if !err.is_cancelled() {
            let _ = result_tx.send(Err(err)).await;
        }
    }

    drop(result_tx);
    close_adapter(adapter).await;
}

async fn drive_pointers<A: StoreAdapter + 'static>(
    adapter: Arc<A>,
    pointers: Vec<FilePointer>,
    bounds: Bounds,
    sem: Arc<Semaphore>,
    result_tx: Sender<Result<File>>,
    cancel: CancellationToken,
) {
    let mut handles = Vec::new();

    for (i, pointer) in pointers.into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        handles.push(spawn_pointer_read_task(
            adapter.clone(),
            sem.clone(),
            pointer,
            result_tx.clone(),
            cancel.clone(),
        ));

        if (i + 1) % bounds.pointer_batch_size == 0 {
            debug!(batch_end = i + 1, "pointer mode batch join");
            for handle in handles.drain(..) {
                let _ = handle.await;
            }
        }
    }

    for handle in handles {
        let _ = handle.await;
    }

    drop(result_tx);
    close_adapter(adapter).await;
}

fn spawn_entry_read_task<A: StoreAdapter + 'static>(
    adapter: Arc<A>,
    sem: Arc<Semaphore>,
    entry: RawEntry,
    result_tx: Sender<Result<File>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            permit = sem.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
        };

        let pointer = match adapter.entry_to_pointer(entry).await {
            Ok(pointer) => pointer,
            Err(e) => {
                drop(permit);
                let _ = result_tx.send(Err(e)).await;
                return;
            }
        };

        finish_read(adapter, permit, pointer, result_tx).await;
    })
}

fn spawn_pointer_read_task<A: StoreAdapter + 'static>(
    adapter: Arc<A>,
    sem: Arc<Semaphore>,
    pointer: FilePointer,
    result_tx: Sender<Result<File>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            permit = sem.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
        };

        finish_read(adapter, permit, pointer, result_tx).await;
    })
}

async fn finish_read<A: StoreAdapter + 'static>(
    adapter: Arc<A>,
    permit: tokio::sync::OwnedSemaphorePermit,
    pointer: FilePointer,
    result_tx: Sender<Result<File>>,
) {
    let outcome = adapter.read(&pointer.path, &pointer.version).await;
    drop(permit);

    match outcome {
        Ok(bytes) => {
            let _ = result_tx.send(Ok(File::from_pointer(pointer, bytes))).await;
        }
        Err(e) => {
            let _ = result_tx.send(Err(e)).await;
        }
    }
}

/// Runs `close()` exactly once, once every clone of the shared adapter
/// handle held by in-flight tasks has been dropped.
async fn close_adapter<A: StoreAdapter + 'static>(adapter: Arc<A>) {
    match Arc::try_unwrap(adapter) {
        Ok(mut adapter) => {
            if let Err(e) = adapter.close().await {
                warn!("adapter close failed: {e}");
            }
        }
        Err(_) => {
            warn!("adapter close skipped: outstanding references remained after drain");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_normalization() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/pref"), "pref/");
        assert_eq!(normalize_prefix("pref"), "pref/");
        assert_eq!(normalize_prefix("pref/"), "pref/");
    }
}
