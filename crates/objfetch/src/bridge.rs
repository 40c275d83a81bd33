//! Sync bridge: exposes the asynchronous result stream as a blocking,
//! pull-based iterator, driving an event loop on a dedicated thread.

use std::future::Future;
use std::thread::JoinHandle;

use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, Result};
use crate::model::File;
use crate::pipeline::PipelineRun;

/// A blocking iterator over `File`s. Dropping it before exhaustion signals
/// cancellation, which cascades to the pipeline's task cancellation.
pub struct BlockingFileIter {
    rx: Receiver<Result<File>>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl Iterator for BlockingFileIter {
    type Item = Result<File>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.blocking_recv()
    }
}

impl Drop for BlockingFileIter {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawns a dedicated OS thread running its own current-thread runtime,
/// drives `factory` to build the pipeline run, and forwards its results
/// across a bounded channel. `factory` runs entirely on the new thread so
/// adapter construction (which may itself be async, e.g. credential
/// resolution) never touches the caller's runtime.
///
/// The hand-off to the consumer is itself raced against `cancel` inside
/// `forward`: a bare blocking send would park the bridge thread forever once
/// the consumer stops pulling, since nothing would ever unblock it to notice
/// cancellation.
pub fn drive_blocking<F, Fut>(factory: F) -> BlockingFileIter
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<PipelineRun>> + Send + 'static,
{
    let (tx, rx): (Sender<Result<File>>, Receiver<Result<File>>) = channel(1);
    let cancel = CancellationToken::new();
    let bridge_cancel = cancel.clone();

    let thread = std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                let _ = tx.blocking_send(Err(FetchError::Transport(anyhow::Error::new(e))));
                return;
            }
        };

        runtime.block_on(forward(factory, tx, bridge_cancel));
    });

    BlockingFileIter {
        rx,
        cancel,
        thread: Some(thread),
    }
}

async fn forward<F, Fut>(factory: F, tx: Sender<Result<File>>, cancel: CancellationToken)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<PipelineRun>>,
{
    let run = match factory().await {
        Ok(run) => run,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            return;
        }
    };

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                run.cancel.cancel();
                break;
            }
            item = run.results.recv() => {
                let Ok(item) = item else { break };

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        run.cancel.cancel();
                        break;
                    }
                    send_res = tx.send(item) => {
                        if send_res.is_err() {
                            run.cancel.cancel();
                            break;
                        }
                    }
                }
            }
        }
    }

    let _ = run.driver.await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::pipeline::fake::{entry, FakeAdapter};
    use crate::pipeline::{spawn_prefix_run, Bounds};

    use super::*;

    #[test]
    fn abandoning_the_iterator_before_exhaustion_does_not_deadlock() {
        let pages = vec![(0..50).map(|i| entry(&format!("k{i}"), Some("v1"))).collect()];
        let adapter =
            FakeAdapter::new("s3://test-bucket", pages).with_read_delay(Duration::from_millis(5));

        let mut iter = drive_blocking(move || async move {
            Ok(spawn_prefix_run(adapter, String::new(), None, Bounds::default()))
        });

        // Pull a few results, then drop before the iterator is exhausted.
        // If the bridge thread ever blocked on a send with nobody left to
        // call `next()`, this drop would hang forever and the test would
        // time out instead of returning.
        for _ in 0..3 {
            iter.next();
        }
        drop(iter);
    }
}
