//! Concrete pipeline scenarios driven against `FakeAdapter` instead of a
//! real cloud endpoint.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::glob::compile;
use crate::model::FilePointer;
use crate::pipeline::fake::{entry, FakeAdapter};
use crate::pipeline::{spawn_pointer_run, spawn_prefix_run, Bounds};

async fn drain(run: crate::pipeline::PipelineRun) -> Vec<crate::error::Result<crate::model::File>> {
    let mut out = Vec::new();
    while let Ok(item) = run.results.recv().await {
        out.push(item);
    }
    let _ = run.driver.await;
    out
}

#[tokio::test]
async fn s1_invalid_keys_are_rejected_by_is_valid_key() {
    let pages = vec![vec![
        entry("a.txt", Some("v1")),
        entry("a.txt", Some("v2")),
        entry("b/c.jpg", Some("v1")),
        entry("/bad", Some("v1")),
        entry("d//e", Some("v1")),
    ]];
    let adapter = FakeAdapter::new("s3://test-bucket", pages);
    let run = spawn_prefix_run(adapter, String::new(), None, Bounds::default());
    let results = drain(run).await;

    let ok_paths: Vec<_> = results
        .into_iter()
        .filter_map(|r| r.ok())
        .map(|f| (f.path, f.version))
        .collect();

    assert_eq!(ok_paths.len(), 3);
    assert!(ok_paths.contains(&("a.txt".to_string(), "v1".to_string())));
    assert!(ok_paths.contains(&("a.txt".to_string(), "v2".to_string())));
    assert!(ok_paths.contains(&("b/c.jpg".to_string(), "v1".to_string())));
}

#[tokio::test]
async fn s2_glob_is_case_sensitive() {
    let pages = vec![vec![
        entry("pref/x.jpg", None),
        entry("pref/x.png", None),
        entry("pref/y.JPG", None),
    ]];
    let adapter = FakeAdapter::new("s3://bucket", pages);
    let matcher = compile(Some("pref/*.jpg")).unwrap();
    let run = spawn_prefix_run(adapter, "pref".to_string(), matcher, Bounds::default());
    let results = drain(run).await;
    let ok: Vec<_> = results.into_iter().filter_map(|r| r.ok()).collect();

    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0].path, "pref/x.jpg");
}

#[tokio::test]
async fn s3_empty_listing_surfaces_not_found_prefix() {
    let adapter = FakeAdapter::new("s3://empty", vec![vec![]]);
    let run = spawn_prefix_run(adapter, String::new(), None, Bounds::default());
    let results = drain(run).await;

    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0],
        Err(crate::error::FetchError::NotFoundPrefix(_))
    ));
}

#[tokio::test]
async fn s4_pointer_mode_batches_large_lists() {
    let pointers: Vec<FilePointer> = (0..12_003)
        .map(|i| {
            FilePointer::new(
                "s3://bucket",
                format!("k{i}"),
                0,
                "",
                time::OffsetDateTime::UNIX_EPOCH,
            )
        })
        .collect();

    let adapter =
        FakeAdapter::new("s3://bucket", vec![]).with_read_delay(Duration::from_millis(1));
    let mut bounds = Bounds::default();
    bounds.pointer_batch_size = 5000;
    let run = spawn_pointer_run(adapter, pointers, bounds);
    let results = drain(run).await;

    assert_eq!(results.len(), 12_003);
    assert!(results.iter().all(|r| r.is_ok()));
}

#[tokio::test]
async fn s5_consumer_abandonment_closes_adapter_exactly_once() {
    let pages = vec![(0..20).map(|i| entry(&format!("k{i}"), None)).collect()];
    let adapter = FakeAdapter::new("s3://bucket", pages).with_read_delay(Duration::from_millis(5));
    let close_calls = adapter.close_calls.clone();

    let run = spawn_prefix_run(adapter, String::new(), None, Bounds::default());
    for _ in 0..10 {
        let _ = run.results.recv().await;
    }
    run.cancel.cancel();
    let _ = run.driver.await;

    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn s6_a_failed_read_does_not_abort_other_reads() {
    let pages = vec![vec![entry("good", None), entry("missing", None)]];
    let adapter = FakeAdapter::new("s3://bucket", pages).failing_read("missing");
    let run = spawn_prefix_run(adapter, String::new(), None, Bounds::default());
    let results = drain(run).await;

    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    let err_count = results
        .iter()
        .filter(|r| matches!(r, Err(crate::error::FetchError::NotFoundObject { .. })))
        .count();

    assert_eq!(ok_count, 1);
    assert_eq!(err_count, 1);
}

#[tokio::test]
async fn s7_listed_but_fully_filtered_prefix_yields_zero_files_without_error() {
    let pages = vec![vec![entry("/bad", None), entry("also/bad/", None)]];
    let adapter = FakeAdapter::new("s3://bucket", pages);
    let run = spawn_prefix_run(adapter, String::new(), None, Bounds::default());
    let results = drain(run).await;

    assert!(results.is_empty());
}
