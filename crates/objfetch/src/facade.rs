//! Dispatch facade: parses a URI, selects the adapter by scheme, constructs
//! it with forwarded configuration, and exposes the public consumer
//! surface.

use futures::Stream;

use crate::backends::{Adapter, AzureAdapter, AzureConfig, GcsAdapter, GcsConfig, S3Adapter, S3Config};
use crate::bridge::{drive_blocking, BlockingFileIter};
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::glob;
use crate::model::{File, FilePointer};
use crate::pipeline::{spawn_pointer_run, spawn_prefix_run};

/// Splits `<scheme>://<bucket-or-container>[/<prefix>]` into scheme, bucket,
/// and prefix. Strips a stray leading `/` that some URL parsers leave on the
/// bucket component on Windows.
fn parse_uri(uri: &str) -> Result<(String, String, String)> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| FetchError::UnsupportedScheme(uri.to_string()))?;
    let scheme = scheme.to_lowercase();

    if !matches!(scheme.as_str(), "s3" | "gs" | "az") {
        return Err(FetchError::UnsupportedScheme(scheme));
    }

    let rest = rest.trim_start_matches('/');
    let (bucket, prefix) = match rest.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix),
        None => (rest, ""),
    };

    Ok((scheme, bucket.to_string(), prefix.to_string()))
}

async fn open_adapter(scheme: &str, bucket: &str, config: &FetchConfig) -> Result<Adapter> {
    match scheme {
        "s3" => {
            let adapter = S3Adapter::open(S3Config::from_fetch_config(bucket, config)).await?;
            Ok(Adapter::S3(adapter))
        }
        "gs" => {
            let adapter = GcsAdapter::open(GcsConfig::from_fetch_config(bucket, config)).await?;
            Ok(Adapter::Gcs(adapter))
        }
        "az" => {
            let adapter = AzureAdapter::open(AzureConfig::from_fetch_config(bucket, config))?;
            Ok(Adapter::Azure(adapter))
        }
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

/// `iter_files(uri, glob?, config?) → blocking iterator of File`.
///
/// URI parsing, scheme validation, and glob compilation happen synchronously
/// before the bridge thread is spawned, so an `UnsupportedScheme` or bad
/// glob pattern is raised at the call site rather than on the first pull.
pub fn iter_files(
    uri: &str,
    glob_pattern: Option<&str>,
    config: FetchConfig,
) -> Result<BlockingFileIter> {
    let (scheme, bucket, prefix) = parse_uri(uri)?;
    let matcher = glob::compile(glob_pattern)?;

    Ok(drive_blocking(move || async move {
        let adapter = open_adapter(&scheme, &bucket, &config).await?;
        Ok(spawn_prefix_run(adapter, prefix, matcher, config.bounds))
    }))
}

/// `iter_files_async(uri, glob?, config?) → async iterator of File` (same
/// semantics, no sync bridge).
pub async fn iter_files_async(
    uri: &str,
    glob_pattern: Option<&str>,
    config: FetchConfig,
) -> Result<impl Stream<Item = Result<File>>> {
    let (scheme, bucket, prefix) = parse_uri(uri)?;
    let matcher = glob::compile(glob_pattern)?;
    let adapter = open_adapter(&scheme, &bucket, &config).await?;
    let run = spawn_prefix_run(adapter, prefix, matcher, config.bounds);
    Ok(run.results)
}

/// Pointer-list mode: blocking iterator. URI parsing and scheme validation
/// happen synchronously, as in `iter_files`.
pub fn iter_pointers(
    uri: &str,
    pointers: Vec<FilePointer>,
    config: FetchConfig,
) -> Result<BlockingFileIter> {
    let (scheme, bucket, _prefix) = parse_uri(uri)?;

    Ok(drive_blocking(move || async move {
        let adapter = open_adapter(&scheme, &bucket, &config).await?;
        Ok(spawn_pointer_run(adapter, pointers, config.bounds))
    }))
}

/// Pointer-list mode: async iterator.
pub async fn iter_pointers_async(
    uri: &str,
    pointers: Vec<FilePointer>,
    config: FetchConfig,
) -> Result<impl Stream<Item = Result<File>>> {
    let (scheme, bucket, _prefix) = parse_uri(uri)?;
    let adapter = open_adapter(&scheme, &bucket, &config).await?;
    let run = spawn_pointer_run(adapter, pointers, config.bounds);
    Ok(run.results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_bucket_and_prefix() {
        let (scheme, bucket, prefix) = parse_uri("s3://my-bucket/some/prefix").unwrap();
        assert_eq!(scheme, "s3");
        assert_eq!(bucket, "my-bucket");
        assert_eq!(prefix, "some/prefix");
    }

    #[test]
    fn empty_prefix_means_whole_bucket() {
        let (_, bucket, prefix) = parse_uri("gs://bucket").unwrap();
        assert_eq!(bucket, "bucket");
        assert_eq!(prefix, "");
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = parse_uri("ftp://host/path").unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(_)));
    }

    #[test]
    fn uri_without_scheme_separator_is_rejected() {
        assert!(parse_uri("not-a-uri").is_err());
    }
}
