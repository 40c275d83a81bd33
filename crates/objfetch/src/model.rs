//! The FilePointer / File record model.

use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;

/// Immutable metadata for one remote object version.
///
/// `last_modified` substitutes `OffsetDateTime::UNIX_EPOCH` when the
/// underlying store omits the field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilePointer {
    pub source: String,
    pub path: String,
    pub size: u64,
    pub version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
}

impl FilePointer {
    pub fn new(
        source: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        version: impl Into<String>,
        last_modified: OffsetDateTime,
    ) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
            size,
            version: version.into(),
            last_modified,
        }
    }
}

/// A `FilePointer` plus its byte contents.
///
/// `contents.len() == size` unless the store lied; callers must not assume
/// equality.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub source: String,
    pub path: String,
    pub size: u64,
    pub version: String,
    pub last_modified: OffsetDateTime,
    pub contents: Bytes,
}

impl File {
    pub fn from_pointer(pointer: FilePointer, contents: Bytes) -> Self {
        Self {
            source: pointer.source,
            path: pointer.path,
            size: pointer.size,
            version: pointer.version,
            last_modified: pointer.last_modified,
            contents,
        }
    }

    pub fn pointer(&self) -> FilePointer {
        FilePointer::new(
            self.source.clone(),
            self.path.clone(),
            self.size,
            self.version.clone(),
            self.last_modified,
        )
    }
}

/// Normalizes a store-reported version string: an absent or literal `"null"`
/// value becomes the empty string, anything else passes through unchanged.
pub fn normalize_version(raw: Option<&str>) -> String {
    match raw {
        None => String::new(),
        Some("null") => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_null_and_absent_versions() {
        assert_eq!(normalize_version(None), "");
        assert_eq!(normalize_version(Some("null")), "");
        assert_eq!(normalize_version(Some("v1")), "v1");
        assert_eq!(normalize_version(Some("")), "");
    }

    #[test]
    fn file_round_trips_through_pointer() {
        let ptr = FilePointer::new("s3://b", "a.txt", 3, "v1", OffsetDateTime::UNIX_EPOCH);
        let file = File::from_pointer(ptr.clone(), Bytes::from_static(b"abc"));
        assert_eq!(file.pointer(), ptr);
        assert_eq!(file.contents.len() as u64, file.size);
    }
}
