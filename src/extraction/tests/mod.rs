use crate::error::{Error, ExtractError};
use crate::extraction::*;
use crate::progress::ExtractionProgress;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Signature detection
// ---------------------------------------------------------------------------

#[test]
fn test_rar4_signature_detected() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "movie.rar", b"Rar!\x1a\x07\x00rest-of-header");
    assert!(has_rar_signature(&path).unwrap());
}

#[test]
fn test_rar5_signature_detected() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "movie.part1.rar", b"Rar!\x1a\x07\x01\x00rest");
    assert!(has_rar_signature(&path).unwrap());
}

#[test]
fn test_continuation_volume_signature_detected() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "movie.r00", b"Rar!\x1a\x07\x00");
    assert!(has_rar_signature(&path).unwrap());
}

#[test]
fn test_non_rar_content_rejected() {
    let dir = TempDir::new().unwrap();
    let zip = write_file(dir.path(), "fake.rar", b"PK\x03\x04 not a rar");
    let empty = write_file(dir.path(), "empty.rar", b"");
    let short = write_file(dir.path(), "short.rar", b"Rar!");
    assert!(!has_rar_signature(&zip).unwrap());
    assert!(!has_rar_signature(&empty).unwrap());
    assert!(!has_rar_signature(&short).unwrap());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    assert!(has_rar_signature(&dir.path().join("missing.rar")).is_err());
}

// ---------------------------------------------------------------------------
// RarReader
// ---------------------------------------------------------------------------

#[test]
fn test_rar_reader_validity_follows_signature() {
    let dir = TempDir::new().unwrap();
    let good = write_file(dir.path(), "a.rar", b"Rar!\x1a\x07\x00");
    let bad = write_file(dir.path(), "b.rar", b"plain text");
    let reader = RarReader::new();

    assert!(reader.is_valid_container(&good));
    assert!(!reader.is_valid_container(&bad));
    assert!(!reader.is_valid_container(&dir.path().join("missing.rar")));
    assert!(!reader.is_valid_container(dir.path()));
}

#[test]
fn test_rar_reader_lists_garbage_as_bad_container() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "broken.rar", b"this is not an archive at all");

    let err = RarReader::new().list_entries(&path).unwrap_err();
    match err {
        Error::Extract(ExtractError::BadContainer { archive, .. }) => assert_eq!(archive, path),
        other => panic!("expected BadContainer, got {other:?}"),
    }
}

#[test]
fn test_rar_reader_extract_garbage_fails_without_progress() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "broken.rar", b"this is not an archive at all");
    let dest = dir.path().join("out");

    let mut notified = false;
    let mut progress = ExtractionProgress::new(100, |_, _| notified = true);
    let result = RarReader::new().extract_all(&path, &dest, &mut progress);
    drop(progress);

    assert!(matches!(
        result,
        Err(Error::Extract(ExtractError::BadContainer { .. }))
    ));
    assert!(!notified);
}

#[test]
fn test_sanitize_entry_path_strips_traversal() {
    assert_eq!(
        RarReader::sanitize_entry_path(Path::new("../../etc/passwd")),
        Path::new("etc/passwd")
    );
    assert_eq!(
        RarReader::sanitize_entry_path(Path::new("/abs/file.mkv")),
        Path::new("abs/file.mkv")
    );
    assert_eq!(
        RarReader::sanitize_entry_path(Path::new("Movie/./Sub/movie.srt")),
        Path::new("Movie/Sub/movie.srt")
    );
    assert!(
        RarReader::sanitize_entry_path(Path::new(".."))
            .as_os_str()
            .is_empty()
    );
}

#[test]
fn test_archive_entry_serializes() {
    let entry = ArchiveEntry::new("movie.mkv", 500);
    let json = serde_json::to_string(&entry).unwrap();
    assert_eq!(json, r#"{"name":"movie.mkv","size":500}"#);
}
