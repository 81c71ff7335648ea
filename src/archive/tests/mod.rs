use crate::archive::*;
use crate::error::{ArchiveError, Error};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a valid ZIP archive containing the given files (stored, uncompressed)
fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap();
}

/// Flip one byte of `needle` inside the archive so its CRC no longer matches
fn corrupt_content(archive_path: &Path, needle: &[u8]) {
    let mut bytes = std::fs::read(archive_path).unwrap();
    let pos = bytes
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("content present in stored archive");
    bytes[pos] ^= 0xFF;
    std::fs::write(archive_path, bytes).unwrap();
}

/// Handler that reports a fixed integrity result and counts extraction calls
struct FixedHandler {
    bad_entry: Option<String>,
    extract_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ArchiveHandler for FixedHandler {
    async fn test_integrity(&self, _archive: &Path) -> crate::Result<Option<String>> {
        Ok(self.bad_entry.clone())
    }

    async fn extract_all(
        &self,
        _archive: &Path,
        dest: &Path,
    ) -> crate::Result<Vec<std::path::PathBuf>> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![dest.join("marker")])
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

// ---------------------------------------------------------------------------
// ZipArchiveHandler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zip_integrity_passes_for_valid_archive() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = temp_dir.path().join("ok.zip");
    create_zip_archive(&archive, &[("x.txt", b"hello"), ("y/z.txt", b"nested")]);

    let result = ZipArchiveHandler.test_integrity(&archive).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn zip_integrity_names_first_bad_entry() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = temp_dir.path().join("bad.zip");
    create_zip_archive(
        &archive,
        &[
            ("good.txt", b"all fine here"),
            ("bad.txt", b"this content gets corrupted"),
        ],
    );
    corrupt_content(&archive, b"this content gets corrupted");

    let result = ZipArchiveHandler.test_integrity(&archive).await.unwrap();
    assert_eq!(result.as_deref(), Some("bad.txt"));
}

#[tokio::test]
async fn zip_integrity_on_non_zip_is_unreadable() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = temp_dir.path().join("not.zip");
    std::fs::write(&archive, b"definitely not a zip file").unwrap();

    let result = ZipArchiveHandler.test_integrity(&archive).await;
    assert!(matches!(
        result,
        Err(Error::Archive(ArchiveError::Unreadable { .. }))
    ));
}

#[tokio::test]
async fn zip_integrity_on_missing_file_is_io_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let result = ZipArchiveHandler
        .test_integrity(&temp_dir.path().join("missing.zip"))
        .await;
    assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn zip_extract_writes_nested_entries() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = temp_dir.path().join("ok.zip");
    let dest = temp_dir.path().join("out");
    create_zip_archive(&archive, &[("x.txt", b"hello"), ("y/z.txt", b"nested")]);

    let files = ZipArchiveHandler.extract_all(&archive, &dest).await.unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(std::fs::read(dest.join("x.txt")).unwrap(), b"hello");
    assert_eq!(std::fs::read(dest.join("y").join("z.txt")).unwrap(), b"nested");
}

#[tokio::test]
async fn zip_extract_overwrites_existing_files() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = temp_dir.path().join("ok.zip");
    let dest = temp_dir.path().join("out");
    create_zip_archive(&archive, &[("x.txt", b"new")]);
    std::fs::create_dir_all(&dest).unwrap();
    std::fs::write(dest.join("x.txt"), b"old contents").unwrap();
    std::fs::write(dest.join("keep.txt"), b"untouched").unwrap();

    ZipArchiveHandler.extract_all(&archive, &dest).await.unwrap();

    assert_eq!(std::fs::read(dest.join("x.txt")).unwrap(), b"new");
    assert_eq!(std::fs::read(dest.join("keep.txt")).unwrap(), b"untouched");
}

#[tokio::test]
async fn zip_extract_skips_unsafe_paths() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = temp_dir.path().join("evil.zip");
    let dest = temp_dir.path().join("out");
    create_zip_archive(&archive, &[("../escape.txt", b"nope"), ("ok.txt", b"fine")]);

    let files = ZipArchiveHandler.extract_all(&archive, &dest).await.unwrap();

    assert_eq!(files, vec![dest.join("ok.txt")]);
    assert!(!temp_dir.path().join("escape.txt").exists());
}

// ---------------------------------------------------------------------------
// verify_and_extract
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verify_and_extract_creates_destination_and_extracts() {
    let temp_dir = tempfile::tempdir().unwrap();
    let archive = temp_dir.path().join("ok.zip");
    let dest = temp_dir.path().join("deep").join("out");
    create_zip_archive(&archive, &[("x.txt", b"hello")]);

    let files = verify_and_extract(&ZipArchiveHandler, &archive, &dest)
        .await
        .unwrap();

    assert_eq!(files, vec![dest.join("x.txt")]);
}

#[tokio::test]
async fn verify_and_extract_stops_on_corruption() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dest = temp_dir.path().join("out");
    let handler = FixedHandler {
        bad_entry: Some("y/z.txt".to_string()),
        extract_calls: AtomicUsize::new(0),
    };

    let result = verify_and_extract(&handler, Path::new("a.zip"), &dest).await;

    match result {
        Err(Error::Archive(ArchiveError::Corrupt { archive, entry })) => {
            assert_eq!(archive, Path::new("a.zip"));
            assert_eq!(entry, "y/z.txt");
        }
        other => panic!("expected Corrupt, got {:?}", other),
    }
    assert_eq!(handler.extract_calls.load(Ordering::SeqCst), 0);
    assert!(dest.is_dir());
    assert_eq!(std::fs::read_dir(&dest).unwrap().count(), 0);
}

#[tokio::test]
async fn verify_and_extract_runs_extraction_after_clean_test() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dest = temp_dir.path().join("out");
    let handler = FixedHandler {
        bad_entry: None,
        extract_calls: AtomicUsize::new(0),
    };

    let files = verify_and_extract(&handler, Path::new("a.zip"), &dest)
        .await
        .unwrap();

    assert_eq!(files, vec![dest.join("marker")]);
    assert_eq!(handler.extract_calls.load(Ordering::SeqCst), 1);
}
