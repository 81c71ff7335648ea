use crate::error::{Error, PartError};
use crate::parts::*;
use std::path::{Path, PathBuf};

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// ---------------------------------------------------------------------------
// part_index
// ---------------------------------------------------------------------------

#[test]
fn part_index_reads_trailing_digits() {
    assert_eq!(part_index("a.zip.001").unwrap(), 1);
    assert_eq!(part_index("a.zip.42").unwrap(), 42);
    assert_eq!(part_index("a.zip.0").unwrap(), 0);
    assert_eq!(part_index("stanza_resources.zip.120").unwrap(), 120);
}

#[test]
fn part_index_uses_only_the_last_suffix() {
    assert_eq!(part_index("backup.2024.zip.003").unwrap(), 3);
    assert_eq!(part_index("a.1.2").unwrap(), 2);
}

#[test]
fn part_index_rejects_names_without_numeric_suffix() {
    for name in ["a.zip", "a.zip.part", "a.zip.001x", "a.zip.", "a.zip.-1", "a001", ""] {
        match part_index(name) {
            Err(PartError::Format { name: reported }) => assert_eq!(reported, name),
            other => panic!("expected format error for {:?}, got {:?}", name, other),
        }
    }
}

#[test]
fn part_index_rejects_overflowing_digits() {
    let name = format!("a.zip.{}", "9".repeat(30));
    assert!(matches!(part_index(&name), Err(PartError::Format { .. })));
}

// ---------------------------------------------------------------------------
// discover_parts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discover_returns_parts_sorted_by_index() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_file(temp_dir.path(), "a.zip.010", b"ten");
    write_file(temp_dir.path(), "a.zip.002", b"two!");
    write_file(temp_dir.path(), "a.zip.001", b"1");
    write_file(temp_dir.path(), "other.txt", b"ignored");

    let pattern = PartPattern::new("a.zip.*").unwrap();
    let parts = discover_parts(temp_dir.path(), &pattern, &[]).await.unwrap();

    let indices: Vec<u64> = parts.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![1, 2, 10]);
    assert_eq!(parts[0].name, "a.zip.001");
    assert_eq!(parts[1].size, 4);
    assert_eq!(parts[2].path, temp_dir.path().join("a.zip.010"));
}

#[tokio::test]
async fn discover_orders_numerically_not_lexically() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_file(temp_dir.path(), "a.zip.9", b"");
    write_file(temp_dir.path(), "a.zip.10", b"");
    write_file(temp_dir.path(), "a.zip.8", b"");

    let pattern = PartPattern::new("a.zip.*").unwrap();
    let parts = discover_parts(temp_dir.path(), &pattern, &[]).await.unwrap();

    let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["a.zip.8", "a.zip.9", "a.zip.10"]);
}

#[tokio::test]
async fn discover_with_no_matches_is_not_found() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_file(temp_dir.path(), "unrelated.bin", b"x");

    let pattern = PartPattern::new("a.zip.*").unwrap();
    let result = discover_parts(temp_dir.path(), &pattern, &[]).await;

    match result {
        Err(Error::Part(PartError::NotFound { pattern, dir })) => {
            assert_eq!(pattern, "a.zip.*");
            assert_eq!(dir, temp_dir.path());
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn discover_fails_on_matched_file_without_suffix() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_file(temp_dir.path(), "a.zip.001", b"x");
    write_file(temp_dir.path(), "a.zip.bak", b"x");

    let pattern = PartPattern::new("a.zip.*").unwrap();
    let result = discover_parts(temp_dir.path(), &pattern, &[]).await;

    match result {
        Err(Error::Part(PartError::Format { name })) => assert_eq!(name, "a.zip.bak"),
        other => panic!("expected Format error, got {:?}", other),
    }
}

#[tokio::test]
async fn discover_skips_directories() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_file(temp_dir.path(), "a.zip.001", b"x");
    std::fs::create_dir(temp_dir.path().join("a.zip.002")).unwrap();

    let pattern = PartPattern::new("a.zip.*").unwrap();
    let parts = discover_parts(temp_dir.path(), &pattern, &[]).await.unwrap();

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].index, 1);
}

#[tokio::test]
async fn discover_skips_excluded_paths() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_file(temp_dir.path(), "a.001", b"x");
    let output = write_file(temp_dir.path(), "a.002", b"joined output");

    let pattern = PartPattern::new("a.*").unwrap();
    let parts = discover_parts(temp_dir.path(), &pattern, &[output])
        .await
        .unwrap();

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].name, "a.001");
}

#[tokio::test]
async fn discover_skips_hidden_files_for_visible_patterns() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_file(temp_dir.path(), "a.zip.001", b"x");
    write_file(temp_dir.path(), ".a.zip.002", b"x");

    let pattern = PartPattern::new("*a.zip.*").unwrap();
    let parts = discover_parts(temp_dir.path(), &pattern, &[]).await.unwrap();
    assert_eq!(parts.len(), 1);

    let hidden = PartPattern::new(".a.zip.*").unwrap();
    let parts = discover_parts(temp_dir.path(), &hidden, &[]).await.unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].index, 2);
}

#[tokio::test]
async fn discover_in_missing_directory_is_io_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let pattern = PartPattern::new("a.zip.*").unwrap();
    let result = discover_parts(&temp_dir.path().join("nope"), &pattern, &[]).await;
    assert!(matches!(result, Err(Error::Io(_))));
}
