use chrono::NaiveDate;
use marketdigest::tools::archive::{ArchiveError, MarkdownArchive};
use std::fs;
use tempfile::tempdir;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date")
}

#[tokio::test]
async fn writes_dated_file_with_trailing_newline() {
    let dir = tempdir().expect("Failed to create tempdir");
    let archive = MarkdownArchive::new(dir.path().join("summaries"));

    let path = archive
        .write(date(), "## Головні події\n- Ринок зріс")
        .await
        .expect("Failed to write digest");

    assert_eq!(path, dir.path().join("summaries").join("2025-03-07.md"));
    let content = fs::read_to_string(&path).expect("Failed to read digest");
    assert_eq!(content, "## Головні події\n- Ринок зріс\n");
}

#[tokio::test]
async fn overwrites_same_day_digest() {
    let dir = tempdir().expect("Failed to create tempdir");
    let archive = MarkdownArchive::new(dir.path());

    archive.write(date(), "first").await.expect("first write");
    let path = archive.write(date(), "second").await.expect("second write");

    assert_eq!(fs::read_to_string(path).expect("read"), "second\n");
}

#[tokio::test]
async fn rejects_output_path_that_is_a_file() {
    let dir = tempdir().expect("Failed to create tempdir");
    let file = dir.path().join("summaries");
    fs::write(&file, "not a directory").expect("Failed to write file");

    let err = MarkdownArchive::new(&file)
        .write(date(), "text")
        .await
        .expect_err("Expected error");

    assert!(matches!(err, ArchiveError::NotADirectory(_)));
}
