use chrono::NaiveDate;
use marketdigest::pipeline::{Digest, Publisher};
use marketdigest::tools::git::{commit_message, GitCommitter, GitConfig, GitError};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "--quiet"]);
    git(dir, &["config", "user.name", "Digest Bot"]);
    git(dir, &["config", "user.email", "digest@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

fn committer(dir: &Path) -> GitCommitter {
    GitCommitter::new(GitConfig {
        commit: Some(true),
        repo_dir: Some(dir.to_string_lossy().to_string()),
    })
}

#[test]
fn commit_message_embeds_run_date() {
    let digest = Digest {
        date: NaiveDate::from_ymd_opt(2025, 10, 20).expect("valid date"),
        text: String::new(),
        path: "summaries/2025-10-20.md".into(),
    };

    assert_eq!(commit_message(&digest), "Add weekly summary for 2025-10-20");
}

#[tokio::test]
async fn publisher_commits_only_the_digest_file() {
    if !git_available() {
        return;
    }
    let dir = tempdir().expect("Failed to create tempdir");
    init_repo(dir.path());

    let summaries = dir.path().join("summaries");
    fs::create_dir_all(&summaries).expect("Failed to create summaries dir");
    let digest_path = summaries.join("2025-10-20.md");
    fs::write(&digest_path, "digest\n").expect("Failed to write digest");
    fs::write(dir.path().join("unrelated.txt"), "leave me").expect("Failed to write file");

    let digest = Digest {
        date: NaiveDate::from_ymd_opt(2025, 10, 20).expect("valid date"),
        text: "digest".to_string(),
        path: digest_path,
    };
    committer(dir.path())
        .publish(&digest)
        .await
        .expect("Failed to commit digest");

    assert_eq!(
        git(dir.path(), &["log", "-1", "--format=%s"]),
        "Add weekly summary for 2025-10-20"
    );
    assert_eq!(
        git(dir.path(), &["show", "--name-only", "--format=", "HEAD"]),
        "summaries/2025-10-20.md"
    );
    assert_eq!(
        git(dir.path(), &["status", "--porcelain"]),
        "?? unrelated.txt"
    );
}

#[tokio::test]
async fn reports_failed_git_commands() {
    if !git_available() {
        return;
    }
    let dir = tempdir().expect("Failed to create tempdir");
    init_repo(dir.path());
    let file = dir.path().join("digest.md");
    fs::write(&file, "digest\n").expect("Failed to write digest");

    let committer = committer(dir.path());
    committer
        .commit_file(&file, "first")
        .await
        .expect("First commit failed");

    // Nothing changed, so the second commit has nothing to record.
    let err = committer
        .commit_file(&file, "second")
        .await
        .expect_err("Expected empty commit to fail");

    match err {
        GitError::CommandFailed { command, .. } => assert!(command.starts_with("commit")),
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let dir = tempdir().expect("Failed to create tempdir");

    let err = committer(dir.path())
        .commit_file(&dir.path().join("missing.md"), "msg")
        .await
        .expect_err("Expected error");

    assert!(matches!(err, GitError::Other(_)));
}
