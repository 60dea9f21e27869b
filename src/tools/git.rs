use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::config::deserialize_option_from_str;
use crate::pipeline::{Digest, Publisher};

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("`git {command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GitConfig {
    #[serde(
        rename = "git_commit",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub commit: Option<bool>,
    #[serde(rename = "git_repo_dir")]
    pub repo_dir: Option<String>,
}

impl GitConfig {
    pub fn is_enabled(&self) -> bool {
        self.commit.unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct GitCommitter {
    repo_dir: PathBuf,
}

impl GitCommitter {
    pub fn new(config: GitConfig) -> Self {
        let repo_dir = config
            .repo_dir
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| ".".to_string());
        Self {
            repo_dir: PathBuf::from(repo_dir),
        }
    }

    /// Stages and commits exactly `path`, leaving anything else in the index alone.
    pub async fn commit_file(&self, path: &Path, message: &str) -> Result<(), GitError> {
        let pathspec = self.pathspec(path)?;
        log::info!("committing {}", pathspec.display());
        let file = pathspec.as_os_str();
        self.git(&[OsStr::new("add"), OsStr::new("--"), file])
            .await?;
        self.git(&[
            OsStr::new("commit"),
            OsStr::new("-m"),
            OsStr::new(message),
            OsStr::new("--"),
            file,
        ])
        .await?;
        Ok(())
    }

    /// `path` relative to the repository, so git resolves it the same way
    /// regardless of the process working directory.
    fn pathspec(&self, path: &Path) -> Result<PathBuf, GitError> {
        let repo = std::fs::canonicalize(&self.repo_dir)
            .with_context(|| format!("Resolving {}", self.repo_dir.display()))?;
        let file = std::fs::canonicalize(path)
            .with_context(|| format!("Resolving {}", path.display()))?;
        Ok(file
            .strip_prefix(&repo)
            .map(Path::to_path_buf)
            .unwrap_or(file))
    }

    async fn git(&self, args: &[&OsStr]) -> Result<(), GitError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .output()
            .await
            .context("Running git")?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: args
                    .iter()
                    .map(|a| a.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" "),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

pub fn commit_message(digest: &Digest) -> String {
    format!("Add weekly summary for {}", digest.date.format("%Y-%m-%d"))
}

#[async_trait]
impl Publisher for GitCommitter {
    fn name(&self) -> &'static str {
        "git"
    }

    async fn publish(&self, digest: &Digest) -> anyhow::Result<()> {
        self.commit_file(&digest.path, &commit_message(digest))
            .await?;
        Ok(())
    }
}
