use anyhow::Context;
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Output path exists and is not a directory: {0}")]
    NotADirectory(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Writes one markdown file per run date into a directory.
#[derive(Debug, Clone)]
pub struct MarkdownArchive {
    root: PathBuf,
}

impl MarkdownArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.root.join(format!("{}.md", date.format("%Y-%m-%d")))
    }

    /// Writes `content` plus a trailing newline, replacing any digest already
    /// written for the same date.
    pub async fn write(&self, date: NaiveDate, content: &str) -> Result<PathBuf, ArchiveError> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(ArchiveError::NotADirectory(
                self.root.display().to_string(),
            ));
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Creating {}", self.root.display()))?;

        let path = self.path_for(date);
        tokio::fs::write(&path, format!("{}\n", content))
            .await
            .with_context(|| format!("Writing {}", path.display()))?;
        log::info!("wrote digest to {}", path.display());
        Ok(path)
    }
}
