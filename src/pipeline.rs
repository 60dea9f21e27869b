use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;

use crate::agent::{CompletionProvider, DigestAgent};
use crate::config::AppConfig;
use crate::tools::archive::MarkdownArchive;
use crate::tools::git::GitCommitter;
use crate::tools::openai::OpenAiClient;
use crate::tools::telegram::TelegramPublisher;

/// One generated digest, after it has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub date: NaiveDate,
    pub text: String,
    pub path: PathBuf,
}

/// A side effect run once the digest is archived.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn publish(&self, digest: &Digest) -> anyhow::Result<()>;
}

pub struct Pipeline<P> {
    agent: DigestAgent<P>,
    archive: MarkdownArchive,
    publishers: Vec<Box<dyn Publisher>>,
}

impl<P: CompletionProvider> Pipeline<P> {
    pub fn new(agent: DigestAgent<P>, archive: MarkdownArchive) -> Self {
        Self {
            agent,
            archive,
            publishers: Vec::new(),
        }
    }

    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub fn publisher_names(&self) -> Vec<&'static str> {
        self.publishers.iter().map(|p| p.name()).collect()
    }

    /// Generates, archives, then publishes in registration order. The first
    /// failing step ends the run.
    pub async fn run(&self, date: NaiveDate) -> anyhow::Result<Digest> {
        let text = self
            .agent
            .generate(date)
            .await
            .context("Generating digest")?;
        let path = self
            .archive
            .write(date, &text)
            .await
            .context("Writing digest")?;

        let digest = Digest { date, text, path };
        for publisher in &self.publishers {
            log::info!("publishing via {}", publisher.name());
            publisher
                .publish(&digest)
                .await
                .with_context(|| format!("Publishing digest via {}", publisher.name()))?;
        }
        Ok(digest)
    }
}

/// Builds the production pipeline described by `config`.
pub fn build(config: &AppConfig) -> anyhow::Result<Pipeline<OpenAiClient>> {
    let provider =
        OpenAiClient::new(config.openai.clone()).context("Building OpenAI client")?;
    let agent = DigestAgent::new(
        provider,
        config.extra_sources.clone(),
        config.openai.web_search_enabled(),
    );
    let mut pipeline = Pipeline::new(agent, MarkdownArchive::new(&config.output_dir));

    if config.git.is_enabled() {
        pipeline = pipeline.with_publisher(Box::new(GitCommitter::new(config.git.clone())));
    }
    if config.telegram.is_enabled() {
        let publisher = TelegramPublisher::from_config(config.telegram.clone())
            .context("Building Telegram publisher")?;
        pipeline = pipeline.with_publisher(Box::new(publisher));
    }
    Ok(pipeline)
}

pub async fn run(config: &AppConfig, date: NaiveDate) -> anyhow::Result<Digest> {
    build(config)?.run(date).await
}
