pub mod prompt;

use anyhow::Error;
use async_trait::async_trait;
use chrono::NaiveDate;

use prompt::{build_sources, build_system_prompt, build_user_prompt, Source};

/// A role-tagged prompt for one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    /// Let the provider browse the web while answering.
    pub web_search: bool,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the generated text, or an empty string if the model produced none.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, Error>;
}

pub struct DigestAgent<P> {
    provider: P,
    extra_sources: Vec<Source>,
    web_search: bool,
}

impl<P: CompletionProvider> DigestAgent<P> {
    pub fn new(provider: P, extra_sources: Vec<Source>, web_search: bool) -> Self {
        Self {
            provider,
            extra_sources,
            web_search,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn request_for(&self, date: NaiveDate) -> CompletionRequest {
        let sources = build_sources(date, &self.extra_sources);
        CompletionRequest {
            system: build_system_prompt(),
            user: build_user_prompt(&sources),
            web_search: self.web_search,
        }
    }

    pub async fn generate(&self, date: NaiveDate) -> Result<String, Error> {
        let request = self.request_for(date);
        log::info!("sending prompt to model");
        log::debug!(
            "system prompt {} chars, user prompt {} chars, web search {}",
            request.system.chars().count(),
            request.user.chars().count(),
            request.web_search
        );
        let text = self.provider.complete(&request).await?;
        if text.trim().is_empty() {
            log::warn!("model returned no text");
        }
        Ok(text.trim_end().to_string())
    }
}
