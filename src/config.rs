use crate::agent::prompt::{deserialize_sources, Source};
use crate::tools::git::GitConfig;
use crate::tools::openai::OpenAiConfig;
use crate::tools::telegram::TelegramConfig;
use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

pub const ENV_PREFIX: &str = "MARKETDIGEST_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MARKETDIGEST_OPENAI_API_KEY must not be empty")]
    MissingOpenAiApiKey,
    #[error("MARKETDIGEST_TELEGRAM_{0} must be set when Telegram delivery is enabled")]
    MissingTelegramSetting(&'static str),
    #[error(transparent)]
    Env(#[from] envy::Error),
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default, deserialize_with = "deserialize_sources")]
    pub extra_sources: Vec<Source>,

    #[serde(flatten)]
    pub openai: OpenAiConfig,
    #[serde(flatten)]
    pub telegram: TelegramConfig,
    #[serde(flatten)]
    pub git: GitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = envy::prefixed(ENV_PREFIX)
            .from_env::<AppConfig>()
            .map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_blank(&self.openai.api_key) {
            return Err(ConfigError::MissingOpenAiApiKey);
        }
        if self.telegram.is_enabled() {
            if self.telegram.bot_token.as_deref().map_or(true, is_blank) {
                return Err(ConfigError::MissingTelegramSetting("BOT_TOKEN"));
            }
            if self.telegram.chat_id.as_deref().map_or(true, is_blank) {
                return Err(ConfigError::MissingTelegramSetting("CHAT_ID"));
            }
        }
        Ok(())
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn default_output_dir() -> String {
    "summaries".to_string()
}

/// Flattened config structs receive every value as a string, so typed optional
/// fields are parsed here instead of by envy.
pub fn deserialize_option_from_str<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.filter(|v| !v.trim().is_empty()) {
        Some(s) => s.trim().parse::<T>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
