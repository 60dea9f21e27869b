use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::config::deserialize_option_from_str;
use crate::pipeline::{Digest, Publisher};
use crate::segmenter::{
    self, text_len, MessageSink, OversizePolicy, Segmenter, SegmenterConfig,
};

/// Longest text `sendMessage` accepts.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("Telegram bot token and chat id must both be configured")]
    MissingCredentials,
    #[error("Invalid Telegram base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Message is {length} characters, Telegram accepts at most {limit}")]
    MessageTooLong { length: usize, limit: usize },
    #[error("Telegram rejected the message (status {status}): {description}")]
    Rejected { status: u16, description: String },
    #[error("Telegram API error (status {status}): {body}")]
    ApiStatus { status: u16, body: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Plain,
    MarkdownV2,
    Html,
}

impl ParseMode {
    fn as_api_value(self) -> Option<&'static str> {
        match self {
            ParseMode::Plain => None,
            ParseMode::MarkdownV2 => Some("MarkdownV2"),
            ParseMode::Html => Some("HTML"),
        }
    }
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "plain" | "none" => Ok(ParseMode::Plain),
            "markdownv2" | "markdown" => Ok(ParseMode::MarkdownV2),
            "html" => Ok(ParseMode::Html),
            other => Err(format!(
                "unknown Telegram parse mode '{}': expected plain, markdownv2 or html",
                other
            )),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TelegramConfig {
    #[serde(
        rename = "telegram_enabled",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub enabled: Option<bool>,
    #[serde(rename = "telegram_bot_token")]
    pub bot_token: Option<String>,
    #[serde(rename = "telegram_chat_id")]
    pub chat_id: Option<String>,
    #[serde(
        rename = "telegram_thread_id",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub thread_id: Option<i64>,
    #[serde(
        rename = "telegram_parse_mode",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub parse_mode: Option<ParseMode>,
    #[serde(
        rename = "telegram_disable_preview",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub disable_preview: Option<bool>,
    #[serde(
        rename = "telegram_silent",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub silent: Option<bool>,
    #[serde(rename = "telegram_base_url")]
    pub base_url: Option<String>,
    #[serde(
        rename = "telegram_timeout_secs",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub timeout_secs: Option<u64>,
    #[serde(
        rename = "telegram_oversize",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub oversize: Option<OversizePolicy>,
    #[serde(
        rename = "telegram_pacing_secs",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub pacing_secs: Option<u64>,
}

impl TelegramConfig {
    /// Explicit flag wins; otherwise delivery is on as soon as any credential is set.
    pub fn is_enabled(&self) -> bool {
        self.enabled
            .unwrap_or(self.bot_token.is_some() || self.chat_id.is_some())
    }

    pub fn pacing(&self) -> Duration {
        self.pacing_secs
            .map(Duration::from_secs)
            .unwrap_or(segmenter::DEFAULT_PACING)
    }
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    endpoint: String,
    chat_id: String,
    thread_id: Option<i64>,
    parse_mode: ParseMode,
    disable_preview: bool,
    silent: bool,
    client: Client,
}

#[derive(Serialize, Debug)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_preview_options: Option<LinkPreviewOptions>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    disable_notification: bool,
}

#[derive(Serialize, Debug)]
struct LinkPreviewOptions {
    is_disabled: bool,
}

#[derive(Deserialize, Debug)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Result<Self, TelegramError> {
        let token = config
            .bot_token
            .filter(|v| !v.trim().is_empty())
            .ok_or(TelegramError::MissingCredentials)?;
        let chat_id = config
            .chat_id
            .filter(|v| !v.trim().is_empty())
            .ok_or(TelegramError::MissingCredentials)?;

        let base_url = config
            .base_url
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "https://api.telegram.org".to_string());
        Url::parse(&base_url).map_err(|_| TelegramError::InvalidBaseUrl(base_url.clone()))?;
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            base_url.trim_end_matches('/'),
            token.trim()
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.unwrap_or(15)))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            endpoint,
            chat_id: chat_id.trim().to_string(),
            thread_id: config.thread_id,
            parse_mode: config.parse_mode.unwrap_or_default(),
            disable_preview: config.disable_preview.unwrap_or(true),
            silent: config.silent.unwrap_or(false),
            client,
        })
    }

    /// Sends one message. Text above [`TELEGRAM_MESSAGE_LIMIT`] is refused
    /// without contacting Telegram.
    pub async fn send_message(&self, text: &str) -> Result<(), TelegramError> {
        let length = text_len(text);
        if length > TELEGRAM_MESSAGE_LIMIT {
            return Err(TelegramError::MessageTooLong {
                length,
                limit: TELEGRAM_MESSAGE_LIMIT,
            });
        }

        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            message_thread_id: self.thread_id,
            parse_mode: self.parse_mode.as_api_value(),
            link_preview_options: self
                .disable_preview
                .then_some(LinkPreviewOptions { is_disabled: true }),
            disable_notification: self.silent,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("Telegram sendMessage request failed")?;

        let status = response.status();
        let body = response.text().await.context("Telegram sendMessage body")?;
        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(api) if api.ok && status.is_success() => Ok(()),
            Ok(api) => Err(TelegramError::Rejected {
                status: status.as_u16(),
                description: api.description.unwrap_or_default(),
            }),
            Err(_) => Err(TelegramError::ApiStatus {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

#[async_trait]
impl MessageSink for TelegramClient {
    type Error = TelegramError;

    async fn send(&self, text: &str) -> Result<(), Self::Error> {
        self.send_message(text).await
    }
}

/// Posts a digest to Telegram, split into parts that fit one message each.
pub struct TelegramPublisher {
    client: TelegramClient,
    segmenter: Segmenter,
    pacing: Duration,
}

impl TelegramPublisher {
    pub fn new(client: TelegramClient, segmenter: Segmenter, pacing: Duration) -> Self {
        Self {
            client,
            segmenter,
            pacing,
        }
    }

    pub fn from_config(config: TelegramConfig) -> Result<Self, TelegramError> {
        let pacing = config.pacing();
        let segmenter = Segmenter::new(SegmenterConfig {
            hard_limit: TELEGRAM_MESSAGE_LIMIT,
            oversize: config.oversize.unwrap_or_default(),
            ..SegmenterConfig::default()
        });
        let client = TelegramClient::new(config)?;
        Ok(Self::new(client, segmenter, pacing))
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn publish(&self, digest: &Digest) -> anyhow::Result<()> {
        let segments = self.segmenter.split(&digest.text);
        log::info!("posting digest to Telegram in {} part(s)", segments.len());
        segmenter::deliver(&self.client, &segments, self.pacing).await?;
        Ok(())
    }
}
