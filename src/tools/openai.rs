use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::agent::{CompletionProvider, CompletionRequest};
use crate::config::deserialize_option_from_str;

#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("OpenAI API error (status {status}): {body}")]
    ApiStatus { status: u16, body: String },
    #[error("Invalid OpenAI base URL: {0}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiConfig {
    #[serde(rename = "openai_api_key")]
    pub api_key: String,
    #[serde(rename = "openai_model", default = "default_openai_model")]
    pub model: String,
    #[serde(rename = "openai_base_url")]
    pub base_url: Option<String>,
    #[serde(rename = "openai_reasoning_effort")]
    pub reasoning_effort: Option<String>,
    #[serde(
        rename = "openai_web_search",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub web_search: Option<bool>,
    #[serde(
        rename = "openai_timeout_secs",
        default,
        deserialize_with = "deserialize_option_from_str"
    )]
    pub timeout_secs: Option<u64>,
}

impl OpenAiConfig {
    pub fn web_search_enabled(&self) -> bool {
        self.web_search.unwrap_or(true)
    }
}

fn default_openai_model() -> String {
    "gpt-5.1".to_string()
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    model: String,
    reasoning_effort: Option<String>,
    endpoint: String,
    client: Client,
}

#[derive(Serialize, Debug)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<Reasoning<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Serialize, Debug)]
struct InputMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct Reasoning<'a> {
    effort: &'a str,
}

#[derive(Serialize, Debug)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize, Debug)]
struct ResponsesBody {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize, Debug)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize, Debug)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesBody {
    /// All `output_text` parts of all message items, in order.
    fn output_text(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        let base_url = config
            .base_url
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Url::parse(&base_url).map_err(|_| OpenAiError::InvalidBaseUrl(base_url.clone()))?;
        let endpoint = format!("{}/responses", base_url.trim_end_matches('/'));

        let reasoning_effort = match config.reasoning_effort {
            Some(effort) => Some(effort.trim().to_string()).filter(|e| !e.is_empty()),
            None => Some("high".to_string()),
        };

        let mut headers = HeaderMap::new();
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .context("Invalid OPENAI_API_KEY for Authorization header")?;
        headers.insert(AUTHORIZATION, auth_value);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs.unwrap_or(600)))
            .build()
            .context("Failed to build OpenAI HTTP client")?;

        Ok(Self {
            model: config.model,
            reasoning_effort,
            endpoint,
            client,
        })
    }

    pub async fn create_response(&self, request: &CompletionRequest) -> Result<String, OpenAiError> {
        let tools = if request.web_search {
            vec![ToolSpec { kind: "web_search" }]
        } else {
            Vec::new()
        };
        let payload = ResponsesRequest {
            model: &self.model,
            input: vec![
                InputMessage {
                    role: "system",
                    content: &request.system,
                },
                InputMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            reasoning: self
                .reasoning_effort
                .as_deref()
                .map(|effort| Reasoning { effort }),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
        };

        log::info!("requesting response from {}...", self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("OpenAI responses request failed")?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::ApiStatus { status, body });
        }

        let body = response.text().await.context("OpenAI responses body")?;
        let parsed: ResponsesBody =
            serde_json::from_str(&body).context("OpenAI responses JSON")?;
        let text = parsed.output_text();
        log::info!("received {} characters", text.chars().count());
        Ok(text)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, anyhow::Error> {
        Ok(self.create_response(request).await?)
    }
}
