// SPDX-License-Identifier: MIT

//! OpenAI-compatible Model - chat completions over HTTP
//!
//! Defaults to the OpenRouter endpoint; any server speaking the
//! `/chat/completions` dialect works by overriding the base URL.

use super::{GenerationConfig, Model};
use crate::adk::error::{ArcflowError, BoxError, ModelError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 64000;

/// OpenAI-compatible chat model
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
    defaults: GenerationConfig,
}

impl OpenAIModel {
    /// Create a new model client with an explicit key and endpoint
    pub fn new(
        api_key: impl Into<String>,
        model_name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            defaults: GenerationConfig {
                temperature: Some(DEFAULT_TEMPERATURE),
                max_output_tokens: Some(DEFAULT_MAX_TOKENS),
                top_p: None,
            },
        }
    }

    /// Replace the generation defaults applied when a call passes no config
    pub fn with_defaults(mut self, defaults: GenerationConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Build the request body; per-call config wins over defaults field by field
    fn request_body(
        &self,
        system: &str,
        user: &str,
        config: Option<&GenerationConfig>,
    ) -> serde_json::Value {
        let mut body = json!({
            "model": self.model_name,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ]
        });

        let pick = |f: fn(&GenerationConfig) -> Option<f32>| {
            config.and_then(f).or_else(|| f(&self.defaults))
        };
        if let Some(temp) = pick(|c| c.temperature) {
            body["temperature"] = json!(temp);
        }
        if let Some(top_p) = pick(|c| c.top_p) {
            body["top_p"] = json!(top_p);
        }
        if let Some(max_tokens) = config
            .and_then(|c| c.max_output_tokens)
            .or(self.defaults.max_output_tokens)
        {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    /// Pull the first choice's text out of a chat completions response
    fn parse_response(response: &serde_json::Value) -> Result<String, ModelError> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".to_string()))?;

        // A null content is a legitimate empty answer
        Ok(choice["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl Model for OpenAIModel {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        config: Option<&GenerationConfig>,
    ) -> Result<String, BoxError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(system, user, config);

        log::debug!(
            "Chat request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ModelError::RateLimited { retry_after_secs }.into());
        }

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(ArcflowError::api("openrouter", format!("{}: {}", status, text)).into());
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("Chat response: {}", resp_json);

        Ok(Self::parse_response(&resp_json)?)
    }
}
