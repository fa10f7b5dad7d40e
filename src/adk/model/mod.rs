// SPDX-License-Identifier: MIT

//! Model module - the text-generation capability steps depend on
//!
//! Steps never talk to a provider directly; they hold an `Arc<dyn Model>`
//! handed to them when the workflow is assembled, so tests can swap in a
//! scripted double.
//! - [openai] - OpenAI-compatible chat completions (OpenRouter by default)

pub mod openai;

use crate::adk::error::BoxError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

impl GenerationConfig {
    /// Config pinned to a fixed temperature
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Default::default()
        }
    }
}

/// Core trait for text-generation backends
#[async_trait]
pub trait Model: Send + Sync {
    /// Generate a completion for a system prompt and a user prompt
    async fn generate(
        &self,
        system: &str,
        user: &str,
        config: Option<&GenerationConfig>,
    ) -> Result<String, BoxError>;
}
