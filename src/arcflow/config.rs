// SPDX-License-Identifier: MIT

//! Layered settings
//!
//! Defaults, then an optional YAML file, then environment variables. The API
//! key is only ever read from the environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::adk::error::{ArcflowError, ModelError};
use crate::adk::model::openai::{self, OpenAIModel};
use crate::adk::model::GenerationConfig;
use crate::arcflow::workflow::graph::EngineConfig;

/// File picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "arcflow.yaml";

/// All settings of a workflow run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    pub engine: EngineConfig,
    pub repair: RepairPolicy,
    pub service: ServiceSettings,
    pub context: ContextSettings,
}

/// Text-generation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub base_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: openai::DEFAULT_BASE_URL.to_string(),
            model_name: openai::DEFAULT_MODEL.to_string(),
            temperature: openai::DEFAULT_TEMPERATURE,
            max_output_tokens: openai::DEFAULT_MAX_TOKENS,
        }
    }
}

impl ModelSettings {
    /// Build the HTTP model client with the given API key
    pub fn build(&self, api_key: impl Into<String>) -> OpenAIModel {
        OpenAIModel::new(api_key, &self.model_name, &self.base_url).with_defaults(
            GenerationConfig {
                temperature: Some(self.temperature),
                max_output_tokens: Some(self.max_output_tokens),
                top_p: None,
            },
        )
    }
}

/// Bound on the console-error → repair cycle
///
/// Separate from the engine step budget: this limits how many times detected
/// errors send the workflow back into repair, the step budget limits
/// everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairPolicy {
    pub max_attempts: u32,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Service launch and console-error check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service output file, relative to the repository root
    pub log_file: String,
    /// Grace period before the console check reads the service output
    pub console_wait_ms: u64,
    /// Case-insensitive substrings marking an error line
    pub error_markers: Vec<String>,
    /// At most this many error lines are reported
    pub max_error_lines: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            log_file: "logs/service.log".to_string(),
            console_wait_ms: 2000,
            error_markers: ["error", "exception", "traceback", "panic"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_error_lines: 20,
        }
    }
}

/// What the code and log readers sample from the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub patterns: Vec<String>,
    pub max_files: usize,
    /// Characters read from the start of each file
    pub max_chars: usize,
    /// Log files tried in order; the service log is tried last
    pub log_candidates: Vec<String>,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            patterns: ["**/*.py", "**/*.js", "**/*.ts", "**/*.go", "**/*.java"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_files: 10,
            max_chars: 2000,
            log_candidates: ["logs/app.log", "app.log", "logs/error.log"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Settings {
    /// Parse settings from a YAML string; missing keys keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self, ArcflowError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load settings from `path`, or from `arcflow.yaml` if present, then
    /// apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ArcflowError> {
        let mut settings = match path {
            Some(path) => {
                log::info!("Loading settings from {}", path.display());
                Self::from_yaml(&fs::read_to_string(path)?)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                log::info!("Loading settings from {}", DEFAULT_CONFIG_FILE);
                Self::from_yaml(&fs::read_to_string(DEFAULT_CONFIG_FILE)?)?
            }
            None => Self::default(),
        };
        settings.apply_env_from(|key| env::var(key).ok())?;
        Ok(settings)
    }

    /// Override settings from environment-style lookups
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ArcflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(model) = non_empty("OPENROUTER_MODEL") {
            self.model.model_name = model;
        }
        if let Some(url) = non_empty("OPENROUTER_BASE_URL") {
            self.model.base_url = url;
        }
        if let Some(steps) = non_empty("ARCFLOW_MAX_STEPS") {
            self.engine.max_steps = steps.parse().map_err(|_| {
                ArcflowError::config(format!("ARCFLOW_MAX_STEPS must be a number, got '{}'", steps))
            })?;
        }
        if let Some(attempts) = non_empty("ARCFLOW_MAX_REPAIRS") {
            self.repair.max_attempts = attempts.parse().map_err(|_| {
                ArcflowError::config(format!(
                    "ARCFLOW_MAX_REPAIRS must be a number, got '{}'",
                    attempts
                ))
            })?;
        }
        Ok(())
    }

    /// Build the model client, reading `OPENROUTER_API_KEY`
    pub fn build_model(&self) -> Result<OpenAIModel, ArcflowError> {
        let api_key = env::var("OPENROUTER_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ModelError::ApiKeyMissing("openrouter".to_string()))?;
        Ok(self.model.build(api_key))
    }
}
