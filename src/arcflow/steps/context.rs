// SPDX-License-Identifier: MIT

//! Repository readers: source samples and log files

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;

use super::{resolve_in, StepError};
use crate::adk::error::BoxError;
use crate::adk::step::Step;
use crate::arcflow::config::ContextSettings;
use crate::arcflow::workflow::state::DevState;

#[derive(Debug, Serialize)]
struct Snippet {
    path: String,
    content: String,
}

/// Samples the head of up to `max_files` source files into `code_context`
pub struct ReadCodeStep {
    settings: ContextSettings,
}

impl ReadCodeStep {
    pub fn new(settings: ContextSettings) -> Self {
        Self { settings }
    }

    fn matching_files(&self, repo: &str) -> Result<Vec<PathBuf>, StepError> {
        let mut files = Vec::new();
        for pattern in &self.settings.patterns {
            let full = resolve_in(repo, pattern);
            for entry in glob::glob(&full.to_string_lossy())? {
                match entry {
                    Ok(path) if path.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(e) => log::debug!("Skipping unreadable path: {}", e),
                }
            }
        }
        files.truncate(self.settings.max_files);
        Ok(files)
    }
}

#[async_trait]
impl Step<DevState> for ReadCodeStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let files = self.matching_files(state.repo_path())?;

        let mut snippets = Vec::with_capacity(files.len());
        for path in &files {
            match fs::read(path).await {
                Ok(bytes) => snippets.push(Snippet {
                    path: path.to_string_lossy().into_owned(),
                    content: String::from_utf8_lossy(&bytes)
                        .chars()
                        .take(self.settings.max_chars)
                        .collect(),
                }),
                Err(e) => log::warn!("Could not read {}: {}", path.display(), e),
            }
        }
        log::info!("read_code: {} files", files.len());

        Ok(DevState {
            code_context: Some(serde_json::to_string(&snippets).map_err(StepError::from)?),
            ..Default::default()
        })
    }
}

/// Reads the first existing log file into `logs`
pub struct ReadLogsStep {
    candidates: Vec<String>,
}

impl ReadLogsStep {
    /// `candidates` are tried in order, relative to the repository root
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl Step<DevState> for ReadLogsStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let mut content = String::new();
        for candidate in &self.candidates {
            let path = resolve_in(state.repo_path(), candidate);
            if !path.is_file() {
                continue;
            }
            match fs::read(&path).await {
                Ok(bytes) => {
                    content = String::from_utf8_lossy(&bytes).into_owned();
                    log::debug!("Reading logs from {}", path.display());
                    break;
                }
                Err(e) => log::warn!("Could not read {}: {}", path.display(), e),
            }
        }
        log::info!("read_logs: {} chars", content.chars().count());

        Ok(DevState {
            logs: Some(content),
            ..Default::default()
        })
    }
}
