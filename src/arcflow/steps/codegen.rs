// SPDX-License-Identifier: MIT

//! File generation and repair through arc-file segments

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::service::detect_service_commands;
use super::{preview, StepError};
use crate::adk::error::BoxError;
use crate::adk::model::{GenerationConfig, Model};
use crate::adk::step::Step;
use crate::arcflow::workflow::artifact::{self, Artifacts};
use crate::arcflow::workflow::state::DevState;

const GENERATE_PROMPT: &str = "\
No explanations, no Markdown, no code fences. Answer only in this format:
<arc-file type=\"file\" path=\"dir/file.ext\">file content</arc-file>
<arc-file type=\"shell\">commands</arc-file>
Rules:
- file: writes a new file or replaces an existing one.
- shell: commands that install dependencies and start the project, one per line; the last line starts the service.";

const FIX_PROMPT: &str = "\
Output arc-file tags only: no explanations, no Markdown, no extra text.
<arc-file type=\"file\" path=\"dir/file.ext\">complete source</arc-file>
Rules:
- One tag per file, any number of tags; paths are relative to the repository root.
- Content must be complete, runnable source with no ellipses or placeholders.
- When changing an existing file, output the whole file.
- Imports and dependencies must be correct and the syntax valid; no binary or oversized files.
- Output nothing outside arc-file tags.";

const RAW_PREVIEW: usize = 400;

fn warn_if_empty(step: &str, artifacts: &Artifacts, raw: &str) {
    if artifacts.files.is_empty() {
        log::warn!("{} parse_error: no arc-file segments", step);
        log::warn!("{} raw: {}", step, preview(raw, RAW_PREVIEW));
    }
    log::info!("{}: {} files", step, artifacts.files.len());
}

/// Generates project files and the commands to install and start them
///
/// The last shell line is the start command, earlier lines install. Either
/// half that the model leaves out is filled from repository detection.
pub struct GenerateCodeStep {
    model: Arc<dyn Model>,
}

impl GenerateCodeStep {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Step<DevState> for GenerateCodeStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let design = state
            .design
            .as_deref()
            .ok_or(StepError::MissingField("design"))?;
        let user = format!("Request: {}\nDesign: {}", state.request(), design);
        let raw = self
            .model
            .generate(GENERATE_PROMPT, &user, None)
            .await
            .map_err(StepError::Model)?;

        let artifacts = artifact::parse(&raw);
        warn_if_empty("generate_code", &artifacts, &raw);

        let (mut install, mut start) = artifacts.split_commands();
        if install.is_empty() || start.is_none() {
            let (detected_install, detected_start) =
                detect_service_commands(Path::new(state.repo_path()));
            if install.is_empty() {
                install = detected_install;
            }
            if start.is_none() {
                start = detected_start;
            }
        }

        Ok(DevState {
            files_to_save: Some(artifacts.files),
            commit_message: Some(format!("feat: {}", state.request())),
            install_commands: Some(install),
            start_command: start,
            ..Default::default()
        })
    }
}

/// Regenerates the files named by the repair plan
pub struct FixCodeStep {
    model: Arc<dyn Model>,
}

impl FixCodeStep {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Step<DevState> for FixCodeStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let plan = state.plan.as_deref().ok_or(StepError::MissingField("plan"))?;
        let raw = self
            .model
            .generate(FIX_PROMPT, plan, Some(&GenerationConfig::with_temperature(0.0)))
            .await
            .map_err(StepError::Model)?;

        let artifacts = artifact::parse(&raw);
        warn_if_empty("fix_code", &artifacts, &raw);

        Ok(DevState {
            files_to_save: Some(artifacts.files),
            commit_message: Some("fix: bug fix".to_string()),
            ..Default::default()
        })
    }
}
