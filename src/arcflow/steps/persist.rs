// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tokio::process::Command;

use super::{resolve_in, StepError};
use crate::adk::error::BoxError;
use crate::adk::step::Step;
use crate::arcflow::workflow::state::DevState;

/// Writes `files_to_save` under the repository root
///
/// Relative paths resolve against the repo, parent directories are created
/// and existing files are replaced. The written paths go to `saved_files`.
pub struct SaveFilesStep;

#[async_trait]
impl Step<DevState> for SaveFilesStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let files = state.files_to_save.as_deref().unwrap_or_default();
        let mut saved = Vec::with_capacity(files.len());

        for file in files.iter().filter(|f| !f.file_path.trim().is_empty()) {
            let path = resolve_in(state.repo_path(), file.file_path.trim());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.map_err(StepError::from)?;
            }
            fs::write(&path, &file.content)
                .await
                .map_err(StepError::from)?;
            saved.push(path.to_string_lossy().into_owned());
        }
        log::info!("save_files: {}", saved.len());

        Ok(DevState {
            saved_files: Some(saved),
            ..Default::default()
        })
    }
}

/// Snapshots the repository in git
///
/// Initializes a repository when none exists. Failing git commands are
/// logged and never fail the workflow.
pub struct VersionCommitStep;

impl VersionCommitStep {
    async fn git(repo: &Path, args: &[&str]) {
        match Command::new("git").args(args).current_dir(repo).output().await {
            Ok(output) if output.status.success() => {
                log::debug!("git {} succeeded", args.join(" "));
            }
            Ok(output) => log::warn!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => log::warn!("git {} could not run: {}", args.join(" "), e),
        }
    }
}

#[async_trait]
impl Step<DevState> for VersionCommitStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let repo = Path::new(state.repo_path());
        let message = state.commit_message.as_deref().unwrap_or("update");

        if !repo.join(".git").exists() {
            Self::git(repo, &["init"]).await;
        }
        Self::git(repo, &["add", "-A"]).await;
        Self::git(repo, &["commit", "-m", message]).await;
        log::info!("commit: {}", message);

        Ok(DevState::default())
    }
}
