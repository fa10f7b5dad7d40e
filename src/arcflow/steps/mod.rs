// SPDX-License-Identifier: MIT

//! Developer-workflow steps
//!
//! Every step holds what it needs (a model handle, a settings section) and
//! answers with a `DevState` update carrying only the fields it produced.
//! - [classify] - route a request to dev, bugfix or Q&A
//! - [context] - sample source files and read logs
//! - [planning] - plans and designs from the model
//! - [codegen] - generated and repaired files
//! - [persist] - write files and snapshot them in git
//! - [service] - launch the service and scan its output
//! - [qna] - answer knowledge questions

pub mod classify;
pub mod codegen;
pub mod context;
pub mod persist;
pub mod planning;
pub mod qna;
pub mod service;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

use crate::adk::error::BoxError;

pub use classify::ClassifyStep;
pub use codegen::{FixCodeStep, GenerateCodeStep};
pub use context::{ReadCodeStep, ReadLogsStep};
pub use persist::{SaveFilesStep, VersionCommitStep};
pub use planning::{AnalyzeRequirementsStep, DesignSolutionStep, LocateIssueStep};
pub use qna::DailyQnaStep;
pub use service::{detect_service_commands, CheckConsoleErrorsStep, ServiceManageStep};

/// Failures raised inside step bodies
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Required state field '{0}' is missing")]
    MissingField(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model call failed: {0}")]
    Model(#[source] BoxError),
}

/// Resolve `path` against the repository root unless it is absolute
pub(crate) fn resolve_in(repo: &str, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(repo).join(path)
    }
}

/// A platform shell running `command` inside `cwd`
pub(crate) fn shell(command: &str, cwd: &Path) -> Command {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    };
    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    };
    cmd.current_dir(cwd);
    cmd
}

/// First `limit` characters of `text`, for log previews
pub(crate) fn preview(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model double shared by the step tests

    use crate::adk::error::BoxError;
    use crate::adk::model::{GenerationConfig, Model};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned replies in order and records every prompt
    pub struct MockModel {
        responses: Vec<String>,
        index: AtomicUsize,
        pub calls: Mutex<Vec<(String, String, Option<f32>)>>,
    }

    impl MockModel {
        pub fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: responses.into_iter().map(String::from).collect(),
                index: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn user_prompts(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, user, _)| user.clone())
                .collect()
        }

        pub fn temperatures(&self) -> Vec<Option<f32>> {
            self.calls.lock().unwrap().iter().map(|(_, _, t)| *t).collect()
        }
    }

    #[async_trait]
    impl Model for MockModel {
        async fn generate(
            &self,
            system: &str,
            user: &str,
            config: Option<&GenerationConfig>,
        ) -> Result<String, BoxError> {
            self.calls.lock().unwrap().push((
                system.to_string(),
                user.to_string(),
                config.and_then(|c| c.temperature),
            ));
            let i = self.index.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(i)
                .cloned()
                .ok_or_else(|| "MockModel ran out of responses".into())
        }
    }

    /// Model that always fails
    pub struct FailingModel;

    #[async_trait]
    impl Model for FailingModel {
        async fn generate(
            &self,
            _system: &str,
            _user: &str,
            _config: Option<&GenerationConfig>,
        ) -> Result<String, BoxError> {
            Err("upstream unavailable".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_in() {
        assert_eq!(resolve_in("/repo", "src/a.py"), PathBuf::from("/repo/src/a.py"));
        assert_eq!(resolve_in("/repo", "/tmp/b.py"), PathBuf::from("/tmp/b.py"));
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "hé");
        assert_eq!(preview("ab", 10), "ab");
    }

    #[test]
    fn test_missing_field_message() {
        assert_eq!(
            StepError::MissingField("plan").to_string(),
            "Required state field 'plan' is missing"
        );
    }

    #[tokio::test]
    async fn test_shell_runs_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let status = shell("echo hi > marker.txt", dir.path()).status().await.unwrap();
        assert!(status.success());
        assert!(dir.path().join("marker.txt").exists());
    }
}
