// SPDX-License-Identifier: MIT

//! Typed state record for the developer workflow
//!
//! Every field any step reads or writes is listed here, each optional. A step
//! returns a `DevState` holding only the fields it produced.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::State;

/// Request classification produced by the `classify` step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Build something new
    Dev,
    /// Diagnose and repair a failure
    Bugfix,
    /// Answer a question, no changes to the repository
    Qna,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Dev => "dev",
            TaskType::Bugfix => "bugfix",
            TaskType::Qna => "qna",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(TaskType::Dev),
            "bugfix" => Ok(TaskType::Bugfix),
            "qna" => Ok(TaskType::Qna),
            other => Err(format!("Unknown task type: {}", other)),
        }
    }
}

/// A file the workflow intends to write into the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileArtifact {
    /// Absolute, or relative to the repository root
    pub file_path: String,
    pub content: String,
}

/// Accumulated state of one developer-workflow invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevState {
    /// User request, free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    /// Repository root the workflow operates on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_path: Option<String>,
    /// Service entry point, e.g. `app.main:app` or a full command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_entry: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    /// Sampled source files as a JSON list of `{path, content}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_context: Option<String>,
    /// Development or repair plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<String>,
    /// Log content gathered for diagnosis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_to_save: Option<Vec<FileArtifact>>,
    /// Absolute paths written by `save_files`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_commands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_started: Option<bool>,
    /// Error lines seen in service output; empty when the check found none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_errors: Option<String>,
    /// Number of error checks that found errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    /// Free-form message, the answer for Q&A requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

macro_rules! overwrite_present {
    ($target:expr, $update:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $update.$field {
                $target.$field = Some(value);
            }
        )+
    };
}

impl State for DevState {
    type Update = DevState;

    fn merge(&mut self, update: DevState) {
        overwrite_present!(self, update;
            request,
            repo_path,
            service_entry,
            task_type,
            code_context,
            plan,
            design,
            logs,
            files_to_save,
            saved_files,
            commit_message,
            install_commands,
            start_command,
            service_started,
            console_errors,
            repair_attempts,
            done,
            message,
        );
    }
}

impl DevState {
    /// Initial state for an invocation
    pub fn new(repo_path: impl Into<String>, request: impl Into<String>) -> Self {
        Self {
            repo_path: Some(repo_path.into()),
            request: Some(request.into()),
            ..Default::default()
        }
    }

    pub fn with_service_entry(mut self, entry: Option<String>) -> Self {
        self.service_entry = entry;
        self
    }

    pub fn request(&self) -> &str {
        self.request.as_deref().unwrap_or_default()
    }

    pub fn repo_path(&self) -> &str {
        self.repo_path.as_deref().unwrap_or(".")
    }

    /// The classification, defaulting to Q&A when unset
    pub fn task(&self) -> TaskType {
        self.task_type.unwrap_or(TaskType::Qna)
    }

    /// Console check found errors
    pub fn has_console_errors(&self) -> bool {
        self.console_errors
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty())
    }
}
