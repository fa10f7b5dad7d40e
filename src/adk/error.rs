// SPDX-License-Identifier: MIT

//! Typed error handling for arcflow-rs
//!
//! Graph construction, routing and execution each get their own error type so
//! callers can tell a mis-wired workflow apart from a failing step. Steps and
//! model clients keep the `Box<dyn Error + Send + Sync>` seam so step authors
//! can surface any error type they like.

use thiserror::Error;

/// Boxed error returned by steps and model clients
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for arcflow-rs
#[derive(Debug, Error)]
pub enum ArcflowError {
    /// API errors from the text-generation service
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The workflow graph could not be built
    #[error("Graph build error: {0}")]
    Build(#[from] GraphBuildError),

    /// An invocation of a compiled graph failed
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Model/LLM errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Structural problems detected while defining or compiling a graph.
///
/// These are fatal: a graph that fails to compile never runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphBuildError {
    #[error("Node '{0}' is already registered")]
    DuplicateNode(String),

    #[error("Node '{0}' is not registered")]
    UnknownNode(String),

    #[error("Node '{0}' already has an outgoing edge")]
    DuplicateEdge(String),

    #[error("Edge from '{from}' points at unregistered node '{target}'")]
    InvalidTarget { from: String, target: String },

    #[error("Node '{0}' has no outgoing edge")]
    Dangling(String),

    #[error("No entry node set")]
    MissingEntry,

    #[error("Conditional edge from '{0}' declares no routes")]
    EmptyRoutes(String),

    #[error("Node '{0}' is not reachable from the entry node")]
    Unreachable(String),

    #[error("Step budget must be at least 1")]
    ZeroStepBudget,
}

/// Errors raised while resolving the next node at runtime
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// A router returned a label its edge group does not declare
    #[error("Router on '{node}' returned undeclared label '{label}'")]
    UnknownRoute { node: String, label: String },

    /// Control reached a node id the compiled graph does not hold
    #[error("No node '{0}' in the compiled graph")]
    UnregisteredNode(String),
}

/// Errors that end a single invocation of a compiled graph
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// The invocation ran more steps than the configured ceiling allows
    #[error("Step budget of {limit} exceeded")]
    StepBudgetExceeded { limit: usize },

    /// A step failed; `source` is the step's own error, untouched
    #[error("Step '{node}' failed: {source}")]
    Step {
        node: String,
        #[source]
        source: BoxError,
    },
}

impl ExecutionError {
    /// Borrow the failing step's error, if this is a step failure
    pub fn step_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ExecutionError::Step { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl ArcflowError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
