// SPDX-License-Identifier: MIT

//! Graph workflow executor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::adk::error::{ExecutionError, RoutingError};
use crate::adk::step::Step;
use crate::arcflow::workflow::router;
use crate::arcflow::workflow::state::State;

use super::types::{Edge, Target};

/// Default ceiling on step executions per invocation
pub const DEFAULT_MAX_STEPS: usize = 50;

/// Engine settings fixed at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of step executions in one invocation
    pub max_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// One executed step and the state right after its update was merged
#[derive(Debug, Clone)]
pub struct TraceEntry<S> {
    pub node: String,
    pub state: S,
}

/// Outcome of a traced invocation
#[derive(Debug, Clone)]
pub struct Execution<S> {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Number of step executions
    pub steps: usize,
    pub trace: Vec<TraceEntry<S>>,
    pub state: S,
}

impl<S> Execution<S> {
    /// Node ids in execution order
    pub fn visited(&self) -> Vec<&str> {
        self.trace.iter().map(|e| e.node.as_str()).collect()
    }
}

/// Compiled node ready for execution
pub struct CompiledNode<S: State> {
    pub id: String,
    pub step: Arc<dyn Step<S>>,
    pub edge: Edge<S>,
}

/// Immutable, re-entrant executable produced by `StateGraph::compile`
///
/// Invocations share nothing but the graph itself; each owns its state.
pub struct CompiledGraph<S: State> {
    entry: String,
    nodes: HashMap<String, CompiledNode<S>>,
    config: EngineConfig,
}

impl<S: State> CompiledGraph<S> {
    pub(super) fn new(
        entry: String,
        nodes: HashMap<String, CompiledNode<S>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            entry,
            nodes,
            config,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Node ids, sorted
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Run from the entry node to the terminal sentinel
    pub async fn invoke(&self, initial: S) -> Result<S, ExecutionError> {
        self.run(initial, false).await.map(|execution| execution.state)
    }

    /// Like `invoke`, also recording every step and its resulting state
    pub async fn invoke_with_trace(&self, initial: S) -> Result<Execution<S>, ExecutionError> {
        self.run(initial, true).await
    }

    fn lookup(&self, id: &str) -> Result<&CompiledNode<S>, RoutingError> {
        self.nodes
            .get(id)
            .ok_or_else(|| RoutingError::UnregisteredNode(id.to_string()))
    }

    async fn run(&self, initial: S, record: bool) -> Result<Execution<S>, ExecutionError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        log::info!(
            "Run {} starting at '{}' (step budget {})",
            run_id,
            self.entry,
            self.config.max_steps
        );

        let mut state = initial;
        let mut trace = Vec::new();
        let mut steps = 0usize;
        let mut node = self.lookup(&self.entry)?;

        loop {
            if steps == self.config.max_steps {
                log::error!(
                    "Run {} exceeded step budget of {} before '{}'",
                    run_id,
                    self.config.max_steps,
                    node.id
                );
                return Err(ExecutionError::StepBudgetExceeded {
                    limit: self.config.max_steps,
                });
            }
            steps += 1;

            log::debug!("Run {} step {}: executing '{}'", run_id, steps, node.id);
            let update = node.step.run(&state).await.map_err(|source| {
                log::error!("Run {} node '{}' failed: {}", run_id, node.id, source);
                ExecutionError::Step {
                    node: node.id.clone(),
                    source,
                }
            })?;
            state.merge(update);

            if record {
                trace.push(TraceEntry {
                    node: node.id.clone(),
                    state: state.clone(),
                });
            }

            let next = match &node.edge {
                Edge::Fixed(target) => target.clone(),
                Edge::Conditional { router, routes } => {
                    router::resolve(&node.id, router.as_ref(), routes, &state)?
                }
            };

            match next {
                Target::End => break,
                Target::Node(id) => node = self.lookup(&id)?,
            }
        }

        log::info!(
            "Run {} finished after {} steps in {:?}",
            run_id,
            steps,
            clock.elapsed()
        );

        Ok(Execution {
            run_id,
            started_at,
            steps,
            trace,
            state,
        })
    }
}
