// SPDX-License-Identifier: MIT

//! Plan and design generation
//!
//! All three steps run at temperature 0 and store the reply as plain text.

use async_trait::async_trait;
use std::sync::Arc;

use super::StepError;
use crate::adk::error::BoxError;
use crate::adk::model::{GenerationConfig, Model};
use crate::adk::step::Step;
use crate::arcflow::workflow::state::DevState;

const ANALYZE_PROMPT: &str = "\
You are a senior architect. Turn the user's request and the repository context into a concise development plan.
Rules:
- Bullet points, no pleasantries, at most two lines per point.
- Cover: goal and scope, feature breakdown, modules and boundaries, draft interfaces (method, path, request, response), data model (tables and fields or entities), dependencies and stack, delivery steps by priority.
- Leave out schedules, staffing, budget and risk assessment.
- Propose sensible defaults even when the code context is empty.
Output a numbered list.";

const DESIGN_PROMPT: &str = "\
You are a senior architect. Turn the development plan into concise, actionable design notes.
Cover:
- Architecture and stack: frameworks, libraries, database, cache, messaging, one line of reasoning each.
- Modules: names, responsibilities, key inputs and outputs.
- Draft interfaces: method, path, parameters, request and response bodies; at least login and one core feature.
- Data model: core entities or tables, key fields and constraints.
- Security: authentication and authorization, CORS, rate limiting, audit logging.
- Configuration: required environment variables and suggested defaults.
- Directory layout: top-level directories with example files.
- Operations: how to start, health checks, error handling and logging.
Output a numbered list, at most two lines per point.";

const LOCATE_PROMPT: &str = "\
You are a senior troubleshooting engineer. From the error logs and code samples, write an actionable repair plan.
Number every point and keep each to at most two lines. Include:
1) Root cause: error type, trigger, impact.
2) Affected files and why, one per line.
3) Fix approach and concrete changes, grouped by file.
4) Verification: reproduction steps, tests or scripts.
5) Compatibility and rollback, e.g. schema or API changes.
Output plain text only, no code and no commands.";

fn deterministic() -> GenerationConfig {
    GenerationConfig::with_temperature(0.0)
}

/// Drafts a development plan from the request and sampled code
pub struct AnalyzeRequirementsStep {
    model: Arc<dyn Model>,
}

impl AnalyzeRequirementsStep {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Step<DevState> for AnalyzeRequirementsStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let user = format!(
            "Request: {}\nCode context: {}",
            state.request(),
            state.code_context.as_deref().unwrap_or_default()
        );
        let plan = self
            .model
            .generate(ANALYZE_PROMPT, &user, Some(&deterministic()))
            .await
            .map_err(StepError::Model)?;
        log::info!("plan: {}", plan);

        Ok(DevState {
            plan: Some(plan),
            ..Default::default()
        })
    }
}

/// Expands the plan into design notes
pub struct DesignSolutionStep {
    model: Arc<dyn Model>,
}

impl DesignSolutionStep {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Step<DevState> for DesignSolutionStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let plan = state.plan.as_deref().ok_or(StepError::MissingField("plan"))?;
        let design = self
            .model
            .generate(DESIGN_PROMPT, plan, Some(&deterministic()))
            .await
            .map_err(StepError::Model)?;
        log::info!("design: {}", design);

        Ok(DevState {
            design: Some(design),
            ..Default::default()
        })
    }
}

/// Writes a repair plan from logs and sampled code
pub struct LocateIssueStep {
    model: Arc<dyn Model>,
}

impl LocateIssueStep {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Step<DevState> for LocateIssueStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let mut user = format!(
            "Logs:\n{}\n\nCode context sample:\n{}",
            state.logs.as_deref().unwrap_or_default(),
            state.code_context.as_deref().unwrap_or_default()
        );
        if state.has_console_errors() {
            user.push_str("\n\nConsole errors:\n");
            user.push_str(state.console_errors.as_deref().unwrap_or_default());
        }

        let plan = self
            .model
            .generate(LOCATE_PROMPT, &user, Some(&deterministic()))
            .await
            .map_err(StepError::Model)?;
        log::info!("bugfix_plan: {}", plan);

        Ok(DevState {
            plan: Some(plan),
            ..Default::default()
        })
    }
}
