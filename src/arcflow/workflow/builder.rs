// SPDX-License-Identifier: MIT

//! Workflow builder - assembles the developer workflow
//!
//! Registers every step, wires the fixed and conditional edges and compiles
//! the result with the configured step budget.

use std::sync::Arc;

use crate::adk::error::GraphBuildError;
use crate::adk::model::Model;
use crate::arcflow::config::Settings;
use crate::arcflow::steps::{
    AnalyzeRequirementsStep, CheckConsoleErrorsStep, ClassifyStep, DailyQnaStep,
    DesignSolutionStep, FixCodeStep, GenerateCodeStep, LocateIssueStep, ReadCodeStep,
    ReadLogsStep, SaveFilesStep, ServiceManageStep, VersionCommitStep,
};
use crate::arcflow::workflow::graph::{CompiledGraph, StateGraph, Target};
use crate::arcflow::workflow::router::Routes;
use crate::arcflow::workflow::state::{DevState, TaskType};

/// Node ids of the developer workflow
pub mod nodes {
    pub const CLASSIFY: &str = "classify";
    pub const READ_CODE: &str = "read_code";
    pub const ANALYZE_REQUIREMENTS: &str = "analyze_requirements";
    pub const DESIGN_SOLUTION: &str = "design_solution";
    pub const GENERATE_CODE: &str = "generate_code";
    pub const READ_LOGS: &str = "read_logs";
    pub const LOCATE_ISSUE: &str = "locate_issue";
    pub const FIX_CODE: &str = "fix_code";
    pub const SAVE_FILES: &str = "save_files";
    pub const VERSION_COMMIT: &str = "version_commit";
    pub const SERVICE_MANAGE: &str = "service_manage";
    pub const CHECK_CONSOLE_ERRORS: &str = "check_console_errors";
    pub const DAILY_QNA: &str = "daily_qna";
}

/// Steps in one dev or bugfix pass, from `classify` to the first console check
pub const PASS_STEPS: usize = 9;

/// Steps in one repair round, from `read_logs` back to the console check
pub const REPAIR_ROUND_STEPS: usize = 8;

/// Step budget needed to finish every repair round `max_attempts` allows
pub fn required_steps(max_attempts: u32) -> usize {
    PASS_STEPS + REPAIR_ROUND_STEPS * max_attempts as usize
}

/// Label for the classified request type
pub fn route_by_task(state: &DevState) -> String {
    state.task().as_str().to_string()
}

/// Bugfix requests and repair rounds continue to issue location, everything
/// else to planning
pub fn route_after_read_code(state: &DevState) -> String {
    if state.task() == TaskType::Bugfix || state.has_console_errors() {
        "bugfix".to_string()
    } else {
        "dev".to_string()
    }
}

/// `repair` while errors remain and the attempt count is within `max_attempts`
pub fn repair_router(max_attempts: u32) -> impl Fn(&DevState) -> String + Send + Sync {
    move |state: &DevState| {
        let attempts = state.repair_attempts.unwrap_or(0);
        if state.has_console_errors() && attempts <= max_attempts {
            "repair".to_string()
        } else {
            "end".to_string()
        }
    }
}

/// High-level builder for the developer workflow
pub struct Builder {
    model: Arc<dyn Model>,
    settings: Settings,
}

impl Builder {
    pub fn new(model: Arc<dyn Model>, settings: Settings) -> Self {
        Self { model, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The uncompiled graph
    pub fn graph(&self) -> Result<StateGraph<DevState>, GraphBuildError> {
        use nodes::*;

        let model = &self.model;
        let settings = &self.settings;
        let mut log_candidates = settings.context.log_candidates.clone();
        log_candidates.push(settings.service.log_file.clone());

        let mut graph = StateGraph::new();
        graph
            .add_node(CLASSIFY, ClassifyStep::new(model.clone()))?
            .add_node(READ_CODE, ReadCodeStep::new(settings.context.clone()))?
            .add_node(
                ANALYZE_REQUIREMENTS,
                AnalyzeRequirementsStep::new(model.clone()),
            )?
            .add_node(DESIGN_SOLUTION, DesignSolutionStep::new(model.clone()))?
            .add_node(GENERATE_CODE, GenerateCodeStep::new(model.clone()))?
            .add_node(READ_LOGS, ReadLogsStep::new(log_candidates))?
            .add_node(LOCATE_ISSUE, LocateIssueStep::new(model.clone()))?
            .add_node(FIX_CODE, FixCodeStep::new(model.clone()))?
            .add_node(SAVE_FILES, SaveFilesStep)?
            .add_node(VERSION_COMMIT, VersionCommitStep)?
            .add_node(
                SERVICE_MANAGE,
                ServiceManageStep::new(settings.service.clone()),
            )?
            .add_node(
                CHECK_CONSOLE_ERRORS,
                CheckConsoleErrorsStep::new(
                    settings.service.clone(),
                    settings.repair.max_attempts,
                ),
            )?
            .add_node(DAILY_QNA, DailyQnaStep::new(model.clone()))?;

        graph.set_entry(CLASSIFY)?;

        graph
            .add_conditional_edges(
                CLASSIFY,
                route_by_task,
                Routes::new()
                    .route(TaskType::Dev.as_str(), READ_CODE)
                    .route(TaskType::Bugfix.as_str(), READ_LOGS)
                    .route(TaskType::Qna.as_str(), DAILY_QNA),
            )?
            .add_conditional_edges(
                READ_CODE,
                route_after_read_code,
                Routes::new()
                    .route("dev", ANALYZE_REQUIREMENTS)
                    .route("bugfix", LOCATE_ISSUE),
            )?
            .add_edge(ANALYZE_REQUIREMENTS, DESIGN_SOLUTION)?
            .add_edge(DESIGN_SOLUTION, GENERATE_CODE)?
            .add_edge(GENERATE_CODE, SAVE_FILES)?
            .add_edge(READ_LOGS, READ_CODE)?
            .add_edge(LOCATE_ISSUE, FIX_CODE)?
            .add_edge(FIX_CODE, SAVE_FILES)?
            .add_edge(SAVE_FILES, VERSION_COMMIT)?
            .add_edge(VERSION_COMMIT, SERVICE_MANAGE)?
            .add_edge(SERVICE_MANAGE, CHECK_CONSOLE_ERRORS)?
            .add_conditional_edges(
                CHECK_CONSOLE_ERRORS,
                repair_router(settings.repair.max_attempts),
                Routes::new()
                    .route("repair", READ_LOGS)
                    .route("end", Target::End),
            )?
            .add_edge(DAILY_QNA, Target::End)?;

        Ok(graph)
    }

    /// Compile the workflow with the configured engine settings
    pub fn build(&self) -> Result<CompiledGraph<DevState>, GraphBuildError> {
        let needed = required_steps(self.settings.repair.max_attempts);
        if self.settings.engine.max_steps < needed {
            log::warn!(
                "Step budget {} is below the {} steps that {} repair attempts need; \
                 persistent console errors will end the run with StepBudgetExceeded",
                self.settings.engine.max_steps,
                needed,
                self.settings.repair.max_attempts
            );
        }
        let compiled = self.graph()?.compile_with(self.settings.engine)?;
        log::info!(
            "Built developer workflow: {} nodes, entry '{}'",
            compiled.node_ids().len(),
            compiled.entry()
        );
        Ok(compiled)
    }
}
