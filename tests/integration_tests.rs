//! Integration tests for graph compilation and workflow execution
//!
//! These tests verify engine guarantees and the developer workflow end to end
//! using a scripted model and temporary repositories.

use arcflow_rs::adk::error::{BoxError, ExecutionError, GraphBuildError, RoutingError};
use arcflow_rs::adk::model::{GenerationConfig, Model};
use arcflow_rs::adk::step::{step_fn, Step};
use arcflow_rs::arcflow::config::Settings;
use arcflow_rs::arcflow::steps::{FixCodeStep, StepError};
use arcflow_rs::arcflow::workflow::builder::{nodes, Builder};
use arcflow_rs::arcflow::workflow::graph::{CompiledGraph, EngineConfig, StateGraph, Target};
use arcflow_rs::arcflow::workflow::router::Routes;
use arcflow_rs::arcflow::workflow::state::{DevState, StateMap, TaskType};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Mock Components
// ============================================================================

/// Mock model that replays predefined responses in order
struct MockModel {
    responses: Vec<String>,
    response_index: AtomicUsize,
}

impl MockModel {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|r| r.to_string()).collect(),
            response_index: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.response_index.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate(
        &self,
        _system: &str,
        _user: &str,
        _config: Option<&GenerationConfig>,
    ) -> Result<String, BoxError> {
        let idx = self.response_index.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(idx)
            .cloned()
            .ok_or_else(|| "Max responses reached".into())
    }
}

/// Settings that keep workflow runs fast and side-effect free
static TEST_SETTINGS: Lazy<Settings> = Lazy::new(|| {
    let mut settings = Settings::default();
    settings.service.console_wait_ms = 0;
    settings
});

fn set(key: &'static str, value: Value) -> impl Step<StateMap> {
    step_fn(move |_: &StateMap| Ok(StateMap::from_pairs([(key, value.clone())])))
}

fn forward() -> impl Step<StateMap> {
    step_fn(|_: &StateMap| Ok(StateMap::new()))
}

fn workflow(model: Arc<MockModel>, settings: Settings) -> CompiledGraph<DevState> {
    Builder::new(model, settings).build().unwrap()
}

// ============================================================================
// Engine Guarantees
// ============================================================================

#[tokio::test]
async fn test_last_writer_wins_and_untouched_fields_survive() {
    let mut graph = StateGraph::new();
    graph.add_node("first", set("a", json!(1))).unwrap();
    graph.add_node("second", set("a", json!(2))).unwrap();
    graph.set_entry("first").unwrap();
    graph.add_edge("first", "second").unwrap();
    graph.add_edge("second", Target::End).unwrap();
    let compiled = graph.compile().unwrap();

    let out = compiled
        .invoke(StateMap::from(json!({"keep": "me", "a": 0})))
        .await
        .unwrap();

    assert_eq!(out.to_json(), json!({"keep": "me", "a": 2}));
}

#[test]
fn test_dangling_node_rejected() {
    let mut graph = StateGraph::new();
    graph.add_node("start", forward()).unwrap();
    graph.add_node("stuck", forward()).unwrap();
    graph.set_entry("start").unwrap();
    graph.add_edge("start", "stuck").unwrap();

    let err = graph.compile().err().unwrap();
    assert_eq!(err, GraphBuildError::Dangling("stuck".to_string()));
}

#[tokio::test]
async fn test_undeclared_label_is_unknown_route() {
    let mut graph = StateGraph::new();
    graph.add_node("pick", forward()).unwrap();
    graph.add_node("node_a", forward()).unwrap();
    graph.add_node("node_b", forward()).unwrap();
    graph.set_entry("pick").unwrap();
    graph
        .add_conditional_edges(
            "pick",
            |_: &StateMap| "z".to_string(),
            [("x", "node_a"), ("y", "node_b")].into_iter().collect(),
        )
        .unwrap();
    graph.add_edge("node_a", Target::End).unwrap();
    graph.add_edge("node_b", Target::End).unwrap();
    let compiled = graph.compile().unwrap();

    let err = compiled.invoke(StateMap::new()).await.unwrap_err();

    match err {
        ExecutionError::Routing(RoutingError::UnknownRoute { node, label }) => {
            assert_eq!(node, "pick");
            assert_eq!(label, "z");
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn retry_cycle(config: EngineConfig) -> CompiledGraph<StateMap> {
    let mut graph = StateGraph::new();
    graph.add_node("a", forward()).unwrap();
    graph.add_node("b", set("done", json!(true))).unwrap();
    graph.set_entry("a").unwrap();
    graph
        .add_conditional_edges(
            "a",
            |s: &StateMap| {
                if s.is_truthy("done") {
                    "end".to_string()
                } else {
                    "retry".to_string()
                }
            },
            Routes::new().route("retry", "b").route("end", Target::End),
        )
        .unwrap();
    graph.add_edge("b", "a").unwrap();
    graph.compile_with(config).unwrap()
}

// A, B, A: three executions. B runs once and control returns to A once, so
// a budget of 2 cannot finish it (see "Two-node retry cycle" in DESIGN.md).
#[tokio::test]
async fn test_retry_cycle_terminates_once_done() {
    let execution = retry_cycle(EngineConfig::default())
        .invoke_with_trace(StateMap::new())
        .await
        .unwrap();

    assert_eq!(execution.visited(), vec!["a", "b", "a"]);
    assert_eq!(execution.state.get("done"), Some(&json!(true)));
}

#[tokio::test]
async fn test_retry_cycle_budget_boundary() {
    let tight = retry_cycle(EngineConfig { max_steps: 2 });
    assert!(matches!(
        tight.invoke(StateMap::new()).await,
        Err(ExecutionError::StepBudgetExceeded { limit: 2 })
    ));

    let exact = retry_cycle(EngineConfig { max_steps: 3 });
    assert!(exact.invoke(StateMap::new()).await.is_ok());
}

#[tokio::test]
async fn test_unbounded_cycle_hits_budget() {
    let mut graph = StateGraph::new();
    graph.add_node("ping", forward()).unwrap();
    graph.add_node("pong", forward()).unwrap();
    graph.set_entry("ping").unwrap();
    graph.add_edge("ping", "pong").unwrap();
    graph.add_edge("pong", "ping").unwrap();
    let compiled = graph.compile_with(EngineConfig { max_steps: 10 }).unwrap();

    let err = compiled.invoke(StateMap::new()).await.unwrap_err();
    assert!(matches!(err, ExecutionError::StepBudgetExceeded { limit: 10 }));
}

fn classify_graph() -> CompiledGraph<StateMap> {
    let mut graph = StateGraph::new();
    graph.add_node("classify", forward()).unwrap();
    graph.add_node("devPath", set("built", json!(true))).unwrap();
    graph.add_node("qnaPath", set("done", json!(true))).unwrap();
    graph.set_entry("classify").unwrap();
    graph
        .add_conditional_edges(
            "classify",
            |s: &StateMap| {
                s.get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("dev")
                    .to_string()
            },
            Routes::new().route("dev", "devPath").route("qna", "qnaPath"),
        )
        .unwrap();
    graph.add_edge("devPath", Target::End).unwrap();
    graph.add_edge("qnaPath", Target::End).unwrap();
    graph.compile().unwrap()
}

#[tokio::test]
async fn test_classify_routes_to_qna_path() {
    let execution = classify_graph()
        .invoke_with_trace(StateMap::from(json!({"type": "qna"})))
        .await
        .unwrap();

    assert_eq!(execution.visited(), vec!["classify", "qnaPath"]);
    assert_eq!(execution.state.to_json(), json!({"type": "qna", "done": true}));
}

#[tokio::test]
async fn test_concurrent_invocations_are_independent() {
    let compiled = Arc::new(classify_graph());

    let (qna, dev) = tokio::join!(
        compiled.invoke(StateMap::from(json!({"type": "qna", "id": 1}))),
        compiled.invoke(StateMap::from(json!({"type": "dev", "id": 2}))),
    );

    assert_eq!(qna.unwrap().to_json(), json!({"type": "qna", "id": 1, "done": true}));
    assert_eq!(dev.unwrap().to_json(), json!({"type": "dev", "id": 2, "built": true}));
}

#[tokio::test]
async fn test_step_error_reaches_caller_unmodified() {
    let mut graph = StateGraph::new();
    graph
        .add_node(
            "broken",
            step_fn(|_: &StateMap| Err(Box::new(StepError::MissingField("plan")) as BoxError)),
        )
        .unwrap();
    graph.set_entry("broken").unwrap();
    graph.add_edge("broken", Target::End).unwrap();
    let compiled = graph.compile().unwrap();

    let err = compiled.invoke(StateMap::new()).await.unwrap_err();

    let source = err.step_source().unwrap();
    assert!(matches!(
        source.downcast_ref::<StepError>(),
        Some(StepError::MissingField("plan"))
    ));
}

// ============================================================================
// Developer Workflow
// ============================================================================

#[tokio::test]
async fn test_qna_request() {
    let model = Arc::new(MockModel::new(&["qna", "Use a reverse proxy."]));
    let compiled = workflow(model.clone(), TEST_SETTINGS.clone());

    let execution = compiled
        .invoke_with_trace(DevState::new(".", "How do I expose port 8000?"))
        .await
        .unwrap();

    assert_eq!(execution.visited(), vec![nodes::CLASSIFY, nodes::DAILY_QNA]);
    assert_eq!(execution.state.task_type, Some(TaskType::Qna));
    assert_eq!(execution.state.message.as_deref(), Some("Use a reverse proxy."));
    assert_eq!(execution.state.done, Some(true));
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn test_dev_request_writes_files_and_starts_service() {
    let repo = tempfile::tempdir().unwrap();
    let generated = r#"<arc-file type="file" path="app/main.py">print("hello")</arc-file>
<arc-file type="file" path="requirements.txt">fastapi</arc-file>
<arc-file type="shell">echo installing
echo serving</arc-file>"#;
    let model = Arc::new(MockModel::new(&["dev", "1. plan", "1. design", generated]));
    let compiled = workflow(model.clone(), TEST_SETTINGS.clone());

    let execution = compiled
        .invoke_with_trace(DevState::new(repo.path().to_string_lossy(), "hello service"))
        .await
        .unwrap();

    assert_eq!(
        execution.visited(),
        vec![
            nodes::CLASSIFY,
            nodes::READ_CODE,
            nodes::ANALYZE_REQUIREMENTS,
            nodes::DESIGN_SOLUTION,
            nodes::GENERATE_CODE,
            nodes::SAVE_FILES,
            nodes::VERSION_COMMIT,
            nodes::SERVICE_MANAGE,
            nodes::CHECK_CONSOLE_ERRORS,
        ]
    );

    let state = &execution.state;
    assert_eq!(
        fs::read_to_string(repo.path().join("app/main.py")).unwrap(),
        "print(\"hello\")"
    );
    assert_eq!(state.saved_files.as_ref().map(Vec::len), Some(2));
    assert_eq!(state.plan.as_deref(), Some("1. plan"));
    assert_eq!(state.design.as_deref(), Some("1. design"));
    assert_eq!(state.install_commands, Some(vec!["echo installing".to_string()]));
    assert_eq!(state.start_command.as_deref(), Some("echo serving"));
    assert_eq!(state.commit_message.as_deref(), Some("feat: hello service"));
    assert_eq!(state.service_started, Some(true));
    assert_eq!(state.console_errors.as_deref(), Some(""));
    assert_eq!(model.calls(), 4);
}

#[tokio::test]
async fn test_bugfix_request_repairs_from_logs() {
    let repo = tempfile::tempdir().unwrap();
    fs::create_dir_all(repo.path().join("logs")).unwrap();
    fs::write(repo.path().join("logs/app.log"), "ImportError: no module named foo").unwrap();
    fs::write(repo.path().join("app.py"), "import foo").unwrap();

    let fixed = r#"<arc-file type="file" path="app.py">import os</arc-file>"#;
    let model = Arc::new(MockModel::new(&["bugfix", "1. replace the import", fixed]));
    let compiled = workflow(model.clone(), TEST_SETTINGS.clone());

    let execution = compiled
        .invoke_with_trace(DevState::new(repo.path().to_string_lossy(), "fix the crash"))
        .await
        .unwrap();

    assert_eq!(
        execution.visited(),
        vec![
            nodes::CLASSIFY,
            nodes::READ_LOGS,
            nodes::READ_CODE,
            nodes::LOCATE_ISSUE,
            nodes::FIX_CODE,
            nodes::SAVE_FILES,
            nodes::VERSION_COMMIT,
            nodes::SERVICE_MANAGE,
            nodes::CHECK_CONSOLE_ERRORS,
        ]
    );

    let state = &execution.state;
    assert_eq!(state.logs.as_deref(), Some("ImportError: no module named foo"));
    assert!(state.code_context.as_deref().unwrap().contains("import foo"));
    assert_eq!(fs::read_to_string(repo.path().join("app.py")).unwrap(), "import os");
    assert_eq!(state.commit_message.as_deref(), Some("fix: bug fix"));
    assert_eq!(state.service_started, Some(false));
}

#[tokio::test]
async fn test_console_errors_trigger_bounded_repair() {
    let repo = tempfile::tempdir().unwrap();
    let mut settings = TEST_SETTINGS.clone();
    settings.service.console_wait_ms = 500;
    settings.repair.max_attempts = 1;

    let generated = r#"<arc-file type="file" path="main.py">raise SystemExit</arc-file>
<arc-file type="shell">echo "Traceback: boom"</arc-file>"#;
    let fixed = r#"<arc-file type="file" path="main.py">print("ok")</arc-file>"#;
    let model = Arc::new(MockModel::new(&[
        "dev",
        "plan",
        "design",
        generated,
        "repair plan",
        fixed,
    ]));
    let compiled = workflow(model.clone(), settings);

    let execution = compiled
        .invoke_with_trace(DevState::new(repo.path().to_string_lossy(), "broken service"))
        .await
        .unwrap();

    let visited = execution.visited();
    let checks = visited
        .iter()
        .filter(|n| **n == nodes::CHECK_CONSOLE_ERRORS)
        .count();
    assert_eq!(checks, 2);
    assert!(visited.contains(&nodes::LOCATE_ISSUE));
    assert_eq!(
        visited.iter().filter(|n| **n == nodes::ANALYZE_REQUIREMENTS).count(),
        1
    );
    assert_eq!(execution.state.repair_attempts, Some(2));
    assert!(execution.state.has_console_errors());
    assert_eq!(
        fs::read_to_string(repo.path().join("main.py")).unwrap(),
        "print(\"ok\")"
    );
    assert_eq!(model.calls(), 6);
}

#[tokio::test]
async fn test_persistent_errors_stop_at_repair_limit_with_defaults() {
    let repo = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.service.console_wait_ms = 300;

    let generated = r#"<arc-file type="file" path="main.py">raise SystemExit</arc-file>
<arc-file type="shell">echo "Traceback: boom"</arc-file>"#;
    let unchanged = r#"<arc-file type="file" path="main.py">raise SystemExit</arc-file>"#;
    let model = Arc::new(MockModel::new(&[
        "dev", "plan", "design", generated, "plan 1", unchanged, "plan 2", unchanged, "plan 3",
        unchanged,
    ]));
    let compiled = workflow(model.clone(), settings);

    let execution = compiled
        .invoke_with_trace(DevState::new(repo.path().to_string_lossy(), "broken service"))
        .await
        .unwrap();

    let checks = execution
        .visited()
        .iter()
        .filter(|n| **n == nodes::CHECK_CONSOLE_ERRORS)
        .count();
    assert_eq!(checks, 4);
    assert_eq!(execution.steps, 33);
    assert_eq!(execution.state.repair_attempts, Some(4));
    assert!(execution
        .state
        .console_errors
        .as_deref()
        .unwrap()
        .contains("Traceback: boom"));
    assert_eq!(model.calls(), 10);
}

#[tokio::test]
async fn test_workflow_budget_is_enforced() {
    let mut settings = TEST_SETTINGS.clone();
    settings.engine.max_steps = 3;
    let generated = r#"<arc-file type="file" path="a.txt">a</arc-file>"#;
    let model = Arc::new(MockModel::new(&["dev", "plan", "design", generated]));
    let repo = tempfile::tempdir().unwrap();

    let err = workflow(model, settings)
        .invoke(DevState::new(repo.path().to_string_lossy(), "x"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExecutionError::StepBudgetExceeded { limit: 3 }));
}

#[tokio::test]
async fn test_fix_without_plan_fails() {
    let step = FixCodeStep::new(Arc::new(MockModel::new(&[])));
    let err = step.run(&DevState::new(".", "x")).await.unwrap_err();
    assert_eq!(err.to_string(), "Required state field 'plan' is missing");
}
