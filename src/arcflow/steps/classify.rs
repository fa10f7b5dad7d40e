// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use super::StepError;
use crate::adk::error::BoxError;
use crate::adk::model::{GenerationConfig, Model};
use crate::adk::step::Step;
use crate::arcflow::workflow::state::{DevState, TaskType};

const SYSTEM_PROMPT: &str = "\
Answer with exactly one lowercase word: dev, bugfix or qna. Output nothing else.
Rules:
- dev: the request asks to add, implement, scaffold, build, generate, write, create, design, integrate or rework something, or asks for files, endpoints, components, SQL or a project layout.
- bugfix: the request mentions an error, exception, crash, failure to run, stack trace, error code or logs and wants the problem found or fixed.
- qna: a knowledge question (how it works, what it is, how to, differences, examples, best practice) with no implementation or repair.
Priority: error logs plus a request to fix means bugfix; a knowledge question plus a concrete build request means dev.
Examples:
- \"Build an OA system with login and approvals\" -> dev
- \"Runtime error: Traceback ... please fix\" -> bugfix
- \"What is CORS and how does it work?\" -> qna";

/// Labels the request as dev, bugfix or qna
///
/// Replies outside the three labels fall back to qna. Model failures are
/// not masked.
pub struct ClassifyStep {
    model: Arc<dyn Model>,
}

impl ClassifyStep {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Step<DevState> for ClassifyStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let user = format!("Request: {}", state.request());
        let reply = self
            .model
            .generate(SYSTEM_PROMPT, &user, Some(&GenerationConfig::with_temperature(0.0)))
            .await
            .map_err(StepError::Model)?;

        let task = reply.parse::<TaskType>().unwrap_or_else(|_| {
            log::warn!("Unrecognized classification '{}', treating as qna", reply.trim());
            TaskType::Qna
        });
        log::info!("type: {}", task);

        Ok(DevState {
            task_type: Some(task),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcflow::steps::testing::{FailingModel, MockModel};

    async fn classify(reply: &str) -> TaskType {
        let step = ClassifyStep::new(Arc::new(MockModel::new(vec![reply])));
        let update = step.run(&DevState::new(".", "anything")).await.unwrap();
        update.task_type.unwrap()
    }

    #[tokio::test]
    async fn test_labels_are_normalized() {
        assert_eq!(classify(" Dev\n").await, TaskType::Dev);
        assert_eq!(classify("BUGFIX").await, TaskType::Bugfix);
        assert_eq!(classify("qna").await, TaskType::Qna);
    }

    #[tokio::test]
    async fn test_unknown_label_falls_back_to_qna() {
        assert_eq!(classify("feature request").await, TaskType::Qna);
        assert_eq!(classify("").await, TaskType::Qna);
    }

    #[tokio::test]
    async fn test_request_reaches_prompt() {
        let model = Arc::new(MockModel::new(vec!["dev"]));
        let step = ClassifyStep::new(model.clone());
        step.run(&DevState::new(".", "build a todo api")).await.unwrap();
        assert_eq!(model.user_prompts(), vec!["Request: build a todo api"]);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let step = ClassifyStep::new(Arc::new(FailingModel));
        let err = step.run(&DevState::new(".", "x")).await.unwrap_err();
        assert!(err.to_string().contains("upstream unavailable"));
    }
}
