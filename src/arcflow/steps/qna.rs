// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use super::{preview, StepError};
use crate::adk::error::BoxError;
use crate::adk::model::Model;
use crate::adk::step::Step;
use crate::arcflow::workflow::state::DevState;

const SYSTEM_PROMPT: &str =
    "You are a senior assistant. Answer development questions briefly and precisely.";

/// Answers the request directly and marks the run done
pub struct DailyQnaStep {
    model: Arc<dyn Model>,
}

impl DailyQnaStep {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Step<DevState> for DailyQnaStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let answer = self
            .model
            .generate(SYSTEM_PROMPT, state.request(), None)
            .await
            .map_err(StepError::Model)?;
        log::info!("qna: {}", preview(&answer, 400));

        Ok(DevState {
            done: Some(true),
            message: Some(answer),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcflow::steps::testing::{FailingModel, MockModel};

    #[tokio::test]
    async fn test_answer_sets_message_and_done() {
        let model = Arc::new(MockModel::new(vec!["CORS is a browser policy."]));
        let update = DailyQnaStep::new(model.clone())
            .run(&DevState::new(".", "What is CORS?"))
            .await
            .unwrap();

        assert_eq!(update.message.as_deref(), Some("CORS is a browser policy."));
        assert_eq!(update.done, Some(true));
        assert_eq!(model.user_prompts(), vec!["What is CORS?"]);
    }

    #[tokio::test]
    async fn test_model_error_is_reported() {
        let err = DailyQnaStep::new(Arc::new(FailingModel))
            .run(&DevState::new(".", "q"))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<StepError>(), Some(StepError::Model(_))));
    }
}
