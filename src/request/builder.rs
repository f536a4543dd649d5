use crate::error::SubmitError;
use crate::model::{EvaluationJobConfig, TargetParameters};

use super::state::{ConsoleState, MetricSelection};

pub const INPUT_DATA_PART: &str = "input_data";
pub const NUM_QUESTIONS_PART: &str = "num_questions";
pub const CONFIG_PART: &str = "config";

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationJob {
    pub dataset_file_name: String,
    pub dataset_content: Vec<u8>,
    pub num_questions: usize,
    pub config: EvaluationJobConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationPayload {
    pub file_name: String,
    pub content: Vec<u8>,
    pub num_questions: String,
    pub config_json: String,
}

pub fn validate(state: &ConsoleState) -> Result<(), SubmitError> {
    if state.dataset.is_none() {
        return Err(SubmitError::MissingDataset);
    }

    match &state.metrics {
        MetricSelection::Split {
            model_graded,
            statistical,
        } => {
            if model_graded.is_empty() {
                return Err(SubmitError::NoModelGradedMetric);
            }
            if statistical.is_empty() {
                return Err(SubmitError::NoStatisticalMetric);
            }
        }
        MetricSelection::Merged(metrics) => {
            if metrics.is_empty() {
                return Err(SubmitError::NoMetric);
            }
        }
    }

    if state.questions_to_eval == 0 {
        return Err(SubmitError::ZeroQuestions);
    }

    if state.selected_models.is_empty() {
        return Err(SubmitError::NoModels);
    }

    Ok(())
}

pub fn build_job(state: &ConsoleState) -> Result<EvaluationJob, SubmitError> {
    validate(state)?;
    let dataset = state.dataset.as_ref().ok_or(SubmitError::MissingDataset)?;

    let mut overrides = state.overrides.clone();
    overrides.constrain_to(&state.flags);

    Ok(EvaluationJob {
        dataset_file_name: dataset.file_name.clone(),
        dataset_content: dataset.content.clone(),
        num_questions: state.questions_to_eval,
        config: EvaluationJobConfig {
            requested_metrics: state.metrics.requested(),
            compared_models: state.selected_models.clone(),
            run_red_teaming: state.run_red_teaming,
            target_parameters: TargetParameters { overrides },
        },
    })
}

impl EvaluationJob {
    pub fn to_payload(&self) -> Result<EvaluationPayload, SubmitError> {
        let config_json = serde_json::to_string(&self.config)
            .map_err(|err| SubmitError::Encode(err.to_string()))?;

        Ok(EvaluationPayload {
            file_name: self.dataset_file_name.clone(),
            content: self.dataset_content.clone(),
            num_questions: self.num_questions.to_string(),
            config_json,
        })
    }
}
