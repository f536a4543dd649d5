use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use serde_json::Value;

use super::builder::validate;
use super::state::{QuestionBounds, SubmitFailure};
use super::submit::SingleFlight;
use super::*;
use crate::api::ConsoleApi;
use crate::cli::IngestMode;
use crate::dataset::{LoadedDataset, ingest_bytes};
use crate::error::{ApiError, SubmitError};
use crate::model::{
    FrontendConfig, GenerateDataRequest, ReportArtifact, RetrievalMode, TargetOverrides,
};

fn dataset_with_rows(rows: usize) -> LoadedDataset {
    let content: String = (0..rows)
        .map(|index| format!("{{\"question\":\"q{index}\",\"truth\":\"t{index}\"}}\n"))
        .collect();
    ingest_bytes("eval.jsonl", content.into_bytes(), IngestMode::Strict).expect("dataset")
}

fn all_flags() -> FrontendConfig {
    FrontendConfig {
        show_gpt4v_options: true,
        show_semantic_ranker_option: true,
        show_vector_option: true,
        ..FrontendConfig::default()
    }
}

fn ready_state() -> ConsoleState {
    let state = ConsoleState::default();
    let state = reduce(state, Action::ConfigLoaded(all_flags()));
    let state = reduce(
        state,
        Action::ModelsLoaded(vec!["gpt-4".to_string(), "Phi 3 Mini 4K".to_string()]),
    );
    let state = reduce(state, Action::DatasetLoaded(dataset_with_rows(20)));
    reduce(state, Action::SetQuestionsToEval(5))
}

#[derive(Default)]
struct FakeApi {
    fail_with: Option<(u16, String)>,
    evaluate_calls: AtomicUsize,
    last_payload: Mutex<Option<EvaluationPayload>>,
}

impl ConsoleApi for FakeApi {
    fn get_config(&self) -> Result<FrontendConfig, ApiError> {
        Ok(all_flags())
    }

    fn get_supported_models(&self) -> Result<Vec<String>, ApiError> {
        Ok(vec!["gpt-4".to_string()])
    }

    fn generate_data(&self, _request: &GenerateDataRequest) -> Result<Vec<u8>, ApiError> {
        Ok(Vec::new())
    }

    fn evaluate(&self, payload: &EvaluationPayload) -> Result<ReportArtifact, ApiError> {
        self.evaluate_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_payload.lock().expect("payload lock") = Some(payload.clone());

        match &self.fail_with {
            Some((status, message)) => Err(ApiError::Status {
                endpoint: "/evaluate",
                status: *status,
                message: message.clone(),
            }),
            None => Ok(ReportArtifact {
                content: b"%PDF-1.7".to_vec(),
                content_type: Some("application/pdf".to_string()),
            }),
        }
    }
}

#[test]
fn missing_dataset_wins_over_missing_models() {
    let state = ConsoleState::default();
    assert!(state.selected_models.is_empty());

    assert_eq!(validate(&state), Err(SubmitError::MissingDataset));
}

#[test]
fn empty_model_graded_group_is_reported_first() {
    let state = ready_state();
    let state = reduce(
        state,
        Action::ReplaceMetrics(MetricSelection::Split {
            model_graded: Vec::new(),
            statistical: vec!["f1_score".to_string()],
        }),
    );
    let state = reduce(
        state,
        Action::SetModel {
            model: "Phi 3 Mini 4K".to_string(),
            selected: false,
        },
    );
    assert_eq!(state.selected_models, vec!["gpt-4"]);
    assert_eq!(state.questions_to_eval, 5);

    assert_eq!(validate(&state), Err(SubmitError::NoModelGradedMetric));
}

#[test]
fn rules_fire_in_fixed_order() {
    let mut state = ready_state();
    state.metrics = MetricSelection::Split {
        model_graded: vec!["gpt_relevance".to_string()],
        statistical: Vec::new(),
    };
    state.questions_to_eval = 0;
    state.selected_models.clear();
    assert_eq!(validate(&state), Err(SubmitError::NoStatisticalMetric));

    state.metrics = MetricSelection::all(false);
    assert_eq!(validate(&state), Err(SubmitError::ZeroQuestions));

    state.questions_to_eval = 3;
    assert_eq!(validate(&state), Err(SubmitError::NoModels));

    state.selected_models.push("gpt-4".to_string());
    assert_eq!(validate(&state), Ok(()));
}

#[test]
fn merged_metrics_skip_the_statistical_rule() {
    let mut state = ready_state();
    state.metrics = MetricSelection::Merged(vec!["gpt_fluency".to_string()]);
    assert_eq!(validate(&state), Ok(()));

    state.metrics = MetricSelection::empty(true);
    assert_eq!(validate(&state), Err(SubmitError::NoMetric));
}

#[test]
fn job_config_concatenates_metric_groups_and_carries_overrides() {
    let state = ready_state();
    let state = reduce(
        state,
        Action::SetModel {
            model: "Phi 3 Mini 4K".to_string(),
            selected: true,
        },
    );
    let state = reduce(state, Action::SetRedTeaming(false));

    let job = build_job(&state).expect("job should build");
    let payload = job.to_payload().expect("payload should encode");

    assert_eq!(payload.file_name, "eval.jsonl");
    assert_eq!(payload.num_questions, "5");
    assert_eq!(payload.content, state.dataset.as_ref().expect("dataset").content);

    let config: Value = serde_json::from_str(&payload.config_json).expect("config json");
    assert_eq!(
        config["requested_metrics"],
        serde_json::json!([
            "gpt_groundedness",
            "gpt_relevance",
            "gpt_coherence",
            "gpt_similarity",
            "gpt_fluency",
            "f1_score",
            "answer_length",
            "latency"
        ])
    );
    assert_eq!(
        config["compared_models"],
        serde_json::json!(["gpt-4", "Phi 3 Mini 4K"])
    );
    assert_eq!(config["run_red_teaming"], false);

    let overrides = &config["target_parameters"]["overrides"];
    assert_eq!(overrides["top"], 3);
    assert_eq!(overrides["retrieval_mode"], "hybrid");
    assert_eq!(overrides["vector_fields"], serde_json::json!(["embedding"]));
    assert_eq!(overrides["gpt4v_input"], "textAndImages");
    assert_eq!(overrides["semantic_ranker"], true);
}

#[test]
fn build_job_applies_feature_flags_to_overrides() {
    let mut state = ready_state();
    state.flags = FrontendConfig::default();
    state.overrides = TargetOverrides {
        use_gpt4v: true,
        ..TargetOverrides::default()
    };

    let job = build_job(&state).expect("job should build");
    let overrides = &job.config.target_parameters.overrides;

    assert_eq!(overrides.retrieval_mode, RetrievalMode::Text);
    assert!(!overrides.semantic_ranker);
    assert!(!overrides.use_gpt4v);
}

#[test]
fn config_loaded_mirrors_semantic_ranker_flag_and_vector_support() {
    let flags = FrontendConfig {
        show_semantic_ranker_option: false,
        show_vector_option: false,
        ..FrontendConfig::default()
    };

    let state = reduce(ConsoleState::default(), Action::ConfigLoaded(flags));

    assert!(!state.overrides.semantic_ranker);
    assert_eq!(state.overrides.retrieval_mode, RetrievalMode::Text);
    assert!(state.adjusted_overrides.contains(&"retrieval_mode"));
}

#[test]
fn models_loaded_selects_the_first_model() {
    let state = reduce(
        ConsoleState::default(),
        Action::ModelsLoaded(vec!["a".to_string(), "b".to_string()]),
    );
    assert_eq!(state.selected_models, vec!["a"]);

    let empty = reduce(ConsoleState::default(), Action::ModelsLoaded(Vec::new()));
    assert!(empty.selected_models.is_empty());
}

#[test]
fn selecting_twice_does_not_duplicate() {
    let state = ready_state();
    let state = reduce(
        state,
        Action::SetModel {
            model: "gpt-4".to_string(),
            selected: true,
        },
    );
    assert_eq!(state.selected_models, vec!["gpt-4"]);

    let state = reduce(
        state,
        Action::SetMetric {
            name: "latency".to_string(),
            selected: true,
        },
    );
    assert_eq!(state.metrics, MetricSelection::all(false));
}

#[test]
fn metric_toggles_land_in_their_catalog_group() {
    let mut selection = MetricSelection::empty(false);
    assert!(selection.set("f1_score", true));
    assert!(selection.set("gpt_coherence", true));
    assert!(!selection.set("bleu", true));

    assert_eq!(
        selection,
        MetricSelection::Split {
            model_graded: vec!["gpt_coherence".to_string()],
            statistical: vec!["f1_score".to_string()],
        }
    );
    assert_eq!(selection.requested(), vec!["gpt_coherence", "f1_score"]);

    assert!(selection.set("f1_score", false));
    assert_eq!(selection.requested(), vec!["gpt_coherence"]);
}

#[test]
fn question_count_is_bounded_by_dataset_size() {
    let state = reduce(ConsoleState::default(), Action::DatasetLoaded(dataset_with_rows(4)));
    assert_eq!(
        state.question_bounds(),
        Some(QuestionBounds { min: 2, max: 4 })
    );

    let state = reduce(state, Action::SetQuestionsToEval(50));
    assert_eq!(state.questions_to_eval, 4);

    let state = reduce(state, Action::SetQuestionsToEval(1));
    assert_eq!(state.questions_to_eval, 2);

    let state = reduce(state, Action::SetQuestionsToEval(0));
    assert_eq!(state.questions_to_eval, 0);

    let merged = reduce(
        ConsoleState::new(true),
        Action::DatasetLoaded(dataset_with_rows(4)),
    );
    let merged = reduce(merged, Action::SetQuestionsToEval(1));
    assert_eq!(merged.questions_to_eval, 1);
}

#[test]
fn tiny_datasets_cap_below_the_minimum() {
    let state = reduce(ConsoleState::default(), Action::DatasetLoaded(dataset_with_rows(1)));
    assert_eq!(state.questions_to_eval, 1);

    let empty = reduce(ConsoleState::default(), Action::DatasetLoaded(dataset_with_rows(0)));
    assert_eq!(empty.questions_to_eval, 0);
    let empty = reduce(empty, Action::ModelsLoaded(vec!["m".to_string()]));
    assert_eq!(validate(&empty), Err(SubmitError::ZeroQuestions));
}

#[test]
fn dataset_rejection_clears_the_previous_dataset() {
    let state = ready_state();
    let state = reduce(
        state,
        Action::DatasetRejected("the file must be a JSONL file: data.csv".to_string()),
    );

    assert!(state.dataset.is_none());
    assert!(state.dataset_error.is_some());
    assert_eq!(validate(&state), Err(SubmitError::MissingDataset));
}

#[test]
fn successful_submit_stores_report_and_clears_flag() {
    let submitter = EvaluationSubmitter::new(FakeApi::default());

    let state = submitter.submit(ready_state());

    assert!(!state.in_progress);
    assert!(state.submit_failure.is_none());
    assert_eq!(
        state.report.as_ref().map(|report| report.content.as_slice()),
        Some(&b"%PDF-1.7"[..])
    );
    assert_eq!(submitter.api().evaluate_calls.load(Ordering::Relaxed), 1);
    assert!(!submitter.is_in_flight());
}

#[test]
fn validation_failure_never_reaches_the_transport() {
    let submitter = EvaluationSubmitter::new(FakeApi::default());
    let mut state = ready_state();
    state.selected_models.clear();

    let state = submitter.submit(state);

    assert!(!state.in_progress);
    assert_eq!(
        state.submit_failure,
        Some(SubmitFailure::Validation(SubmitError::NoModels))
    );
    assert_eq!(submitter.api().evaluate_calls.load(Ordering::Relaxed), 0);
    assert!(!submitter.is_in_flight());
}

#[test]
fn transport_failure_is_surfaced_and_clears_flag() {
    let submitter = EvaluationSubmitter::new(FakeApi {
        fail_with: Some((500, "Evaluation was terminated early due to an error".to_string())),
        ..FakeApi::default()
    });

    let state = submitter.submit(ready_state());

    assert!(!state.in_progress);
    assert!(state.report.is_none());
    match &state.submit_failure {
        Some(SubmitFailure::Transport(message)) => {
            assert!(message.contains("terminated early"));
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert!(!submitter.is_in_flight());
}

#[test]
fn a_new_submit_clears_the_previous_failure() {
    let submitter = EvaluationSubmitter::new(FakeApi::default());
    let mut state = ready_state();
    state.selected_models.clear();
    let state = submitter.submit(state);
    assert!(state.submit_failure.is_some());

    let state = reduce(
        state,
        Action::SetModel {
            model: "gpt-4".to_string(),
            selected: true,
        },
    );
    let state = submitter.submit(state);

    assert!(state.submit_failure.is_none());
    assert!(state.report.is_some());
}

#[test]
fn single_flight_hands_out_one_guard_at_a_time() {
    let flight = SingleFlight::default();

    let guard = flight.try_begin().expect("first holder");
    assert!(flight.is_busy());
    assert!(flight.try_begin().is_none());

    drop(guard);
    assert!(!flight.is_busy());
    assert!(flight.try_begin().is_some());
}

struct ReentrantApi {
    submitter: OnceLock<Weak<EvaluationSubmitter<ReentrantApi>>>,
    nested: Mutex<Option<ConsoleState>>,
}

impl ConsoleApi for ReentrantApi {
    fn get_config(&self) -> Result<FrontendConfig, ApiError> {
        Ok(all_flags())
    }

    fn get_supported_models(&self) -> Result<Vec<String>, ApiError> {
        Ok(Vec::new())
    }

    fn generate_data(&self, _request: &GenerateDataRequest) -> Result<Vec<u8>, ApiError> {
        Ok(Vec::new())
    }

    fn evaluate(&self, _payload: &EvaluationPayload) -> Result<ReportArtifact, ApiError> {
        if let Some(submitter) = self.submitter.get().and_then(Weak::upgrade) {
            assert!(submitter.is_in_flight());
            let nested = submitter.submit(ready_state());
            *self.nested.lock().expect("nested lock") = Some(nested);
        }
        Ok(ReportArtifact {
            content: b"report".to_vec(),
            content_type: None,
        })
    }
}

#[test]
fn second_submit_is_refused_while_one_is_in_flight() {
    let submitter = Arc::new(EvaluationSubmitter::new(ReentrantApi {
        submitter: OnceLock::new(),
        nested: Mutex::new(None),
    }));
    submitter
        .api()
        .submitter
        .set(Arc::downgrade(&submitter))
        .expect("submitter handle set once");

    let outer = submitter.submit(ready_state());

    let nested = submitter
        .api()
        .nested
        .lock()
        .expect("nested lock")
        .take()
        .expect("nested submit attempted");
    assert_eq!(
        nested.submit_failure,
        Some(SubmitFailure::Validation(SubmitError::AlreadyInProgress))
    );
    assert!(nested.report.is_none());

    assert!(outer.report.is_some());
    assert!(!outer.in_progress);
    assert!(!submitter.is_in_flight());
}

#[test]
fn metric_rule_messages_keep_console_wording() {
    assert_eq!(
        SubmitError::NoModelGradedMetric.to_string(),
        "Please select at least one RAG Evaluation metric to evaluate"
    );
    assert_eq!(
        SubmitError::NoStatisticalMetric.to_string(),
        "Please select at least one Statistical metric to evaluate"
    );
}
