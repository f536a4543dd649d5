use crate::dataset::LoadedDataset;
use crate::error::SubmitError;
use crate::model::{FrontendConfig, ReportArtifact, TargetOverrides};

use super::metrics::{MetricGroup, find_metric, metric_names};

const DEFAULT_QUESTIONS_TO_EVAL: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricSelection {
    Split {
        model_graded: Vec<String>,
        statistical: Vec<String>,
    },
    Merged(Vec<String>),
}

impl MetricSelection {
    pub fn all(merged: bool) -> Self {
        let model_graded = metric_names(MetricGroup::ModelGraded);
        let statistical = metric_names(MetricGroup::Statistical);
        if merged {
            Self::Merged(model_graded.into_iter().chain(statistical).collect())
        } else {
            Self::Split {
                model_graded,
                statistical,
            }
        }
    }

    pub fn empty(merged: bool) -> Self {
        if merged {
            Self::Merged(Vec::new())
        } else {
            Self::Split {
                model_graded: Vec::new(),
                statistical: Vec::new(),
            }
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged(_))
    }

    pub fn requested(&self) -> Vec<String> {
        match self {
            Self::Split {
                model_graded,
                statistical,
            } => model_graded.iter().chain(statistical).cloned().collect(),
            Self::Merged(metrics) => metrics.clone(),
        }
    }

    pub fn set(&mut self, name: &str, selected: bool) -> bool {
        let Some(metric) = find_metric(name) else {
            return false;
        };

        let list = match self {
            Self::Split {
                model_graded,
                statistical,
            } => match metric.group {
                MetricGroup::ModelGraded => model_graded,
                MetricGroup::Statistical => statistical,
            },
            Self::Merged(metrics) => metrics,
        };
        set_membership(list, name, selected);
        true
    }

    pub fn minimum_questions(&self) -> usize {
        match self {
            Self::Split { .. } => 2,
            Self::Merged(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionBounds {
    pub min: usize,
    pub max: usize,
}

impl QuestionBounds {
    // Zero is kept so the submit check can report it.
    pub fn clamp(self, requested: usize) -> usize {
        if requested == 0 {
            return 0;
        }
        requested.max(self.min).min(self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    Validation(SubmitError),
    Transport(String),
}

impl SubmitFailure {
    pub fn message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Transport(message) => format!("evaluation request failed: {message}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleState {
    pub flags: FrontendConfig,
    pub available_models: Vec<String>,
    pub selected_models: Vec<String>,
    pub dataset: Option<LoadedDataset>,
    pub dataset_error: Option<String>,
    pub metrics: MetricSelection,
    pub questions_to_eval: usize,
    pub overrides: TargetOverrides,
    pub adjusted_overrides: Vec<&'static str>,
    pub run_red_teaming: bool,
    pub in_progress: bool,
    pub submit_failure: Option<SubmitFailure>,
    pub report: Option<ReportArtifact>,
}

impl ConsoleState {
    pub fn new(merged_metrics: bool) -> Self {
        Self {
            flags: FrontendConfig::default(),
            available_models: Vec::new(),
            selected_models: Vec::new(),
            dataset: None,
            dataset_error: None,
            metrics: MetricSelection::all(merged_metrics),
            questions_to_eval: DEFAULT_QUESTIONS_TO_EVAL,
            overrides: TargetOverrides::default(),
            adjusted_overrides: Vec::new(),
            run_red_teaming: true,
            in_progress: false,
            submit_failure: None,
            report: None,
        }
    }

    pub fn dataset_count(&self) -> Option<usize> {
        self.dataset.as_ref().map(|dataset| dataset.result.count())
    }

    pub fn question_bounds(&self) -> Option<QuestionBounds> {
        self.dataset_count().map(|max| QuestionBounds {
            min: self.metrics.minimum_questions(),
            max,
        })
    }
}

impl Default for ConsoleState {
    fn default() -> Self {
        Self::new(false)
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    ConfigLoaded(FrontendConfig),
    ModelsLoaded(Vec<String>),
    SetModel { model: String, selected: bool },
    SetMetric { name: String, selected: bool },
    ReplaceMetrics(MetricSelection),
    DatasetLoaded(LoadedDataset),
    DatasetRejected(String),
    SetQuestionsToEval(usize),
    SetOverrides(TargetOverrides),
    SetRedTeaming(bool),
    SubmitStarted,
    // Refused before starting; the running submission keeps its flag.
    SubmitBlocked(SubmitError),
    SubmitRejected(SubmitError),
    SubmitSucceeded(ReportArtifact),
    SubmitFailed(String),
}

pub fn reduce(mut state: ConsoleState, action: Action) -> ConsoleState {
    match action {
        Action::ConfigLoaded(flags) => {
            state.overrides.semantic_ranker = flags.show_semantic_ranker_option;
            state.adjusted_overrides = state.overrides.constrain_to(&flags);
            state.flags = flags;
        }
        Action::ModelsLoaded(models) => {
            state.selected_models = models.first().cloned().into_iter().collect();
            state.available_models = models;
        }
        Action::SetModel { model, selected } => {
            set_membership(&mut state.selected_models, &model, selected);
        }
        Action::SetMetric { name, selected } => {
            state.metrics.set(&name, selected);
        }
        Action::ReplaceMetrics(metrics) => {
            state.metrics = metrics;
            state.questions_to_eval = clamp_questions(&state, state.questions_to_eval);
        }
        Action::DatasetLoaded(dataset) => {
            state.dataset = Some(dataset);
            state.dataset_error = None;
            state.questions_to_eval = clamp_questions(&state, state.questions_to_eval);
        }
        Action::DatasetRejected(message) => {
            state.dataset = None;
            state.dataset_error = Some(message);
        }
        Action::SetQuestionsToEval(requested) => {
            state.questions_to_eval = clamp_questions(&state, requested);
        }
        Action::SetOverrides(mut overrides) => {
            state.adjusted_overrides = overrides.constrain_to(&state.flags);
            state.overrides = overrides;
        }
        Action::SetRedTeaming(enabled) => {
            state.run_red_teaming = enabled;
        }
        Action::SubmitStarted => {
            state.in_progress = true;
            state.submit_failure = None;
            state.report = None;
        }
        Action::SubmitBlocked(err) => {
            state.submit_failure = Some(SubmitFailure::Validation(err));
        }
        Action::SubmitRejected(err) => {
            state.in_progress = false;
            state.submit_failure = Some(SubmitFailure::Validation(err));
        }
        Action::SubmitSucceeded(report) => {
            state.in_progress = false;
            state.report = Some(report);
        }
        Action::SubmitFailed(message) => {
            state.in_progress = false;
            state.submit_failure = Some(SubmitFailure::Transport(message));
        }
    }

    state
}

fn clamp_questions(state: &ConsoleState, requested: usize) -> usize {
    match state.question_bounds() {
        Some(bounds) => bounds.clamp(requested),
        None => requested,
    }
}

fn set_membership(list: &mut Vec<String>, name: &str, selected: bool) {
    let present = list.iter().any(|existing| existing == name);
    if selected && !present {
        list.push(name.to_string());
    } else if !selected {
        list.retain(|existing| existing != name);
    }
}
