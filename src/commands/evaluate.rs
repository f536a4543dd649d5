use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::api::ConsoleApi;
use crate::cli::{EvaluateArgs, IngestMode};
use crate::dataset::load_dataset;
use crate::error::DatasetError;
use crate::model::{DatasetSummary, EvaluationRunManifest, TargetOverrides};
use crate::request::metrics::find_metric;
use crate::request::{Action, ConsoleState, EvaluationSubmitter, MetricSelection, build_job, reduce};
use crate::util::{now_utc_string, utc_compact_string, write_bytes, write_json_pretty};

use super::preview::log_ingestion;

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: EvaluateArgs) -> Result<()> {
    let api = super::connect(&args.api)?;
    let api_base_url = api.config().base_url.clone();
    run_with(api, &api_base_url, &args)
}

fn run_with<A: ConsoleApi>(api: A, api_base_url: &str, args: &EvaluateArgs) -> Result<()> {
    let started = Utc::now();
    let started_at = started.to_rfc3339_opts(SecondsFormat::Secs, true);
    let run_id = format!("eval-{}", utc_compact_string(started));
    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| default_manifest_path(&args.output));
    info!(run_id = %run_id, api = %api_base_url, "starting evaluation run");

    let mut state = ConsoleState::new(args.merged_metrics);
    let flags = api.get_config().context("failed to load backend config")?;
    state = reduce(state, Action::ConfigLoaded(flags));
    let models = api
        .get_supported_models()
        .context("failed to load supported models")?;
    state = reduce(state, Action::ModelsLoaded(models));

    let mut warnings = Vec::new();
    state = apply_selections(state, args, &mut warnings)?;

    info!(
        models = ?state.selected_models,
        metrics = ?state.metrics.requested(),
        merged_metrics = state.metrics.is_merged(),
        num_questions = state.questions_to_eval,
        red_teaming = state.run_red_teaming,
        "Running Evaluation..."
    );
    let submitter = EvaluationSubmitter::new(api);
    let state = submitter.submit(state);

    let mut report_path = None;
    let failure_reason = match (&state.report, &state.submit_failure) {
        (Some(report), _) => match write_bytes(&args.output, &report.content) {
            Ok(()) => {
                info!(
                    path = %args.output.display(),
                    bytes = report.content.len(),
                    content_type = %report.content_type.as_deref().unwrap_or("unknown"),
                    "wrote evaluation report"
                );
                report_path = Some(args.output.display().to_string());
                None
            }
            Err(err) => {
                warn!(error = %err, "failed to save evaluation report");
                Some(format!("{err:#}"))
            }
        },
        (None, Some(failure)) => Some(failure.message()),
        (None, None) => Some("evaluation finished without a report".to_string()),
    };

    let manifest = EvaluationRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        status: if failure_reason.is_none() {
            "completed".to_string()
        } else {
            "failed".to_string()
        },
        started_at,
        finished_at: now_utc_string(),
        api_base_url: api_base_url.to_string(),
        failure_reason: failure_reason.clone(),
        dataset: state.dataset.as_ref().map(|dataset| DatasetSummary {
            file_name: dataset.file_name.clone(),
            sha256: dataset.sha256.clone(),
            record_count: dataset.result.count(),
            line_error_count: dataset.result.errors().len(),
        }),
        num_questions: state.questions_to_eval,
        config: build_job(&state).ok().map(|job| job.config),
        report_path,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), status = %manifest.status, "wrote run manifest");

    if let Some(reason) = failure_reason {
        bail!(reason);
    }
    Ok(())
}

fn apply_selections(
    mut state: ConsoleState,
    args: &EvaluateArgs,
    warnings: &mut Vec<String>,
) -> Result<ConsoleState> {
    if !args.models.is_empty() {
        for model in state.selected_models.clone() {
            state = reduce(
                state,
                Action::SetModel {
                    model,
                    selected: false,
                },
            );
        }
        for model in &args.models {
            if !state.available_models.contains(model) {
                let message = format!("model {model} is not advertised by the backend");
                warn!("{message}");
                warnings.push(message);
            }
            state = reduce(
                state,
                Action::SetModel {
                    model: model.clone(),
                    selected: true,
                },
            );
        }
    }

    if !args.metrics.is_empty() {
        let unknown: Vec<&str> = args
            .metrics
            .iter()
            .filter(|name| find_metric(name).is_none())
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            bail!("unknown metric(s): {}", unknown.join(", "));
        }

        state = reduce(
            state,
            Action::ReplaceMetrics(MetricSelection::empty(args.merged_metrics)),
        );
        for name in &args.metrics {
            state = reduce(
                state,
                Action::SetMetric {
                    name: name.clone(),
                    selected: true,
                },
            );
        }
    }

    // Defaults the backend cannot honour are reset quietly; only explicit choices warn.
    let baseline = TargetOverrides::default().constrain_to(&state.flags);
    state = reduce(state, Action::SetOverrides(args.overrides()));
    for field in state
        .adjusted_overrides
        .iter()
        .filter(|field| !baseline.contains(*field))
    {
        let message = format!("override {field} is not supported by the backend and was reset");
        warn!("{message}");
        warnings.push(message);
    }
    state = reduce(state, Action::SetRedTeaming(!args.no_red_teaming));

    if let Some(path) = &args.dataset {
        match load_dataset(path, IngestMode::Strict) {
            Ok(dataset) => {
                log_ingestion(&dataset, IngestMode::Strict);
                state = reduce(state, Action::DatasetLoaded(dataset));
            }
            Err(err @ DatasetError::WrongFileType { .. }) => {
                let state = reduce(state, Action::DatasetRejected(err.to_string()));
                bail!(state.dataset_error.unwrap_or_default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to ingest {}", path.display()));
            }
        }
    }

    if let Some(requested) = args.num_questions {
        state = reduce(state, Action::SetQuestionsToEval(requested));
        if state.questions_to_eval != requested {
            let message = format!(
                "number of questions {requested} adjusted to {}",
                state.questions_to_eval
            );
            warn!("{message}");
            warnings.push(message);
        }
    }

    Ok(state)
}

fn default_manifest_path(report_path: &Path) -> PathBuf {
    report_path.with_extension("manifest.json")
}
