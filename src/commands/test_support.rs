use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::api::ConsoleApi;
use crate::error::ApiError;
use crate::model::{FrontendConfig, GenerateDataRequest, ReportArtifact};
use crate::request::EvaluationPayload;

pub(crate) const REPORT_BYTES: &[u8] = b"%PDF-1.7 report";

pub(crate) struct ScriptedApi {
    pub flags: FrontendConfig,
    pub models: Vec<String>,
    pub generated: Vec<u8>,
    pub generate_failure: Option<(u16, String)>,
    pub evaluate_failure: Option<(u16, String)>,
    pub generate_calls: AtomicUsize,
    pub evaluate_calls: AtomicUsize,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self {
            flags: FrontendConfig {
                show_gpt4v_options: true,
                show_semantic_ranker_option: true,
                show_vector_option: true,
                ..FrontendConfig::default()
            },
            models: vec!["gpt-4o".to_string()],
            generated: Vec::new(),
            generate_failure: None,
            evaluate_failure: None,
            generate_calls: AtomicUsize::new(0),
            evaluate_calls: AtomicUsize::new(0),
        }
    }
}

fn status_error(endpoint: &'static str, failure: &(u16, String)) -> ApiError {
    ApiError::Status {
        endpoint,
        status: failure.0,
        message: failure.1.clone(),
    }
}

impl ConsoleApi for ScriptedApi {
    fn get_config(&self) -> Result<FrontendConfig, ApiError> {
        Ok(self.flags.clone())
    }

    fn get_supported_models(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.models.clone())
    }

    fn generate_data(&self, _request: &GenerateDataRequest) -> Result<Vec<u8>, ApiError> {
        self.generate_calls.fetch_add(1, Ordering::Relaxed);
        match &self.generate_failure {
            Some(failure) => Err(status_error("/generate", failure)),
            None => Ok(self.generated.clone()),
        }
    }

    fn evaluate(&self, _payload: &EvaluationPayload) -> Result<ReportArtifact, ApiError> {
        self.evaluate_calls.fetch_add(1, Ordering::Relaxed);
        match &self.evaluate_failure {
            Some(failure) => Err(status_error("/evaluate", failure)),
            None => Ok(ReportArtifact {
                content: REPORT_BYTES.to_vec(),
                content_type: Some("application/pdf".to_string()),
            }),
        }
    }
}

pub(crate) fn jsonl_rows(rows: usize) -> String {
    (0..rows)
        .map(|index| format!("{{\"question\":\"q{index}\",\"truth\":\"t{index}\"}}\n"))
        .collect()
}

pub(crate) fn write_dataset(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("eval.jsonl");
    std::fs::write(&path, jsonl_rows(rows)).expect("write dataset");
    path
}
