use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionConfig {
    pub model_name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    #[serde(rename = "showGPT4VOptions")]
    pub show_gpt4v_options: bool,
    #[serde(rename = "showSemanticRankerOption")]
    pub show_semantic_ranker_option: bool,
    #[serde(rename = "showVectorOption")]
    pub show_vector_option: bool,
    #[serde(rename = "showUserUpload")]
    pub show_user_upload: bool,
    #[serde(rename = "showSpeechInput")]
    pub show_speech_input: bool,
    #[serde(rename = "showSpeechOutputBrowser")]
    pub show_speech_output_browser: bool,
    #[serde(rename = "showSpeechOutputAzure")]
    pub show_speech_output_azure: bool,
    #[serde(rename = "currentModel")]
    pub current_model: Option<String>,
    #[serde(rename = "protectionConfig")]
    pub protection_config: Option<BTreeMap<String, ProtectionConfig>>,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum RetrievalMode {
    #[default]
    Hybrid,
    Vectors,
    Text,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum Gpt4vInput {
    #[default]
    TextAndImages,
    Images,
    Texts,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum VectorField {
    Embedding,
    ImageEmbedding,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOverrides {
    pub top: u32,
    pub temperature: f64,
    pub minimum_reranker_score: f64,
    pub minimum_search_score: f64,
    pub retrieval_mode: RetrievalMode,
    pub semantic_ranker: bool,
    pub semantic_captions: bool,
    pub suggest_followup_questions: bool,
    pub use_oid_security_filter: bool,
    pub use_groups_security_filter: bool,
    pub vector_fields: Vec<VectorField>,
    pub use_gpt4v: bool,
    pub gpt4v_input: Gpt4vInput,
}

impl Default for TargetOverrides {
    fn default() -> Self {
        Self {
            top: 3,
            temperature: 0.3,
            minimum_reranker_score: 0.0,
            minimum_search_score: 0.0,
            retrieval_mode: RetrievalMode::Hybrid,
            semantic_ranker: true,
            semantic_captions: false,
            suggest_followup_questions: false,
            use_oid_security_filter: false,
            use_groups_security_filter: false,
            vector_fields: vec![VectorField::Embedding],
            use_gpt4v: false,
            gpt4v_input: Gpt4vInput::TextAndImages,
        }
    }
}

impl TargetOverrides {
    pub fn constrain_to(&mut self, flags: &FrontendConfig) -> Vec<&'static str> {
        let mut adjusted = Vec::new();

        if !flags.show_semantic_ranker_option {
            if self.semantic_ranker {
                self.semantic_ranker = false;
                adjusted.push("semantic_ranker");
            }
            if self.semantic_captions {
                self.semantic_captions = false;
                adjusted.push("semantic_captions");
            }
        }
        if !flags.show_vector_option && self.retrieval_mode != RetrievalMode::Text {
            self.retrieval_mode = RetrievalMode::Text;
            adjusted.push("retrieval_mode");
        }
        if !flags.show_gpt4v_options && self.use_gpt4v {
            self.use_gpt4v = false;
            adjusted.push("use_gpt4v");
        }

        adjusted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetParameters {
    pub overrides: TargetOverrides,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationJobConfig {
    pub requested_metrics: Vec<String>,
    pub compared_models: Vec<String>,
    pub run_red_teaming: bool,
    pub target_parameters: TargetParameters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateDataRequest {
    pub num_questions: u32,
    pub per_source: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub file_name: String,
    pub sha256: String,
    pub record_count: usize,
    pub line_error_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    pub api_base_url: String,
    pub failure_reason: Option<String>,
    pub dataset: Option<DatasetSummary>,
    pub num_questions: usize,
    pub config: Option<EvaluationJobConfig>,
    pub report_path: Option<String>,
    pub warnings: Vec<String>,
}
