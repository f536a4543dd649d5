use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::{Gpt4vInput, RetrievalMode, TargetOverrides, VectorField};

#[derive(Parser, Debug)]
#[command(
    name = "rag-eval-console",
    version,
    about = "Prepare datasets and run RAG evaluation jobs against the evaluation API"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the feature flags the backend exposes.
    Config(ConfigArgs),
    /// List the models the backend can evaluate.
    Models(ModelsArgs),
    /// List the metrics an evaluation job can request.
    Metrics(MetricsArgs),
    /// Validate a JSONL dataset and print a preview.
    Preview(PreviewArgs),
    /// Ask the backend to generate a question/truth dataset.
    Generate(GenerateArgs),
    /// Submit an evaluation job and download the report.
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ApiArgs {
    /// Base URL of the evaluation API [env: RAGEVAL_API_URL].
    #[arg(long)]
    pub api_url: Option<String>,

    /// Bearer token sent with every request [env: RAGEVAL_API_TOKEN].
    #[arg(long)]
    pub token: Option<String>,

    /// Shell command whose stdout is the bearer token [env: RAGEVAL_TOKEN_COMMAND].
    #[arg(long)]
    pub token_command: Option<String>,

    /// HTTP timeout in milliseconds [env: RAGEVAL_TIMEOUT_MS].
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub api: ApiArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ModelsArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    /// Print the catalog as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum IngestMode {
    /// Every row needs non-empty `question` and `truth` fields.
    Strict,
    /// Any JSON object is accepted.
    Lenient,
}

impl IngestMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long, value_enum, default_value_t = IngestMode::Strict)]
    pub mode: IngestMode,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    #[arg(long, default_value_t = 1)]
    pub num_questions: u32,

    #[arg(long, default_value_t = 5)]
    pub per_source: u32,

    #[arg(long, default_value = "generated_data.jsonl")]
    pub output: PathBuf,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    /// JSONL dataset with `question` and `truth` on every row.
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Model to evaluate; repeat to compare. Defaults to the first supported model.
    #[arg(long = "model")]
    pub models: Vec<String>,

    /// Metric to request; repeat for more. Defaults to every metric.
    #[arg(long = "metric")]
    pub metrics: Vec<String>,

    /// Treat model-graded and statistical metrics as one list.
    #[arg(long, default_value_t = false)]
    pub merged_metrics: bool,

    #[arg(long)]
    pub num_questions: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub no_red_teaming: bool,

    #[arg(long, default_value_t = 3)]
    pub top: u32,

    #[arg(long, default_value_t = 0.3)]
    pub temperature: f64,

    #[arg(long, default_value_t = 0.0)]
    pub minimum_reranker_score: f64,

    #[arg(long, default_value_t = 0.0)]
    pub minimum_search_score: f64,

    #[arg(long, value_enum, default_value_t = RetrievalMode::Hybrid)]
    pub retrieval_mode: RetrievalMode,

    #[arg(long, default_value_t = false)]
    pub no_semantic_ranker: bool,

    #[arg(long, default_value_t = false)]
    pub semantic_captions: bool,

    #[arg(long, default_value_t = false)]
    pub suggest_followup_questions: bool,

    #[arg(long, default_value_t = false)]
    pub use_oid_security_filter: bool,

    #[arg(long, default_value_t = false)]
    pub use_groups_security_filter: bool,

    #[arg(long = "vector-field", value_enum)]
    pub vector_fields: Vec<VectorField>,

    #[arg(long, default_value_t = false)]
    pub use_gpt4v: bool,

    #[arg(long, value_enum, default_value_t = Gpt4vInput::TextAndImages)]
    pub gpt4v_input: Gpt4vInput,

    #[arg(long, default_value = "evaluation_report.pdf")]
    pub output: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

impl EvaluateArgs {
    pub fn overrides(&self) -> TargetOverrides {
        let vector_fields = if self.vector_fields.is_empty() {
            TargetOverrides::default().vector_fields
        } else {
            self.vector_fields.clone()
        };

        TargetOverrides {
            top: self.top,
            temperature: self.temperature,
            minimum_reranker_score: self.minimum_reranker_score,
            minimum_search_score: self.minimum_search_score,
            retrieval_mode: self.retrieval_mode,
            semantic_ranker: !self.no_semantic_ranker,
            semantic_captions: self.semantic_captions,
            suggest_followup_questions: self.suggest_followup_questions,
            use_oid_security_filter: self.use_oid_security_filter,
            use_groups_security_filter: self.use_groups_security_filter,
            vector_fields,
            use_gpt4v: self.use_gpt4v,
            gpt4v_input: self.gpt4v_input,
        }
    }
}
