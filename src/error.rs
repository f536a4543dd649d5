use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("the file must be a JSONL file: {file_name}")]
    WrongFileType { file_name: String },

    #[error("failed to read dataset {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Please upload a file to evaluate")]
    MissingDataset,

    #[error("Please select at least one RAG Evaluation metric to evaluate")]
    NoModelGradedMetric,

    #[error("Please select at least one Statistical metric to evaluate")]
    NoStatisticalMetric,

    #[error("Please select at least one metric to evaluate")]
    NoMetric,

    #[error("Please enter the number of questions you want to evaluate")]
    ZeroQuestions,

    #[error("Please select at least one model to evaluate")]
    NoModels,

    #[error("an evaluation is already in progress")]
    AlreadyInProgress,

    #[error("failed to encode evaluation config: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("Please enter the number of questions you want to generate")]
    ZeroQuestions,

    #[error("Please enter the number of questions per source")]
    ZeroPerSource,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid api configuration: {0}")]
    Config(String),

    #[error("token acquisition failed: {0}")]
    Token(String),

    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: &'static str,
        status: u16,
        message: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
