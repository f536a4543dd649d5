use std::process::Command;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response, multipart};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::cli::ApiArgs;
use crate::error::ApiError;
use crate::model::{FrontendConfig, GenerateDataRequest, ReportArtifact};
use crate::request::EvaluationPayload;

pub const DEFAULT_API_URL: &str = "http://localhost:50505";
pub const DEFAULT_TIMEOUT_MS: u64 = 600_000;
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

pub trait ConsoleApi {
    fn get_config(&self) -> Result<FrontendConfig, ApiError>;
    fn get_supported_models(&self) -> Result<Vec<String>, ApiError>;
    fn generate_data(&self, request: &GenerateDataRequest) -> Result<Vec<u8>, ApiError>;
    fn evaluate(&self, payload: &EvaluationPayload) -> Result<ReportArtifact, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Anonymous,
    Static(String),
    Command(String),
}

impl TokenSource {
    pub fn acquire(&self) -> Result<Option<String>, ApiError> {
        match self {
            Self::Anonymous => Ok(None),
            Self::Static(token) => Ok(Some(token.clone())),
            Self::Command(command) => run_token_command(command).map(Some),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: TokenSource,
    pub timeout_ms: u64,
}

impl ApiConfig {
    pub fn resolve(args: &ApiArgs) -> Result<Self, ApiError> {
        Self::resolve_with(args, |key| std::env::var(key).ok())
    }

    fn resolve_with(
        args: &ApiArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ApiError> {
        let non_empty = |value: Option<String>| value.filter(|value| !value.trim().is_empty());

        let base_url = non_empty(args.api_url.clone())
            .or_else(|| non_empty(env("RAGEVAL_API_URL")))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_ms = match args.timeout_ms {
            Some(value) => value,
            None => match non_empty(env("RAGEVAL_TIMEOUT_MS")) {
                Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                    ApiError::Config(format!("RAGEVAL_TIMEOUT_MS is not a number: {raw}"))
                })?,
                None => DEFAULT_TIMEOUT_MS,
            },
        };

        let token = if let Some(token) = non_empty(args.token.clone()) {
            TokenSource::Static(token)
        } else if let Some(command) = non_empty(args.token_command.clone()) {
            TokenSource::Command(command)
        } else if let Some(token) = non_empty(env("RAGEVAL_API_TOKEN")) {
            TokenSource::Static(token)
        } else if let Some(command) = non_empty(env("RAGEVAL_TOKEN_COMMAND")) {
            TokenSource::Command(command)
        } else {
            TokenSource::Anonymous
        };

        Ok(Self {
            base_url: normalize_base_url(&base_url),
            token,
            timeout_ms,
        })
    }
}

pub struct HttpConsoleApi {
    config: ApiConfig,
    http: Client,
}

impl std::fmt::Debug for HttpConsoleApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConsoleApi")
            .field("base_url", &self.config.base_url)
            .field("timeout_ms", &self.config.timeout_ms)
            .finish_non_exhaustive()
    }
}

impl HttpConsoleApi {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        Ok(match self.config.token.acquire()? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    fn send(&self, endpoint: &'static str, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(request)?.send()?;
        let status = response.status();
        debug!(endpoint, status = status.as_u16(), "api response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(ApiError::Status {
            endpoint,
            status: status.as_u16(),
            message: error_message(&body).unwrap_or_else(|| status.to_string()),
        })
    }
}

impl ConsoleApi for HttpConsoleApi {
    fn get_config(&self) -> Result<FrontendConfig, ApiError> {
        let response = self.send("/config", self.http.get(self.url("/config")))?;
        Ok(response.json::<FrontendConfig>()?)
    }

    fn get_supported_models(&self) -> Result<Vec<String>, ApiError> {
        let response = self.send("/getmodels", self.http.get(self.url("/getmodels")))?;
        Ok(response.json::<Vec<String>>()?)
    }

    fn generate_data(&self, request: &GenerateDataRequest) -> Result<Vec<u8>, ApiError> {
        let response = self.send(
            "/generate",
            self.http.post(self.url("/generate")).json(request),
        )?;
        Ok(response.bytes()?.to_vec())
    }

    fn evaluate(&self, payload: &EvaluationPayload) -> Result<ReportArtifact, ApiError> {
        let dataset = multipart::Part::bytes(payload.content.clone())
            .file_name(payload.file_name.clone())
            .mime_str("application/jsonl")?;
        let form = multipart::Form::new()
            .part(crate::request::INPUT_DATA_PART, dataset)
            .text(
                crate::request::NUM_QUESTIONS_PART,
                payload.num_questions.clone(),
            )
            .text(crate::request::CONFIG_PART, payload.config_json.clone());

        let response = self.send(
            "/evaluate",
            self.http.post(self.url("/evaluate")).multipart(form),
        )?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);

        Ok(ReportArtifact {
            content: response.bytes()?.to_vec(),
            content_type,
        })
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let field = value
            .get("error")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("message").and_then(|v| v.as_str()));
        if let Some(message) = field {
            return Some(message.to_string());
        }
    }

    Some(trimmed.chars().take(ERROR_BODY_PREVIEW_CHARS).collect())
}

fn run_token_command(command: &str) -> Result<String, ApiError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|err| ApiError::Token(format!("failed to run token command: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ApiError::Token(format!(
            "token command exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ApiError::Token("token command printed nothing".to_string()));
    }
    Ok(token)
}
