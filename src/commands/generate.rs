use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::api::ConsoleApi;
use crate::cli::{GenerateArgs, IngestMode};
use crate::dataset::{LoadedDataset, has_jsonl_extension, ingest_bytes};
use crate::error::GenerateError;
use crate::model::GenerateDataRequest;
use crate::util::write_bytes;

use super::preview::{log_ingestion, write_preview};

pub fn run(args: GenerateArgs) -> Result<()> {
    let api = super::connect(&args.api)?;
    let dataset = generate_dataset(&api, &args)?;
    log_ingestion(&dataset, IngestMode::Strict);
    write_preview(&dataset, IngestMode::Strict, args.json)
}

fn generate_dataset(api: &impl ConsoleApi, args: &GenerateArgs) -> Result<LoadedDataset> {
    let request = generate_request(args.num_questions, args.per_source)?;

    let file_name = args
        .output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !has_jsonl_extension(&file_name) {
        bail!("generated data must be saved as a .jsonl file: {}", args.output.display());
    }

    info!(
        num_questions = request.num_questions,
        per_source = request.per_source,
        "generating data"
    );
    let content = match api.generate_data(&request) {
        Ok(content) => content,
        Err(err) => {
            warn!(error = %err, "generate request failed");
            return Err(err).context("Error in generating data");
        }
    };

    write_bytes(&args.output, &content)?;
    info!(path = %args.output.display(), bytes = content.len(), "wrote generated data");

    Ok(ingest_bytes(file_name, content, IngestMode::Strict)?)
}

fn generate_request(
    num_questions: u32,
    per_source: u32,
) -> std::result::Result<GenerateDataRequest, GenerateError> {
    if num_questions == 0 {
        return Err(GenerateError::ZeroQuestions);
    }
    if per_source == 0 {
        return Err(GenerateError::ZeroPerSource);
    }

    Ok(GenerateDataRequest {
        num_questions,
        per_source,
    })
}
