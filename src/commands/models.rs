use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::ConsoleApi;
use crate::cli::ModelsArgs;

pub fn run(args: ModelsArgs) -> Result<()> {
    let api = super::connect(&args.api)?;
    let models = api
        .get_supported_models()
        .context("failed to load supported models")?;

    if models.is_empty() {
        warn!("backend reported no supported models");
    } else {
        info!(count = models.len(), default = %models[0], "loaded supported models");
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &models)
            .context("failed to serialize models json output")?;
        writeln!(output)?;
    } else {
        for (index, model) in models.iter().enumerate() {
            let marker = if index == 0 { "*" } else { " " };
            writeln!(output, "{marker} {model}")?;
        }
    }
    output.flush()?;
    Ok(())
}
