use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::api::ConsoleApi;
use crate::cli::ConfigArgs;

pub fn run(args: ConfigArgs) -> Result<()> {
    let api = super::connect(&args.api)?;
    let config = api.get_config().context("failed to load backend config")?;

    info!(
        gpt4v = config.show_gpt4v_options,
        semantic_ranker = config.show_semantic_ranker_option,
        vector = config.show_vector_option,
        current_model = %config.current_model.as_deref().unwrap_or_default(),
        "loaded backend config"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, &config)
        .context("failed to serialize config json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}
