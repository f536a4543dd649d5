use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{IngestMode, PreviewArgs};
use crate::dataset::{
    EvaluationRecord, LineError, LoadedDataset, PREVIEW_FIELDS, PREVIEW_ROW_LIMIT, load_dataset,
};

const PREVIEW_CELL_MAX_CHARS: usize = 80;

#[derive(Debug, Serialize)]
struct PreviewReport<'a> {
    file_name: &'a str,
    mode: &'static str,
    sha256: &'a str,
    count: usize,
    truncated: bool,
    preview: &'a [EvaluationRecord],
    errors: &'a [LineError],
}

pub fn run(args: PreviewArgs) -> Result<()> {
    let dataset = load_dataset(&args.file, args.mode)
        .with_context(|| format!("failed to ingest {}", args.file.display()))?;

    log_ingestion(&dataset, args.mode);
    write_preview(&dataset, args.mode, args.json)
}

pub(crate) fn log_ingestion(dataset: &LoadedDataset, mode: IngestMode) {
    info!(
        file = %dataset.file_name,
        mode = mode.as_str(),
        records = dataset.result.count(),
        errors = dataset.result.errors().len(),
        "dataset ingested"
    );
    for error in dataset.result.errors() {
        warn!(line = error.line, detail = %error.detail, "{}", error.message);
    }
}

pub(crate) fn write_preview(dataset: &LoadedDataset, mode: IngestMode, json: bool) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    if json {
        let report = PreviewReport {
            file_name: &dataset.file_name,
            mode: mode.as_str(),
            sha256: &dataset.sha256,
            count: dataset.result.count(),
            truncated: dataset.result.is_truncated(),
            preview: dataset.result.preview(),
            errors: dataset.result.errors(),
        };
        serde_json::to_writer_pretty(&mut output, &report)
            .context("failed to serialize preview json output")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    render_text(&mut output, dataset, mode)?;
    output.flush()?;
    Ok(())
}

fn render_text(output: &mut impl Write, dataset: &LoadedDataset, mode: IngestMode) -> Result<()> {
    let result = &dataset.result;

    writeln!(output, "File: {} ({})", dataset.file_name, mode.as_str())?;
    writeln!(output, "The file you use contains {} lines", result.count())?;

    if !result.preview().is_empty() {
        if result.is_truncated() {
            writeln!(output, "Data Preview (only showing the first {PREVIEW_ROW_LIMIT} lines)")?;
        } else {
            writeln!(output, "Data Preview")?;
        }

        match mode {
            IngestMode::Strict => {
                writeln!(output, "line\t{}", PREVIEW_FIELDS.join("\t"))?;
                for record in result.preview() {
                    let cells: Vec<String> = PREVIEW_FIELDS
                        .iter()
                        .map(|field| preview_cell(&record.field_text(field)))
                        .collect();
                    writeln!(output, "{}\t{}", record.source_line, cells.join("\t"))?;
                }
            }
            IngestMode::Lenient => {
                for record in result.preview() {
                    let raw = serde_json::Value::Object(record.fields.clone()).to_string();
                    writeln!(output, "{}\t{}", record.source_line, preview_cell(&raw))?;
                }
            }
        }
    }

    if !result.errors().is_empty() {
        writeln!(output, "Errors: {}", result.errors().len())?;
        for error in result.errors() {
            writeln!(output, "\t{error}")?;
        }
    }

    Ok(())
}

fn preview_cell(text: &str) -> String {
    let condensed = text.split_whitespace().collect::<Vec<&str>>().join(" ");
    if condensed.chars().count() <= PREVIEW_CELL_MAX_CHARS {
        return condensed;
    }
    let mut clipped: String = condensed.chars().take(PREVIEW_CELL_MAX_CHARS - 3).collect();
    clipped.push_str("...");
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ingest_bytes;

    fn render(content: &str, mode: IngestMode) -> String {
        let dataset =
            ingest_bytes("eval.jsonl", content.as_bytes().to_vec(), mode).expect("dataset");
        let mut buffer = Vec::new();
        render_text(&mut buffer, &dataset, mode).expect("render");
        String::from_utf8(buffer).expect("utf8 output")
    }

    #[test]
    fn text_preview_reports_true_count_and_caps_rows() {
        let content: String = (0..12)
            .map(|index| format!("{{\"question\":\"q{index}\",\"truth\":\"t{index}\"}}\n"))
            .collect();

        let text = render(&content, IngestMode::Strict);

        assert!(text.contains("The file you use contains 12 lines"));
        assert!(text.contains("only showing the first 10 lines"));
        assert!(text.contains("10\tq9\tt9"));
        assert!(!text.contains("q10"));
    }

    #[test]
    fn text_preview_lists_line_errors() {
        let text = render("{\"question\":\"a\",\"truth\":\"b\"}\noops\n", IngestMode::Strict);

        assert!(text.contains("Errors: 1"));
        assert!(text.contains("Error in parsing line 2"));
    }

    #[test]
    fn preview_cell_condenses_and_clips() {
        assert_eq!(preview_cell("a\n  b\tc"), "a b c");

        let long = "x".repeat(200);
        let clipped = preview_cell(&long);
        assert_eq!(clipped.chars().count(), PREVIEW_CELL_MAX_CHARS);
        assert!(clipped.ends_with("..."));
    }
}
