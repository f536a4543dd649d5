use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cli::IngestMode;
use crate::error::DatasetError;
use crate::util::sha256_hex;

pub const JSONL_EXTENSION: &str = "jsonl";
pub const PREVIEW_ROW_LIMIT: usize = 10;
pub const PREVIEW_FIELDS: [&str; 2] = ["question", "truth"];

impl IngestMode {
    fn line_error_prefix(self) -> &'static str {
        match self {
            Self::Strict => "Error in parsing line",
            Self::Lenient => "Error parsing line",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub source_line: usize,
    pub fields: Map<String, Value>,
}

impl EvaluationRecord {
    pub fn field_text(&self, key: &str) -> String {
        match self.fields.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(value) => value.to_string(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineErrorKind {
    InvalidJson,
    NotAnObject,
    MissingFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineError {
    pub line: usize,
    pub kind: LineErrorKind,
    pub message: String,
    pub detail: String,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionResult {
    records: Vec<EvaluationRecord>,
    errors: Vec<LineError>,
}

impl IngestionResult {
    #[cfg(test)]
    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn errors(&self) -> &[LineError] {
        &self.errors
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn preview(&self) -> &[EvaluationRecord] {
        &self.records[..self.records.len().min(PREVIEW_ROW_LIMIT)]
    }

    pub fn is_truncated(&self) -> bool {
        self.records.len() > PREVIEW_ROW_LIMIT
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub file_name: String,
    pub content: Vec<u8>,
    pub sha256: String,
    pub result: IngestionResult,
}

pub fn ingest_text(content: &str, mode: IngestMode) -> IngestionResult {
    let mut result = IngestionResult::default();

    for (index, line) in content.split('\n').enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let source_line = index + 1;
        match parse_line(line, mode) {
            Ok(fields) => result.records.push(EvaluationRecord {
                source_line,
                fields,
            }),
            Err((kind, detail)) => result.errors.push(LineError {
                line: source_line,
                kind,
                message: format!("{} {source_line}", mode.line_error_prefix()),
                detail,
            }),
        }
    }

    result
}

pub fn has_jsonl_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(JSONL_EXTENSION))
        .unwrap_or(false)
}

pub fn load_dataset(path: &Path, mode: IngestMode) -> Result<LoadedDataset, DatasetError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    ensure_jsonl(&file_name)?;

    let content = fs::read(path).map_err(|source| DatasetError::Read {
        path: path.display().to_string(),
        source,
    })?;

    Ok(ingest_loaded(file_name, content, mode))
}

pub fn ingest_bytes(
    file_name: impl Into<String>,
    content: Vec<u8>,
    mode: IngestMode,
) -> Result<LoadedDataset, DatasetError> {
    let file_name = file_name.into();
    ensure_jsonl(&file_name)?;
    Ok(ingest_loaded(file_name, content, mode))
}

fn ensure_jsonl(file_name: &str) -> Result<(), DatasetError> {
    if has_jsonl_extension(file_name) {
        Ok(())
    } else {
        Err(DatasetError::WrongFileType {
            file_name: file_name.to_string(),
        })
    }
}

fn ingest_loaded(file_name: String, content: Vec<u8>, mode: IngestMode) -> LoadedDataset {
    let result = ingest_text(&String::from_utf8_lossy(&content), mode);
    let sha256 = sha256_hex(&content);

    LoadedDataset {
        file_name,
        content,
        sha256,
        result,
    }
}

fn parse_line(
    line: &str,
    mode: IngestMode,
) -> std::result::Result<Map<String, Value>, (LineErrorKind, String)> {
    let value: Value =
        serde_json::from_str(line).map_err(|err| (LineErrorKind::InvalidJson, err.to_string()))?;

    let fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err((
                LineErrorKind::NotAnObject,
                format!("expected a JSON object, found {}", json_type_name(&other)),
            ));
        }
    };

    if mode == IngestMode::Strict {
        let missing: Vec<&str> = PREVIEW_FIELDS
            .iter()
            .copied()
            .filter(|key| !fields.get(*key).is_some_and(is_truthy))
            .collect();
        if !missing.is_empty() {
            return Err((
                LineErrorKind::MissingFields,
                format!("missing or empty fields: {}", missing.join(", ")),
            ));
        }
    }

    Ok(fields)
}

// null, false, 0, NaN and "" are falsy; containers are always truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number
            .as_f64()
            .is_some_and(|number| number != 0.0 && !number.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
