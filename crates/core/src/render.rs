//! Deterministic projections of a frozen snapshot.
//!
//! Rendering reads nothing but the [`Snapshot`] it is given: no live entity
//! state, no other records, no clock. The same snapshot and format always
//! yield the same bytes.

use std::fmt;
use std::str::FromStr;

use chrono::SecondsFormat;
use serde_json::{json, Value};

use crate::canonical;
use crate::error::CoreError;
use crate::snapshot::Snapshot;

// ---------------------------------------------------------------------------
// Output formats
// ---------------------------------------------------------------------------

/// Supported projection formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Canonical JSON envelope: identity, provenance and the full payload.
    Json,
    /// One `path,value` row per leaf of the payload.
    Csv,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(CoreError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// The bytes of a projection plus how to label them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub format: OutputFormat,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Project `snapshot` into `format`.
pub fn render(snapshot: &Snapshot, format: OutputFormat) -> RenderedOutput {
    let bytes = match format {
        OutputFormat::Json => render_json(snapshot),
        OutputFormat::Csv => render_csv(&snapshot.data),
    };
    RenderedOutput {
        format,
        content_type: format.content_type(),
        bytes,
    }
}

fn render_json(snapshot: &Snapshot) -> Vec<u8> {
    let envelope = json!({
        "entity_type": snapshot.entity_type.as_str(),
        "entity_id": snapshot.entity_id,
        "version": snapshot.version,
        "generated_by": snapshot.generated_by,
        "generated_at": snapshot
            .generated_at
            .to_rfc3339_opts(SecondsFormat::Micros, true),
        "data_checksum": snapshot.data_checksum,
        "pdf_checksum": snapshot.pdf_checksum,
        "data": snapshot.data,
    });
    canonical::to_canonical_bytes(&envelope)
}

fn render_csv(data: &Value) -> Vec<u8> {
    let mut rows = Vec::new();
    flatten("$".to_string(), data, &mut rows);

    let mut out = String::from("path,value\r\n");
    for (path, value) in rows {
        out.push_str(&csv_field(&path));
        out.push(',');
        out.push_str(&csv_field(&value));
        out.push_str("\r\n");
    }
    out.into_bytes()
}

/// Walk `value` depth-first, objects in sorted key order, arrays by index.
fn flatten(path: String, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
            for key in keys {
                flatten(format!("{path}.{key}"), &map[key.as_str()], rows);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, item) in items.iter().enumerate() {
                flatten(format!("{path}[{i}]"), item, rows);
            }
        }
        Value::String(s) => rows.push((path, s.clone())),
        // Scalars and empty containers use their canonical JSON text.
        other => rows.push((path, canonical::to_canonical_string(other))),
    }
}

fn csv_field(field: &str) -> String {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
