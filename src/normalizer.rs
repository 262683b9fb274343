use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::domain::ExplorerError;

/// A record as found in a dataset document. Field names are whatever the
/// generator produced, order of appearance is kept.
pub type RawRecord = serde_json::Map<String, Value>;

// Below this many records the thread pool costs more than it saves.
const PARALLEL_THRESHOLD: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalColumn {
    pub key: String,
    pub title: String,
    pub visible: bool,
    pub order: usize,
    pub toggleable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRow {
    pub cells: Vec<String>,
}

impl CanonicalRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Where a fixed column takes its value from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSource {
    Field { name: String },
    YearRange { earliest: String, latest: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FixedColumn {
    pub key: String,
    pub title: String,
    pub source: ColumnSource,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

fn visible_by_default() -> bool {
    true
}

impl FixedColumn {
    pub fn field(key: &str, title: &str, name: &str, visible: bool) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            source: ColumnSource::Field {
                name: name.to_string(),
            },
            visible,
        }
    }

    pub fn year_range(key: &str, title: &str, earliest: &str, latest: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            source: ColumnSource::YearRange {
                earliest: earliest.to_string(),
                latest: latest.to_string(),
            },
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FixedSchema {
    pub columns: Vec<FixedColumn>,
}

impl FixedSchema {
    /// The column layout of the TANAP archive index.
    pub fn tanap() -> Self {
        Self {
            columns: vec![
                FixedColumn::field("id", "ID", "ID", true),
                FixedColumn::field("description", "DESCRIPTION", "DESCRIPTION", true),
                FixedColumn::field(
                    "folio_start",
                    "Start Folio",
                    "FOLIONUMBER (START OF DOCUMENT)",
                    false,
                ),
                FixedColumn::field(
                    "folio_end",
                    "End Folio",
                    "FOLIONUMBER (END OF DOCUMENT)",
                    false,
                ),
                FixedColumn::year_range(
                    "year_range",
                    "YEAR RANGE",
                    "YEAR (EARLIEST)",
                    "YEAR (LATEST)",
                ),
                FixedColumn::field("settlement", "SETTLEMENT", "SETTLEMENT", true),
                FixedColumn::field("location", "LOCATION", "LOCATION (TANAP)", true),
                FixedColumn::field(
                    "coverage",
                    "Geographical Coverage",
                    "GEOGRAPHICAL COVERAGE OF INV NUMBER",
                    false,
                ),
                FixedColumn::field(
                    "document_type",
                    "DOCUMENT TYPE",
                    "DOCUMENT TYPE (TANAP)",
                    true,
                ),
            ],
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ExplorerError> {
        let schema_error = |reason: String| ExplorerError::Schema {
            path: path.to_path_buf(),
            reason,
        };
        let body = fs::read_to_string(path).map_err(|e| schema_error(e.to_string()))?;
        let schema: FixedSchema =
            serde_json::from_str(&body).map_err(|e| schema_error(e.to_string()))?;
        if schema.columns.is_empty() {
            return Err(schema_error("no columns declared".into()));
        }
        let mut keys: Vec<&str> = schema.columns.iter().map(|c| c.key.as_str()).collect();
        keys.sort_unstable();
        if let Some(pair) = keys.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(schema_error(format!("duplicate column key '{}'", pair[0])));
        }
        Ok(schema)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SchemaConfig {
    /// Columns follow the keys of the first record.
    #[default]
    SchemaFree,
    Fixed(FixedSchema),
}

/// Renders a scalar for display. Absent and null become the empty string.
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Uppercased with runs of whitespace collapsed, used to match field names
/// that differ only in casing or spacing.
pub fn normalize_field_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Turns `snake_case` and `camelCase` keys into a readable title.
pub fn format_column_name(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    let mut previous: Option<char> = None;
    for chr in key.chars() {
        let chr = if chr == '_' { ' ' } else { chr };
        if chr.is_uppercase()
            && previous.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit())
        {
            spaced.push(' ');
        }
        spaced.push(chr);
        previous = Some(chr);
    }
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lookup<'a>(record: &'a RawRecord, name: &str) -> Option<&'a Value> {
    record.get(name).or_else(|| {
        let wanted = normalize_field_name(name);
        record
            .iter()
            .find(|(key, _)| normalize_field_name(key) == wanted)
            .map(|(_, value)| value)
    })
}

/// Joins earliest and latest year into one cell.
pub fn year_range(earliest: &str, latest: &str) -> String {
    if earliest == latest {
        earliest.to_string()
    } else {
        format!("{earliest} - {latest}")
    }
}

/// Maps raw records onto the canonical columns of the active schema.
#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    schema: SchemaConfig,
}

impl RecordNormalizer {
    pub fn new(schema: SchemaConfig) -> Self {
        Self { schema }
    }

    pub fn derive_columns(
        &self,
        sample: Option<&RawRecord>,
    ) -> Result<Vec<CanonicalColumn>, ExplorerError> {
        let columns: Vec<CanonicalColumn> = match &self.schema {
            SchemaConfig::SchemaFree => {
                let sample = sample.ok_or(ExplorerError::EmptyDataset)?;
                sample
                    .keys()
                    .enumerate()
                    .map(|(order, key)| CanonicalColumn {
                        key: key.clone(),
                        title: format_column_name(key),
                        visible: true,
                        order,
                        toggleable: false,
                    })
                    .collect()
            }
            SchemaConfig::Fixed(schema) => schema
                .columns
                .iter()
                .enumerate()
                .map(|(order, column)| CanonicalColumn {
                    key: column.key.clone(),
                    title: column.title.clone(),
                    visible: column.visible,
                    order,
                    toggleable: !column.visible,
                })
                .collect(),
        };
        debug!("Derived {} columns", columns.len());
        trace!(
            "Columns: {:?}",
            columns.iter().map(|c| &c.key).collect::<Vec<_>>()
        );
        Ok(columns)
    }

    pub fn normalize(&self, records: &[RawRecord], columns: &[CanonicalColumn]) -> Vec<CanonicalRow> {
        let sources: Vec<ColumnSource> = columns
            .iter()
            .map(|column| self.source_for(column))
            .collect();
        if records.len() >= PARALLEL_THRESHOLD {
            records
                .par_iter()
                .map(|record| Self::normalize_record(record, &sources))
                .collect()
        } else {
            records
                .iter()
                .map(|record| Self::normalize_record(record, &sources))
                .collect()
        }
    }

    fn source_for(&self, column: &CanonicalColumn) -> ColumnSource {
        if let SchemaConfig::Fixed(schema) = &self.schema
            && let Some(fixed) = schema.columns.iter().find(|c| c.key == column.key)
        {
            return fixed.source.clone();
        }
        ColumnSource::Field {
            name: column.key.clone(),
        }
    }

    fn normalize_record(record: &RawRecord, sources: &[ColumnSource]) -> CanonicalRow {
        let cells = sources
            .iter()
            .map(|source| match source {
                ColumnSource::Field { name } => render_value(lookup(record, name)),
                ColumnSource::YearRange { earliest, latest } => year_range(
                    &render_value(lookup(record, earliest)),
                    &render_value(lookup(record, latest)),
                ),
            })
            .collect();
        CanonicalRow::new(cells)
    }
}
