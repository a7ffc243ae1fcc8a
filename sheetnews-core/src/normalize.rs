//! Wide-to-long reshape of the submissions table
//!
//! Every submission row holds one timestamp, one category and many slot
//! columns. Each non-blank slot value becomes one [`NormalizedRow`]; the
//! status comes from the slot column's header.

use crate::config::ColumnNames;
use crate::table::{SHEET_ROW, SourceTable};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::PolarsError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// One news item in long format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    /// ISO calendar week of the submission timestamp
    pub week: u32,
    pub category: String,
    pub item: String,
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Source table has no header row")]
    EmptySource,
    #[error("Source table has no '{0}' column")]
    MissingColumn(String),
    #[error("Row {row}: cannot parse timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },
    #[error("Dataframe: {0}")]
    Frame(#[from] PolarsError),
}

/// How rows with unparseable timestamps are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampPolicy {
    /// Abort on the first bad timestamp
    #[default]
    Strict,
    /// Drop the row and keep going
    SkipInvalid,
}

/// Turns slot column headers into status labels
#[derive(Debug, Clone)]
pub struct StatusExtractor {
    prefix: Regex,
}

impl StatusExtractor {
    pub fn new(prefix: Regex) -> Self {
        Self { prefix }
    }

    /// Strip the prefix pattern and any trailing `.<digits>` suffix.
    ///
    /// Applied until the value stops changing, so clean labels pass through.
    pub fn extract(&self, column: &str) -> String {
        let mut current = column.trim().to_string();
        loop {
            let next = self.strip_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn strip_once(&self, value: &str) -> String {
        let without_prefix = self.prefix.replace_all(value, "");
        let trimmed = without_prefix.trim();
        numeric_suffix().replace(trimmed, "").trim().to_string()
    }
}

fn numeric_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"(\.\d+)+$").expect("static regex"))
}

const DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

/// Parse a day-first timestamp as written by the submission form
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// ISO week number (1..=53) of a timestamp
pub fn iso_week(timestamp: &NaiveDateTime) -> u32 {
    timestamp.date().iso_week().week()
}

/// Reshape the submissions table into long rows.
///
/// Slot columns are melted column by column, so the output is grouped by
/// slot; callers sort afterwards.
pub fn normalize(
    table: &SourceTable,
    columns: &ColumnNames,
    extractor: &StatusExtractor,
    policy: TimestampPolicy,
) -> Result<Vec<NormalizedRow>, NormalizeError> {
    if table.headers().is_empty() {
        return Err(NormalizeError::EmptySource);
    }
    for required in [&columns.timestamp, &columns.category] {
        if table.column_index(required).is_none() {
            return Err(NormalizeError::MissingColumn(required.clone()));
        }
    }

    let slots: Vec<String> = table
        .headers()
        .iter()
        .filter(|h| **h != columns.timestamp && **h != columns.category)
        .cloned()
        .collect();
    debug!("{} slot columns in source table", slots.len());
    let statuses: HashMap<&str, String> = slots
        .iter()
        .map(|header| (header.as_str(), extractor.extract(header)))
        .collect();

    let weeks = submission_weeks(table, &columns.timestamp, policy)?;
    if slots.is_empty() || weeks.is_empty() {
        return Ok(Vec::new());
    }

    let long = table.unpivot(&slots, &[SHEET_ROW.to_string(), columns.category.clone()])?;
    let sheet_rows = long.column(SHEET_ROW)?.u32()?;
    let categories = long.column(&columns.category)?.str()?;
    let variables = long.column("variable")?.str()?;
    let values = long.column("value")?.str()?;

    let mut normalized = Vec::new();
    for (((sheet_row, category), variable), item) in sheet_rows
        .into_iter()
        .zip(categories)
        .zip(variables)
        .zip(values)
    {
        // Null values are blank slots
        let (Some(sheet_row), Some(variable), Some(item)) = (sheet_row, variable, item) else {
            continue;
        };
        let Some(week) = weeks.get(&sheet_row) else {
            continue;
        };
        normalized.push(NormalizedRow {
            week: *week,
            category: category.unwrap_or_default().trim().to_string(),
            item: item.to_string(),
            status: statuses.get(variable).cloned().unwrap_or_default(),
        });
    }

    Ok(normalized)
}

/// ISO week of every usable submission, keyed by sheet row.
///
/// Rows with a blank timestamp are skipped in either policy.
fn submission_weeks(
    table: &SourceTable,
    timestamp_column: &str,
    policy: TimestampPolicy,
) -> Result<HashMap<u32, u32>, NormalizeError> {
    let frame = table.frame();
    let sheet_rows = frame.column(SHEET_ROW)?.u32()?;
    let stamps = frame.column(timestamp_column)?.str()?;

    let mut weeks = HashMap::new();
    for (sheet_row, raw) in sheet_rows.into_iter().zip(stamps) {
        let Some(sheet_row) = sheet_row else {
            continue;
        };
        let Some(raw) = raw else {
            warn!("Skipping row {}: no timestamp", sheet_row);
            continue;
        };
        match parse_timestamp(raw) {
            Some(ts) => {
                weeks.insert(sheet_row, iso_week(&ts));
            }
            None if policy == TimestampPolicy::Strict => {
                return Err(NormalizeError::InvalidTimestamp {
                    row: sheet_row as usize,
                    value: raw.to_string(),
                });
            }
            None => warn!(
                "Skipping row {}: cannot parse timestamp '{}'",
                sheet_row, raw
            ),
        }
    }
    Ok(weeks)
}
