//! Access to the remote spreadsheet
//!
//! All mutation of the spreadsheet goes through [`SheetsBackend`], so the
//! transformation code can be exercised against [`MemoryBackend`].

#[cfg(feature = "remote")]
pub mod auth;
#[cfg(feature = "remote")]
pub mod http;
pub mod memory;

#[cfg(feature = "remote")]
pub use http::GoogleSheetsClient;
pub use memory::{MemoryBackend, MemoryTab};

use crate::config::Color;
use crate::table::Grid;
use serde::Serialize;
use std::fmt;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[cfg(feature = "remote")]
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    /// A formatting batch with no requests; the API rejects these
    #[error("Formatting batch contains no requests")]
    EmptyBatch,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Tab '{0}' not found")]
    MissingTab(String),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Identifies one tab (worksheet) of the spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TabHandle {
    pub sheet_id: i64,
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
}

/// Rectangular range, 0-based and half-open; `None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridRange {
    pub start_row: Option<u32>,
    pub end_row: Option<u32>,
    pub start_col: Option<u32>,
    pub end_col: Option<u32>,
}

impl GridRange {
    /// Rows `start_row..end_row` of columns `start_col..end_col`
    pub fn bounded(start_row: u32, end_row: u32, start_col: u32, end_col: u32) -> Self {
        Self {
            start_row: Some(start_row),
            end_row: Some(end_row),
            start_col: Some(start_col),
            end_col: Some(end_col),
        }
    }

    /// Whole columns `start..end`
    pub fn columns(start: u32, end: u32) -> Self {
        Self {
            start_col: Some(start),
            end_col: Some(end),
            ..Self::default()
        }
    }

    /// Whether the range includes the 0-based cell (row, col)
    pub fn contains(&self, row: u32, col: u32) -> bool {
        let within = |v: u32, start: Option<u32>, end: Option<u32>| {
            start.is_none_or(|s| v >= s) && end.is_none_or(|e| v < e)
        };
        within(row, self.start_row, self.end_row) && within(col, self.start_col, self.end_col)
    }

    /// A1 notation, e.g. `A2:C4` or `A:J`
    pub fn to_a1(&self) -> String {
        let start_col = self.start_col.map(col_to_letter).unwrap_or_default();
        let end_col = self
            .end_col
            .map(|c| col_to_letter(c.saturating_sub(1)))
            .unwrap_or_default();
        let start_row = self.start_row.map(|r| (r + 1).to_string()).unwrap_or_default();
        let end_row = self.end_row.map(|r| r.to_string()).unwrap_or_default();
        format!("{}{}:{}{}", start_col, start_row, end_col, end_row)
    }
}

impl fmt::Display for GridRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

/// Convert column number to letter (0 -> A, 1 -> B, 26 -> AA)
pub fn col_to_letter(mut col: u32) -> String {
    let mut result = String::new();
    loop {
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

/// Text wrapping mode of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WrapStrategy {
    /// Long text spills into empty neighbours
    OverflowCell,
    Wrap,
    Clip,
}

/// One formatting operation on a tab
#[derive(Debug, Clone, PartialEq)]
pub enum FormatRequest {
    FreezeRows(u32),
    Bold(GridRange),
    Wrap(GridRange, WrapStrategy),
    ColumnWidth { column: u32, pixels: u32 },
    Background(GridRange, Color),
    /// Columns `start..end` (0-based, half-open)
    DeleteColumns { start: u32, end: u32 },
    ShowColumns { start: u32, end: u32 },
    HideColumns { start: u32, end: u32 },
}

/// Narrow interface to the spreadsheet service
pub trait SheetsBackend {
    /// Look up a tab by title
    fn find_tab(&mut self, title: &str) -> Result<Option<TabHandle>, SheetsError>;

    /// Create a tab with the given grid size
    fn add_tab(&mut self, title: &str, rows: u32, columns: u32) -> Result<TabHandle, SheetsError>;

    /// All values of a tab as displayed text; trailing empty cells are omitted
    fn read_values(&mut self, tab: &TabHandle) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Values of the first row
    fn header_row(&mut self, tab: &TabHandle) -> Result<Vec<String>, SheetsError> {
        Ok(self.read_values(tab)?.into_iter().next().unwrap_or_default())
    }

    /// Clear every value of the tab, then write `grid` starting at A1
    fn replace_contents(&mut self, tab: &TabHandle, grid: &Grid) -> Result<(), SheetsError>;

    /// Apply formatting requests as one batch.
    ///
    /// An empty batch fails with [`SheetsError::EmptyBatch`].
    fn apply_formatting(
        &mut self,
        tab: &TabHandle,
        requests: &[FormatRequest],
    ) -> Result<(), SheetsError>;
}

/// Look up a tab that must already exist
pub fn open_tab<B: SheetsBackend + ?Sized>(
    backend: &mut B,
    title: &str,
) -> Result<TabHandle, SheetsError> {
    backend
        .find_tab(title)?
        .ok_or_else(|| SheetsError::MissingTab(title.to_string()))
}

/// Return the tab called `title`, creating it if absent.
///
/// The flag is `true` when the tab was created by this call.
pub fn ensure_tab<B: SheetsBackend + ?Sized>(
    backend: &mut B,
    title: &str,
    rows: u32,
    columns: u32,
) -> Result<(TabHandle, bool), SheetsError> {
    if let Some(tab) = backend.find_tab(title)? {
        return Ok((tab, false));
    }
    info!("Creating tab '{}' ({}x{})", title, rows, columns);
    let tab = backend.add_tab(title, rows, columns)?;
    Ok((tab, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_to_letter() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(2), "C");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(27), "AB");
    }

    #[test]
    fn test_a1_rendering() {
        assert_eq!(GridRange::bounded(1, 3, 0, 3).to_a1(), "A2:C3");
        assert_eq!(GridRange::bounded(0, 1, 0, 3).to_a1(), "A1:C1");
        assert_eq!(GridRange::columns(0, 10).to_a1(), "A:J");
    }

    #[test]
    fn test_contains() {
        let range = GridRange::bounded(1, 3, 0, 3);
        assert!(range.contains(1, 0));
        assert!(range.contains(2, 2));
        assert!(!range.contains(3, 0));
        assert!(!range.contains(1, 3));
        assert!(GridRange::columns(0, 2).contains(500, 1));
    }

    #[test]
    fn test_ensure_tab_is_idempotent() {
        let mut backend = MemoryBackend::new();
        let (first, created) = ensure_tab(&mut backend, "UC", 1000, 10).unwrap();
        assert!(created);
        assert_eq!((first.row_count, first.column_count), (1000, 10));

        let (second, created) = ensure_tab(&mut backend, "UC", 5, 5).unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(backend.titles(), vec!["UC"]);
    }

    #[test]
    fn test_open_missing_tab() {
        let mut backend = MemoryBackend::new();
        let err = open_tab(&mut backend, "Archive").unwrap_err();
        assert!(matches!(err, SheetsError::MissingTab(ref t) if t == "Archive"));
    }
}
