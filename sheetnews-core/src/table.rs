//! In-memory tables exchanged with the spreadsheet

use polars::prelude::*;
use std::collections::{HashMap, HashSet};

/// Hidden column carrying the 1-based source row of each submission
pub const SHEET_ROW: &str = "__sheet_row";

/// Raw submissions as read from the source tab.
///
/// Every named column is a nullable string column; blank cells are null.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    headers: Vec<String>,
    frame: DataFrame,
}

impl SourceTable {
    /// Build a table from a value grid whose first row is the header.
    ///
    /// Ragged rows are padded to the header width, cells beyond it are
    /// discarded, and rows with no non-blank cell are dropped.
    pub fn from_grid(grid: Vec<Vec<String>>) -> PolarsResult<Self> {
        let mut rows_iter = grid.into_iter();
        let Some(header_row) = rows_iter.next() else {
            return Ok(Self::default());
        };

        let headers = dedupe_headers(header_row);
        if headers.is_empty() {
            return Ok(Self::default());
        }
        let rows: Vec<Vec<String>> = rows_iter.collect();

        let mut columns: Vec<Column> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<Option<String>> = rows
                    .iter()
                    .map(|cells| {
                        cells
                            .get(idx)
                            .filter(|c| !c.trim().is_empty())
                            .cloned()
                    })
                    .collect();
                Column::new(name.as_str().into(), values)
            })
            .collect();

        let filled = columns
            .iter()
            .map(Column::is_not_null)
            .reduce(|acc, col| &acc | &col);

        // Header is sheet row 1
        let sheet_rows: Vec<u32> = (0..rows.len()).map(|idx| idx as u32 + 2).collect();
        columns.push(Column::new(SHEET_ROW.into(), sheet_rows));

        let mut frame = DataFrame::new(columns)?;
        if let Some(mask) = filled {
            frame = frame.filter(&mask)?;
        }

        Ok(Self { headers, frame })
    }

    /// Column names in source order (the hidden row column excluded)
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Backing frame: one string column per header plus [`SHEET_ROW`]
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Index of a header, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Number of non-blank submission rows
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    /// Melt `on` columns into `variable`/`value` pairs, repeating `index` columns
    pub fn unpivot(&self, on: &[String], index: &[String]) -> PolarsResult<DataFrame> {
        self.frame.unpivot(on.to_vec(), index.to_vec())
    }

    /// Cells of one row as text, blanks as empty strings
    pub fn row_values(&self, row: usize) -> PolarsResult<Vec<String>> {
        self.headers
            .iter()
            .map(|name| {
                let column = self.frame.column(name)?.str()?;
                Ok(column.get(row).unwrap_or_default().to_string())
            })
            .collect()
    }
}

/// Disambiguate repeated header names: `X`, `X.1`, `X.2`, ...
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> = raw.iter().cloned().collect();
    let mut headers = Vec::with_capacity(raw.len());

    for name in raw {
        let seen = counts.entry(name.clone()).or_insert(0);
        if *seen == 0 {
            *seen = 1;
            headers.push(name);
            continue;
        }

        let mut candidate = format!("{}.{}", name, seen);
        while taken.contains(&candidate) {
            *seen += 1;
            candidate = format!("{}.{}", name, seen);
        }
        *seen += 1;
        taken.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

/// Value written to a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Cell as the Sheets API renders it back on read
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(t) => t.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Number(value as f64)
    }
}

/// Header plus data rows, ready to be written to a tab starting at A1
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Grid {
    /// Number of sheet rows the grid occupies, header included
    pub fn height(&self) -> usize {
        self.rows.len() + 1
    }

    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// All rows, header first
    pub fn to_values(&self) -> Vec<Vec<CellValue>> {
        std::iter::once(self.headers.iter().map(|h| CellValue::from(h.as_str())).collect())
            .chain(self.rows.iter().cloned())
            .collect()
    }
}
