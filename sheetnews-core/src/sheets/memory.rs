//! In-memory spreadsheet used by tests and offline runs

use super::{FormatRequest, GridRange, SheetsBackend, SheetsError, TabHandle, WrapStrategy};
use crate::config::Color;
use crate::table::Grid;
use std::collections::{BTreeMap, BTreeSet};

/// Simulated tab: values plus the formatting state the publisher touches
#[derive(Debug, Clone, Default)]
pub struct MemoryTab {
    pub handle: TabHandle,
    /// Row-major values; may be shorter than the grid
    pub cells: Vec<Vec<String>>,
    pub frozen_rows: u32,
    pub bold: Vec<GridRange>,
    pub wrap: Vec<(GridRange, WrapStrategy)>,
    pub column_widths: BTreeMap<u32, u32>,
    pub backgrounds: Vec<(GridRange, Color)>,
    pub hidden_columns: BTreeSet<u32>,
    /// Every request applied to this tab, in order
    pub requests: Vec<FormatRequest>,
}

impl MemoryTab {
    /// Value at 0-based (row, col), empty if unset
    pub fn value(&self, row: usize, col: usize) -> &str {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Last background applied to the 0-based cell, if any
    pub fn background_at(&self, row: u32, col: u32) -> Option<Color> {
        self.backgrounds
            .iter()
            .rev()
            .find(|(range, _)| range.contains(row, col))
            .map(|(_, color)| *color)
    }

    fn visible_values(&self) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = self
            .cells
            .iter()
            .map(|row| {
                let keep = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
                row[..keep].to_vec()
            })
            .collect();
        while rows.last().is_some_and(Vec::is_empty) {
            rows.pop();
        }
        rows
    }

    fn delete_columns(&mut self, start: u32, end: u32) -> Result<(), SheetsError> {
        let count = self.handle.column_count;
        if start >= end || end > count {
            return Err(SheetsError::Api {
                status: 400,
                message: format!(
                    "Invalid requests[0].deleteDimension: columns {}..{} outside 0..{}",
                    start, end, count
                ),
            });
        }
        if start == 0 && end == count {
            return Err(SheetsError::Api {
                status: 400,
                message: "You can't delete all the columns on the sheet.".to_string(),
            });
        }

        let removed = end - start;
        for row in &mut self.cells {
            let lo = (start as usize).min(row.len());
            let hi = (end as usize).min(row.len());
            row.drain(lo..hi);
        }
        self.hidden_columns = self
            .hidden_columns
            .iter()
            .filter(|c| **c < start || **c >= end)
            .map(|c| if *c >= end { c - removed } else { *c })
            .collect();
        self.column_widths = self
            .column_widths
            .iter()
            .filter(|(c, _)| **c < start || **c >= end)
            .map(|(c, w)| (if *c >= end { c - removed } else { *c }, *w))
            .collect();
        self.handle.column_count -= removed;
        Ok(())
    }

    fn apply(&mut self, request: &FormatRequest) -> Result<(), SheetsError> {
        match request {
            FormatRequest::FreezeRows(rows) => self.frozen_rows = *rows,
            FormatRequest::Bold(range) => self.bold.push(*range),
            FormatRequest::Wrap(range, strategy) => self.wrap.push((*range, *strategy)),
            FormatRequest::ColumnWidth { column, pixels } => {
                self.column_widths.insert(*column, *pixels);
            }
            FormatRequest::Background(range, color) => self.backgrounds.push((*range, *color)),
            FormatRequest::DeleteColumns { start, end } => self.delete_columns(*start, *end)?,
            FormatRequest::ShowColumns { start, end } => {
                self.hidden_columns.retain(|c| *c < *start || *c >= *end);
            }
            FormatRequest::HideColumns { start, end } => {
                self.hidden_columns.extend(*start..*end);
            }
        }
        self.requests.push(request.clone());
        Ok(())
    }
}

/// Spreadsheet kept entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    tabs: Vec<MemoryTab>,
    next_sheet_id: i64,
    /// Number of formatting batches accepted so far
    pub batches: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            next_sheet_id: 0,
            batches: 0,
        }
    }

    /// Add a tab pre-filled with values (grid sized 1000 rows, at least 26 columns)
    pub fn with_tab(mut self, title: &str, values: Vec<Vec<String>>) -> Self {
        let width = values.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let height = values.len() as u32;
        let mut tab = self.new_tab(title, height.max(1000), width.max(26));
        tab.cells = values;
        self.tabs.push(tab);
        self
    }

    pub fn tab(&self, title: &str) -> Option<&MemoryTab> {
        self.tabs.iter().find(|t| t.handle.title == title)
    }

    pub fn tab_mut(&mut self, title: &str) -> Option<&mut MemoryTab> {
        self.tabs.iter_mut().find(|t| t.handle.title == title)
    }

    /// Tab titles in creation order
    pub fn titles(&self) -> Vec<&str> {
        self.tabs.iter().map(|t| t.handle.title.as_str()).collect()
    }

    fn new_tab(&mut self, title: &str, rows: u32, columns: u32) -> MemoryTab {
        let sheet_id = self.next_sheet_id;
        self.next_sheet_id += 1;
        MemoryTab {
            handle: TabHandle {
                sheet_id,
                title: title.to_string(),
                row_count: rows,
                column_count: columns,
            },
            ..MemoryTab::default()
        }
    }

    fn tab_by_id(&mut self, tab: &TabHandle) -> Result<&mut MemoryTab, SheetsError> {
        self.tabs
            .iter_mut()
            .find(|t| t.handle.sheet_id == tab.sheet_id)
            .ok_or_else(|| SheetsError::MissingTab(tab.title.clone()))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetsBackend for MemoryBackend {
    fn find_tab(&mut self, title: &str) -> Result<Option<TabHandle>, SheetsError> {
        Ok(self.tab(title).map(|t| t.handle.clone()))
    }

    fn add_tab(&mut self, title: &str, rows: u32, columns: u32) -> Result<TabHandle, SheetsError> {
        if self.tab(title).is_some() {
            return Err(SheetsError::Api {
                status: 400,
                message: format!(
                    "Invalid requests[0].addSheet: A sheet with the name \"{}\" already exists.",
                    title
                ),
            });
        }
        let tab = self.new_tab(title, rows, columns);
        let handle = tab.handle.clone();
        self.tabs.push(tab);
        Ok(handle)
    }

    fn read_values(&mut self, tab: &TabHandle) -> Result<Vec<Vec<String>>, SheetsError> {
        Ok(self.tab_by_id(tab)?.visible_values())
    }

    fn replace_contents(&mut self, tab: &TabHandle, grid: &Grid) -> Result<(), SheetsError> {
        let target = self.tab_by_id(tab)?;
        target.cells = grid
            .to_values()
            .iter()
            .map(|row| row.iter().map(|v| v.display()).collect())
            .collect();
        target.handle.row_count = target.handle.row_count.max(grid.height() as u32);
        target.handle.column_count = target.handle.column_count.max(grid.width() as u32);
        Ok(())
    }

    fn apply_formatting(
        &mut self,
        tab: &TabHandle,
        requests: &[FormatRequest],
    ) -> Result<(), SheetsError> {
        if requests.is_empty() {
            return Err(SheetsError::EmptyBatch);
        }
        let target = self.tab_by_id(tab)?;
        for request in requests {
            target.apply(request)?;
        }
        self.batches += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn strings(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_replace_contents_clears_old_values() {
        let mut backend =
            MemoryBackend::new().with_tab("UC", strings(&[&["a", "b", "c", "d"], &["1", "2", "3", "4"], &["5"]]));
        let tab = backend.find_tab("UC").unwrap().unwrap();

        let grid = Grid {
            headers: vec!["w".to_string(), "i".to_string()],
            rows: vec![vec![CellValue::Number(9.0), CellValue::from("x")]],
        };
        backend.replace_contents(&tab, &grid).unwrap();

        assert_eq!(
            backend.read_values(&tab).unwrap(),
            strings(&[&["w", "i"], &["9", "x"]])
        );
        assert_eq!(backend.header_row(&tab).unwrap(), vec!["w", "i"]);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let mut backend = MemoryBackend::new();
        let tab = backend.add_tab("UC", 10, 5).unwrap();
        let err = backend.apply_formatting(&tab, &[]).unwrap_err();
        assert!(matches!(err, SheetsError::EmptyBatch));
        assert_eq!(backend.batches, 0);
    }

    #[test]
    fn test_delete_columns_shifts_state() {
        let mut backend = MemoryBackend::new().with_tab("UC", strings(&[&["a", "b", "c", "d", "e"]]));
        let tab = backend.find_tab("UC").unwrap().unwrap();
        backend
            .apply_formatting(
                &tab,
                &[
                    FormatRequest::HideColumns { start: 4, end: 5 },
                    FormatRequest::ColumnWidth { column: 4, pixels: 50 },
                    FormatRequest::DeleteColumns { start: 1, end: 2 },
                ],
            )
            .unwrap();

        let state = backend.tab("UC").unwrap();
        assert_eq!(state.cells[0], vec!["a", "c", "d", "e"]);
        assert_eq!(state.handle.column_count, 25);
        assert!(state.hidden_columns.contains(&3));
        assert_eq!(state.column_widths.get(&3), Some(&50));
    }

    #[test]
    fn test_cannot_delete_every_column() {
        let mut backend = MemoryBackend::new();
        let tab = backend.add_tab("UC", 10, 3).unwrap();
        let err = backend
            .apply_formatting(&tab, &[FormatRequest::DeleteColumns { start: 0, end: 3 }])
            .unwrap_err();
        assert!(matches!(err, SheetsError::Api { status: 400, .. }));
    }

    #[test]
    fn test_duplicate_tab_rejected() {
        let mut backend = MemoryBackend::new();
        backend.add_tab("UC", 10, 3).unwrap();
        assert!(backend.add_tab("UC", 10, 3).is_err());
    }
}
