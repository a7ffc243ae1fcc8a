//! Run summary

use serde::Serialize;

/// Outcome of publishing one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    pub category: String,
    /// Data rows written (header excluded)
    pub rows: usize,
    /// Distinct week numbers among the rows
    pub weeks: usize,
    pub zebra_blocks: usize,
    /// The destination tab did not exist before this run
    pub created_tab: bool,
    /// Column maintenance was skipped because the header was unusable
    pub maintenance_skipped: bool,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub spreadsheet_id: String,
    pub source_tab: String,
    /// Non-blank submission rows read from the source tab
    pub source_rows: usize,
    /// Long-format rows produced by normalization (all categories)
    pub normalized_rows: usize,
    /// Whether anything was written to the spreadsheet
    pub published: bool,
    pub categories: Vec<CategoryReport>,
}

impl RunReport {
    /// Rows that landed in a target tab
    pub fn published_rows(&self) -> usize {
        self.categories.iter().map(|c| c.rows).sum()
    }

    /// Rows whose category has no target tab
    pub fn unrouted_rows(&self) -> usize {
        self.normalized_rows.saturating_sub(self.published_rows())
    }
}
