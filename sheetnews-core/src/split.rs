//! Partition normalized rows into one table per target category

use crate::config::ColumnNames;
use crate::normalize::NormalizedRow;
use crate::table::{CellValue, Grid};
use std::collections::HashMap;
use tracing::debug;

/// A published row: the normalized row without its category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRow {
    pub week: u32,
    pub item: String,
    pub status: String,
}

/// All rows of one category, sorted by (week, item)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    pub category: String,
    pub rows: Vec<CategoryRow>,
}

impl CategoryTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Week column in row order
    pub fn weeks(&self) -> Vec<u32> {
        self.rows.iter().map(|r| r.week).collect()
    }

    /// Number of distinct weeks in the table
    pub fn distinct_weeks(&self) -> usize {
        let mut weeks = self.weeks();
        weeks.dedup();
        weeks.len()
    }

    /// Grid written to the destination tab; headers are present even with no rows
    pub fn to_grid(&self, columns: &ColumnNames) -> Grid {
        Grid {
            headers: columns.output_headers(),
            rows: self
                .rows
                .iter()
                .map(|r| {
                    vec![
                        CellValue::from(r.week),
                        CellValue::from(r.item.as_str()),
                        CellValue::from(r.status.as_str()),
                    ]
                })
                .collect(),
        }
    }
}

/// Build one table per target category, in target order.
///
/// Categories with no rows still get an (empty) table. Rows whose category
/// is not a target are dropped.
pub fn split_by_category(rows: &[NormalizedRow], targets: &[String]) -> Vec<CategoryTable> {
    let mut buckets: HashMap<&str, Vec<CategoryRow>> = targets
        .iter()
        .map(|t| (t.trim(), Vec::new()))
        .collect();

    let mut dropped = 0usize;
    for row in rows {
        match buckets.get_mut(row.category.trim()) {
            Some(bucket) => bucket.push(CategoryRow {
                week: row.week,
                item: row.item.clone(),
                status: row.status.clone(),
            }),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!("{} rows belong to categories without a tab", dropped);
    }

    targets
        .iter()
        .map(|target| {
            let mut rows = buckets.remove(target.trim()).unwrap_or_default();
            // Stable, so equal (week, item) pairs keep source order
            rows.sort_by(|a, b| a.week.cmp(&b.week).then_with(|| a.item.cmp(&b.item)));
            CategoryTable {
                category: target.clone(),
                rows,
            }
        })
        .collect()
}
