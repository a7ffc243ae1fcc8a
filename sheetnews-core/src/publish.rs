//! Write category tables to their tabs and format them

use crate::config::{ColumnNames, LayoutConfig};
use crate::report::CategoryReport;
use crate::sheets::{
    FormatRequest, GridRange, SheetsBackend, SheetsError, TabHandle, WrapStrategy, ensure_tab,
};
use crate::split::CategoryTable;
use crate::zebra::{ZebraBlock, zebra_blocks};
use tracing::{debug, info, warn};

/// Problems in the post-write column maintenance
#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    #[error("Tab '{tab}' has no '{column}' header")]
    MissingHeader { tab: String, column: String },
    #[error(transparent)]
    Sheets(#[from] SheetsError),
}

/// Publishes category tables through a [`SheetsBackend`]
pub struct Publisher<'a, B: SheetsBackend + ?Sized> {
    backend: &'a mut B,
    columns: &'a ColumnNames,
    layout: &'a LayoutConfig,
}

impl<'a, B: SheetsBackend + ?Sized> Publisher<'a, B> {
    pub fn new(backend: &'a mut B, columns: &'a ColumnNames, layout: &'a LayoutConfig) -> Self {
        Self {
            backend,
            columns,
            layout,
        }
    }

    /// Replace the tab contents with `table` and apply the layout.
    ///
    /// Only a missing header during maintenance is recovered; every other
    /// remote failure is returned.
    pub fn publish(&mut self, table: &CategoryTable) -> Result<CategoryReport, SheetsError> {
        let (tab, created) = ensure_tab(
            &mut *self.backend,
            &table.category,
            self.layout.new_tab_rows,
            self.layout.new_tab_columns,
        )?;

        self.backend
            .replace_contents(&tab, &table.to_grid(self.columns))?;
        info!("Wrote {} rows to '{}'", table.rows.len(), tab.title);

        let blocks = zebra_blocks(&table.weeks(), self.layout.palette.len());
        let requests = self.format_requests(&tab, &blocks);
        self.apply_lenient(&tab, &requests)?;

        let maintenance_skipped = match self.maintain_columns(&tab) {
            Ok(()) => false,
            Err(MaintenanceError::MissingHeader { tab, column }) => {
                warn!(
                    "Skipping column maintenance on '{}': header '{}' not found",
                    tab, column
                );
                true
            }
            Err(MaintenanceError::Sheets(e)) => return Err(e),
        };

        Ok(CategoryReport {
            category: table.category.clone(),
            rows: table.rows.len(),
            weeks: table.distinct_weeks(),
            zebra_blocks: blocks.len(),
            created_tab: created,
            maintenance_skipped,
        })
    }

    /// Freeze, bold header, no-wrap, widths and zebra backgrounds, in that order
    pub fn format_requests(&self, tab: &TabHandle, blocks: &[ZebraBlock]) -> Vec<FormatRequest> {
        let out_cols = self.layout.output_columns;
        let mut requests = vec![
            FormatRequest::FreezeRows(1),
            FormatRequest::Bold(GridRange::bounded(0, 1, 0, out_cols)),
            FormatRequest::Wrap(
                GridRange::columns(0, tab.column_count.max(out_cols)),
                WrapStrategy::OverflowCell,
            ),
        ];

        requests.extend(
            self.layout
                .column_widths
                .iter()
                .enumerate()
                .map(|(idx, pixels)| FormatRequest::ColumnWidth {
                    column: idx as u32,
                    pixels: *pixels,
                }),
        );

        requests.extend(blocks.iter().map(|block| {
            FormatRequest::Background(
                // Sheet rows are 1-based and inclusive; grid ranges are 0-based, half-open
                GridRange::bounded(block.start_row - 1, block.end_row, 0, out_cols),
                self.layout.palette[block.color],
            )
        }));

        requests
    }

    /// Drop the legacy category column and surplus columns, then hide the rest
    fn maintain_columns(&mut self, tab: &TabHandle) -> Result<(), MaintenanceError> {
        let out_cols = self.layout.output_columns;
        let mut headers = self.backend.header_row(tab)?;

        if !headers.iter().any(|h| h.trim() == self.columns.week) {
            return Err(MaintenanceError::MissingHeader {
                tab: tab.title.clone(),
                column: self.columns.week.clone(),
            });
        }

        let category = self.columns.category.trim().to_lowercase();
        if let Some(idx) = headers
            .iter()
            .position(|h| h.trim().to_lowercase() == category)
        {
            debug!("Removing '{}' column from '{}'", self.columns.category, tab.title);
            let idx = idx as u32;
            self.apply_lenient(
                tab,
                &[FormatRequest::DeleteColumns {
                    start: idx,
                    end: idx + 1,
                }],
            )?;
            headers = self.backend.header_row(tab)?;
        }

        let data_cols = headers.len() as u32;
        if data_cols > out_cols {
            debug!(
                "Deleting {} surplus columns from '{}'",
                data_cols - out_cols,
                tab.title
            );
            self.apply_lenient(
                tab,
                &[FormatRequest::DeleteColumns {
                    start: out_cols,
                    end: data_cols,
                }],
            )?;
        }

        // Column count may have shrunk
        let current = self
            .backend
            .find_tab(&tab.title)?
            .ok_or_else(|| SheetsError::MissingTab(tab.title.clone()))?;
        let mut requests = vec![FormatRequest::ShowColumns {
            start: 0,
            end: current.column_count,
        }];
        if current.column_count > out_cols {
            requests.push(FormatRequest::HideColumns {
                start: out_cols,
                end: current.column_count,
            });
        }
        self.apply_lenient(&current, &requests)?;

        Ok(())
    }

    /// Apply a batch, treating an empty batch as success
    fn apply_lenient(
        &mut self,
        tab: &TabHandle,
        requests: &[FormatRequest],
    ) -> Result<(), SheetsError> {
        match self.backend.apply_formatting(tab, requests) {
            Err(SheetsError::EmptyBatch) => {
                debug!("Nothing to format on '{}'", tab.title);
                Ok(())
            }
            other => other,
        }
    }
}
