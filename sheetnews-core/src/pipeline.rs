//! Read → normalize → split → publish

use crate::config::NewsConfig;
use crate::normalize::{StatusExtractor, TimestampPolicy, normalize};
use crate::publish::Publisher;
use crate::report::{CategoryReport, RunReport};
use crate::sheets::{SheetsBackend, open_tab};
use crate::split::{CategoryTable, split_by_category};
use crate::table::SourceTable;
use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;
use tracing::info;

/// Category tables computed from the source tab, not yet published
#[derive(Debug, Clone)]
pub struct Prepared {
    pub source_rows: usize,
    pub normalized_rows: usize,
    pub tables: Vec<CategoryTable>,
}

/// One run of the news pipeline against a backend
pub struct Pipeline<B: SheetsBackend> {
    config: NewsConfig,
    backend: B,
}

impl<B: SheetsBackend> Pipeline<B> {
    pub fn new(config: NewsConfig, backend: B) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &NewsConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Read the source tab and build one table per target category
    pub fn prepare(&mut self) -> Result<Prepared> {
        self.config.validate().context("Invalid configuration")?;
        let extractor = StatusExtractor::new(self.config.status_prefix_regex()?);
        let policy = if self.config.skip_invalid_timestamps {
            TimestampPolicy::SkipInvalid
        } else {
            TimestampPolicy::Strict
        };

        let source_tab = open_tab(&mut self.backend, &self.config.source_tab)
            .with_context(|| format!("Failed to open source tab '{}'", self.config.source_tab))?;
        let grid = self
            .backend
            .read_values(&source_tab)
            .with_context(|| format!("Failed to read source tab '{}'", source_tab.title))?;
        let source = SourceTable::from_grid(grid).context("Failed to load source table")?;
        info!(
            "Read {} submissions from '{}'",
            source.height(),
            source_tab.title
        );

        let rows = normalize(&source, &self.config.columns, &extractor, policy)
            .context("Failed to normalize submissions")?;
        info!("Normalized into {} news items", rows.len());

        let tables = split_by_category(&rows, &self.config.target_categories);

        Ok(Prepared {
            source_rows: source.height(),
            normalized_rows: rows.len(),
            tables,
        })
    }

    /// Prepare, then publish every category in target order
    pub fn run(&mut self) -> Result<RunReport> {
        let prepared = self.prepare()?;
        let mut report = self.report_for(&prepared);

        let pause = Duration::from_millis(self.config.pause_between_categories_ms);
        for (idx, table) in prepared.tables.iter().enumerate() {
            if idx > 0 && !pause.is_zero() {
                thread::sleep(pause);
            }

            let category = Publisher::new(
                &mut self.backend,
                &self.config.columns,
                &self.config.layout,
            )
            .publish(table)
            .with_context(|| format!("Failed to publish category '{}'", table.category))?;
            info!(
                "Published '{}': {} rows in {} weeks",
                category.category, category.rows, category.weeks
            );
            report.categories.push(category);
        }

        report.published = true;
        Ok(report)
    }

    /// Report for a prepared run without touching the destination tabs
    pub fn report_for(&self, prepared: &Prepared) -> RunReport {
        RunReport {
            spreadsheet_id: self.config.spreadsheet_id.clone(),
            source_tab: self.config.source_tab.clone(),
            source_rows: prepared.source_rows,
            normalized_rows: prepared.normalized_rows,
            published: false,
            categories: Vec::new(),
        }
    }

    /// What a publish would write, as category reports
    pub fn preview(&self, prepared: &Prepared) -> RunReport {
        let palette_len = self.config.layout.palette.len();
        let mut report = self.report_for(prepared);
        report.categories = prepared
            .tables
            .iter()
            .map(|table| CategoryReport {
                category: table.category.clone(),
                rows: table.rows.len(),
                weeks: table.distinct_weeks(),
                zebra_blocks: crate::zebra::zebra_blocks(&table.weeks(), palette_len).len(),
                created_tab: false,
                maintenance_skipped: false,
            })
            .collect();
        report
    }
}
