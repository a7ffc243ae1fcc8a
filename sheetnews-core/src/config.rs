//! Configuration for the news pipeline
//!
//! Every value has a built-in default, so running without a config file
//! publishes to the production spreadsheet. A TOML file may override any field.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Spreadsheet identifier (the key in the spreadsheet URL)
    pub spreadsheet_id: String,
    /// Tab holding the raw form submissions
    pub source_tab: String,
    /// Categories that get their own tab, published in this order
    pub target_categories: Vec<String>,
    /// Regex removed from slot column names to obtain the status
    pub status_prefix: String,
    /// Drop rows with unparseable timestamps instead of failing
    pub skip_invalid_timestamps: bool,
    /// Pause between categories to stay under the API write quota
    pub pause_between_categories_ms: u64,
    pub columns: ColumnNames,
    pub layout: LayoutConfig,
    pub auth: AuthConfig,
}

impl NewsConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: NewsConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Compile the status prefix pattern
    pub fn status_prefix_regex(&self) -> Result<Regex> {
        Regex::new(&self.status_prefix).map_err(|e| {
            anyhow::anyhow!(
                "Configuration error: invalid status_prefix '{}': {}",
                self.status_prefix,
                e
            )
        })
    }

    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.spreadsheet_id.trim().is_empty() {
            anyhow::bail!("Configuration error: spreadsheet_id is empty");
        }
        if self.source_tab.trim().is_empty() {
            anyhow::bail!("Configuration error: source_tab is empty");
        }

        if self.target_categories.is_empty() {
            anyhow::bail!("Configuration error: target_categories is empty");
        }
        let mut seen = HashSet::new();
        for category in &self.target_categories {
            if category.trim().is_empty() {
                anyhow::bail!("Configuration error: blank name in target_categories");
            }
            if !seen.insert(category.trim()) {
                anyhow::bail!(
                    "Configuration error: duplicate category '{}' in target_categories",
                    category
                );
            }
            if category.trim() == self.source_tab.trim() {
                anyhow::bail!(
                    "Configuration error: category '{}' would overwrite the source tab",
                    category
                );
            }
        }

        self.status_prefix_regex()?;

        let output = self.columns.output_headers();
        let unique: HashSet<_> = output.iter().collect();
        if unique.len() != output.len() {
            anyhow::bail!("Configuration error: output column names must be distinct");
        }

        if self.layout.output_columns as usize != output.len() {
            anyhow::bail!(
                "Configuration error: layout.output_columns is {} but {} columns are written",
                self.layout.output_columns,
                output.len()
            );
        }
        if self.layout.column_widths.len() > self.layout.output_columns as usize {
            anyhow::bail!(
                "Configuration error: {} column widths given for {} output columns",
                self.layout.column_widths.len(),
                self.layout.output_columns
            );
        }
        if self.layout.palette.is_empty() {
            anyhow::bail!("Configuration error: layout.palette is empty");
        }
        if let Some(color) = self.layout.palette.iter().find(|c| !c.is_valid()) {
            anyhow::bail!(
                "Configuration error: palette colour {:?} has a channel outside 0.0..=1.0",
                color
            );
        }
        if self.layout.new_tab_rows == 0 || self.layout.new_tab_columns == 0 {
            anyhow::bail!("Configuration error: new tab dimensions must be non-zero");
        }

        Ok(())
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: "1SM1IaPZiVGrOwvREzG9nOTEBwLRfdbkVMsbn2Cfw1Jw".to_string(),
            source_tab: "Архив новостей (исходный формат)".to_string(),
            target_categories: vec![
                "M2M".to_string(),
                "UC".to_string(),
                "Связь для бизнеса".to_string(),
                "Конвергентные продукты для бизнеса".to_string(),
            ],
            status_prefix: r"Новость\s*-\s*".to_string(),
            skip_invalid_timestamps: false,
            pause_between_categories_ms: 0,
            columns: ColumnNames::default(),
            layout: LayoutConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Header names used in the source tab and in the published tabs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub timestamp: String,
    pub category: String,
    pub week: String,
    pub item: String,
    pub status: String,
}

impl ColumnNames {
    /// Headers of a published category tab, in column order
    pub fn output_headers(&self) -> Vec<String> {
        vec![self.week.clone(), self.item.clone(), self.status.clone()]
    }
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            timestamp: "Отметка времени".to_string(),
            category: "Направление".to_string(),
            week: "Номер недели".to_string(),
            item: "Новость".to_string(),
            status: "Статус".to_string(),
        }
    }
}

/// Cosmetic layout of the published tabs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Pixel widths of the leading columns (A, B, C, ...)
    pub column_widths: Vec<u32>,
    /// Number of columns kept visible; everything to the right is pruned or hidden
    pub output_columns: u32,
    /// Grid size used when a destination tab has to be created
    pub new_tab_rows: u32,
    pub new_tab_columns: u32,
    /// Zebra colours, cycled once per week block
    pub palette: Vec<Color>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            column_widths: vec![100, 1700, 160],
            output_columns: 3,
            new_tab_rows: 1000,
            new_tab_columns: 10,
            palette: vec![
                Color::new(0.95, 0.95, 0.95),
                Color::new(0.87, 0.94, 0.98),
                Color::new(0.98, 0.90, 0.90),
                Color::new(0.90, 0.96, 0.87),
                Color::new(0.99, 0.95, 0.86),
                Color::new(0.93, 0.88, 0.98),
            ],
        }
    }
}

/// RGB colour with channels in 0.0..=1.0, as the Sheets API expects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Color {
    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    fn is_valid(&self) -> bool {
        [self.red, self.green, self.blue]
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
    }
}

/// Credentials used to reach the Sheets API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Service-account key file (JSON)
    pub key_path: PathBuf,
    pub scopes: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key_path: PathBuf::from("service_key.json"),
            scopes: vec![
                "https://www.googleapis.com/auth/spreadsheets".to_string(),
                "https://www.googleapis.com/auth/drive".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = NewsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layout.palette.len(), 6);
        assert_eq!(config.target_categories.len(), 4);
        assert_eq!(
            config.columns.output_headers(),
            vec!["Номер недели", "Новость", "Статус"]
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
source_tab = "Raw"
target_categories = ["M2M", "UC"]

[layout]
output_columns = 3
palette = [{{ red = 1.0, green = 1.0, blue = 1.0 }}]
"#
        )
        .unwrap();

        let config = NewsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.source_tab, "Raw");
        assert_eq!(config.target_categories, vec!["M2M", "UC"]);
        assert_eq!(config.layout.palette, vec![Color::new(1.0, 1.0, 1.0)]);
        // Untouched sections come from Default
        assert_eq!(config.layout.column_widths, vec![100, 1700, 160]);
        assert_eq!(config.columns.timestamp, "Отметка времени");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = NewsConfig::default();

        let mut bad = config.clone();
        bad.target_categories.clear();
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.target_categories.push("UC".to_string());
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.target_categories.push(bad.source_tab.clone());
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.status_prefix = "(unclosed".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.layout.palette.clear();
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.layout.palette[0] = Color::new(1.5, 0.0, 0.0);
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.layout.column_widths.push(80);
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.columns.status = bad.columns.item.clone();
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.layout.output_columns = 0;
        assert!(bad.validate().is_err());

        // Fewer output columns would prune the status column on every run
        let mut bad = config;
        bad.layout.output_columns = 2;
        bad.layout.column_widths = vec![100, 1700];
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("output_columns"));
    }
}
