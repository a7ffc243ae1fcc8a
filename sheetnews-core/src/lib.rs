//! sheetnews: reshape weekly news submissions into per-category sheets
//!
//! The submissions tab holds one row per form answer and one column per news
//! slot. This crate melts it into (week, item, status) rows, splits them by
//! category and republishes each category to its own formatted tab.

pub mod config;
pub mod normalize;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod sheets;
pub mod split;
pub mod table;
pub mod zebra;

pub use config::NewsConfig;
pub use pipeline::{Pipeline, Prepared};
pub use report::{CategoryReport, RunReport};
pub use sheets::{MemoryBackend, SheetsBackend, SheetsError};
