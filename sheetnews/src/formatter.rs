//! Output formatters for run reports

use anyhow::Result;
use colored::*;
use sheetnews_core::{CategoryReport, RunReport};

/// Print the report in human-readable format with colors
pub fn print_human(report: &RunReport) {
    println!(
        "{}",
        format!("Source: {} / {}", report.spreadsheet_id, report.source_tab).bold()
    );
    println!(
        "  {} submissions, {} news items",
        report.source_rows, report.normalized_rows
    );
    println!();

    if !report.published {
        println!("{}", "Dry run, nothing written".yellow().bold());
        println!();
    }

    println!("{}", "Categories:".bold().underline());
    for category in &report.categories {
        print_category(category);
    }
    println!();

    let unrouted = report.unrouted_rows();
    if unrouted > 0 {
        println!(
            "  {} {} items belong to other categories",
            "Skipped:".yellow().bold(),
            unrouted
        );
    }
    let status = if report.published {
        "✓ Published".green().bold()
    } else {
        "✓ Ready to publish".green().bold()
    };
    println!(
        "{} {} rows across {} tabs",
        status,
        report.published_rows(),
        report.categories.len()
    );
}

fn print_category(category: &CategoryReport) {
    let mut notes = Vec::new();
    if category.created_tab {
        notes.push("new tab".cyan().to_string());
    }
    if category.maintenance_skipped {
        notes.push("columns not maintained".yellow().to_string());
    }
    if category.rows == 0 {
        notes.push("empty".bright_black().to_string());
    }

    let notes = if notes.is_empty() {
        String::new()
    } else {
        format!(" ({})", notes.join(", "))
    };
    println!(
        "  {} {} rows, {} weeks, {} blocks{}",
        category.category.cyan().bold(),
        category.rows,
        category.weeks,
        category.zebra_blocks,
        notes
    );
}

/// Print the report in JSON format
pub fn print_json(report: &RunReport) -> Result<()> {
    let output = serde_json::json!({
        "report": report,
        "summary": {
            "published_rows": report.published_rows(),
            "unrouted_rows": report.unrouted_rows(),
            "tabs": report.categories.len(),
        }
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
