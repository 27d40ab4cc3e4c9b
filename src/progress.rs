//! Progress reporting for the scan-indexer CLI
//!
//! A spinner showing scan and index counters, plus the header and summary
//! printed around a run.

use crate::db::IndexStatsSnapshot;
use crate::scan::ScanStats;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner that displays scan and indexing status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(spinner) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, queued: usize, index: &IndexStatsSnapshot) {
        let msg = format!(
            "Queued: {} | Indexed: {} | Batches: {}",
            format_number(queued as u64),
            format_number(index.rows_written()),
            index.batches_committed,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the run
pub fn print_header(roots: &[String], engine: &str, target: &str) {
    println!();
    println!(
        "{} {}",
        style("scan-indexer").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    for root in roots {
        println!("  {} {}", style("Root:").bold(), root);
    }
    println!("  {} {} ({})", style("Database:").bold(), target, engine);
    println!();
}

/// Print a summary of the scan and what reached the database
pub fn print_summary(scan: &ScanStats, index: &IndexStatsSnapshot, duration: Duration) {
    let duration_secs = duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        index.files_written as f64 / duration_secs
    } else {
        0.0
    };

    let title = if scan.interrupted {
        style("Scan Interrupted").yellow().bold()
    } else {
        style("Scan Complete").green().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Directories:").bold(), format_number(scan.dirs));
    println!("  {} {}", style("Files found:").bold(), format_number(scan.files));
    println!(
        "  {} {} files, {} shares",
        style("Indexed:").bold(),
        format_number(index.files_written),
        format_number(index.shares_written)
    );
    println!(
        "  {} {}",
        style("Indexed Size:").bold(),
        format_size(index.bytes_indexed, BINARY)
    );
    println!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if scan.errors > 0 {
        println!("  {} {}", style("Scan errors:").yellow().bold(), format_number(scan.errors));
    }
    if index.records_dropped > 0 {
        println!(
            "  {} {} records in {} rolled back batches",
            style("Dropped:").red().bold(),
            format_number(index.records_dropped),
            index.batches_rolled_back
        );
    }
    if index.shares_rejected > 0 {
        println!(
            "  {} {}",
            style("Rejected shares:").yellow().bold(),
            format_number(index.shares_rejected)
        );
    }
    println!();
}
