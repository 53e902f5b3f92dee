//! Run summary printing
//!
//! This module renders the report of a finished crawl for the terminal.

use crate::crawler::CrawlReport;
use std::fmt::Write;

/// Renders the run summary as text
///
/// Lists every auto-skipped URL explicitly so the operator can look at them.
pub fn format_summary(report: &CrawlReport) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    let _ = writeln!(out, "=== Crawl Summary ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Pages fetched: {}", stats.fetched);
    let _ = writeln!(out, "  Pages converted: {}", stats.converted);
    let _ = writeln!(out, "  Conversion failures: {}", stats.convert_failed);
    let _ = writeln!(out, "  Fetch failures: {}", stats.failed);
    let _ = writeln!(out, "  Skipped: {}", stats.skipped);
    let _ = writeln!(out, "  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    let _ = writeln!(out);

    let _ = writeln!(out, "Non-fatal errors ({}):", stats.error_total());
    let _ = writeln!(out, "  Conversion: {}", stats.convert_failed);
    let _ = writeln!(out, "  Fetch: {}", stats.failed);
    let _ = writeln!(out, "  Checkpoint persistence: {}", stats.persistence_errors);
    let _ = writeln!(out, "  Image downloads: {}", stats.image_failures);
    let _ = writeln!(out);

    if !report.auto_skipped.is_empty() {
        let _ = writeln!(out, "Auto-skipped URLs ({}):", report.auto_skipped.len());
        for url in &report.auto_skipped {
            let _ = writeln!(out, "  - {}", url);
        }
        let _ = writeln!(out);
    }

    let success_rate = if stats.fetched > 0 {
        (stats.converted as f64 / stats.fetched as f64) * 100.0
    } else {
        0.0
    };

    let _ = writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} pages converted)",
        success_rate, stats.converted, stats.fetched
    );

    out
}

/// Prints the run summary to stdout
pub fn print_summary(report: &CrawlReport) {
    print!("{}", format_summary(report));
}
