//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Run
//!
//! By default a run prints only the summary sentence:
//!
//! ```text
//! Updated CDN image links and downloaded images.
//! ```
//!
//! With `--verbose`, each updated or partly failed file is listed first:
//!
//! ```text
//! 001 notes/2024-setup.md
//!     3 images localized
//! 002 travel.md
//!     1 image localized, 1 failed (left remote)
//!
//! Images: 2 cached, 2 downloaded, 1 failed (5 total)
//! Updated CDN image links and downloaded images.
//! ```
//!
//! The last line is always one of the two summary sentences, so scripts can
//! match on it.
//!
//! ## Check
//!
//! ```text
//! 001 travel.md
//!     markdown https://cdn.nlark.com/a.png
//!     html     https://example.com/b.png (skipped: host not allowed)
//!
//! 1 of 2 references would be downloaded
//! ```

use crate::process::{CheckReport, FileReport, RunSummary};
use std::path::Path;

pub const UPDATED_MESSAGE: &str = "Updated CDN image links and downloaded images.";
pub const UNCHANGED_MESSAGE: &str = "No CDN images to update.";

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Path relative to the posts root when possible, with `/` separators.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// The closing line of every run.
pub fn summary_line(any_updated: bool) -> &'static str {
    if any_updated {
        UPDATED_MESSAGE
    } else {
        UNCHANGED_MESSAGE
    }
}

fn file_detail(report: &FileReport) -> String {
    let mut line = format!("{} localized", plural(report.resolved, "image"));
    if report.failed > 0 {
        line.push_str(&format!(", {} failed (left remote)", report.failed));
    }
    line
}

pub fn format_run_output(summary: &RunSummary, root: &Path, verbose: bool) -> Vec<String> {
    if !verbose {
        return vec![summary_line(summary.any_updated()).to_string()];
    }
    let mut lines = Vec::new();
    for (i, report) in summary.files.iter().enumerate() {
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            display_path(&report.path, root)
        ));
        lines.push(format!("    {}", file_detail(report)));
    }
    if summary.cache.total() > 0 {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("Images: {}", summary.cache));
    }
    lines.push(summary_line(summary.any_updated()).to_string());
    lines
}

pub fn print_run_output(summary: &RunSummary, root: &Path, verbose: bool) {
    for line in format_run_output(summary, root, verbose) {
        println!("{}", line);
    }
}

pub fn format_check_output(reports: &[CheckReport], root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let mut total = 0;
    let mut eligible = 0;
    for (i, report) in reports.iter().enumerate() {
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            display_path(&report.path, root)
        ));
        for r in &report.references {
            total += 1;
            let form = format!("{:<8}", r.form.to_string());
            if r.eligible {
                eligible += 1;
                lines.push(format!("    {} {}", form, r.url));
            } else {
                lines.push(format!(
                    "    {} {} (skipped: host not allowed)",
                    form, r.url
                ));
            }
        }
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} of {} would be downloaded",
        eligible,
        plural(total, "reference")
    ));
    lines
}

pub fn print_check_output(reports: &[CheckReport], root: &Path) {
    for line in format_check_output(reports, root) {
        println!("{}", line);
    }
}
