//! The download-and-rewrite pipeline.
//!
//! ```text
//! scan ──► for each post: read ─► rewrite (resolve via cache/fetch) ─► write if changed
//! ```
//!
//! Posts are handled strictly one at a time and each post is written at most
//! once, after every reference in it has been resolved. The image directory is
//! the only state shared between posts.
//!
//! Download failures are absorbed per reference (the remote URL stays in the
//! post). Filesystem errors end the run.

use crate::cache::{CacheStats, ImageCache};
use crate::config::Config;
use crate::fetch::{Fetch, HttpFetcher};
use crate::reference::{self, ImageReference};
use crate::rewrite;
use crate::scan;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What happened to one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// Reference occurrences now pointing at local files.
    pub resolved: usize,
    /// Eligible occurrences left remote because the download failed.
    pub failed: usize,
    /// Whether the post was rewritten on disk.
    pub updated: bool,
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_scanned: usize,
    /// Posts that had at least one eligible reference.
    pub files: Vec<FileReport>,
    pub cache: CacheStats,
}

impl RunSummary {
    pub fn any_updated(&self) -> bool {
        self.files.iter().any(|f| f.updated)
    }

    pub fn updated_count(&self) -> usize {
        self.files.iter().filter(|f| f.updated).count()
    }
}

/// Run the pipeline over `config.root_dir` using the real HTTP client.
pub fn run(config: &Config) -> Result<RunSummary, ProcessError> {
    let fetcher = HttpFetcher::from_config(config);
    run_with_fetcher(config, &fetcher)
}

/// Run the pipeline with a specific fetcher (allows testing with a mock).
pub fn run_with_fetcher(config: &Config, fetcher: &dyn Fetch) -> Result<RunSummary, ProcessError> {
    let mut cache = ImageCache::new(config.image_path());
    let mut summary = RunSummary::default();

    tracing::info!(
        root = %config.root_dir.display(),
        images = %cache.dir().display(),
        "scanning for markdown files"
    );
    for path in scan::markdown_files(&config.root_dir) {
        summary.files_scanned += 1;
        let report = process_file(&path, config, &mut cache, fetcher)?;
        if report.resolved > 0 || report.failed > 0 {
            summary.files.push(report);
        }
    }

    summary.cache = cache.into_stats();
    tracing::info!(
        scanned = summary.files_scanned,
        updated = summary.updated_count(),
        "run complete"
    );
    Ok(summary)
}

/// Localize the eligible image references in a single post.
///
/// The post is rewritten only when at least one reference resolved and the
/// text actually changed.
pub fn process_file(
    path: &Path,
    config: &Config,
    cache: &mut ImageCache,
    fetcher: &dyn Fetch,
) -> Result<FileReport, ProcessError> {
    let original = fs::read_to_string(path).map_err(|source| ProcessError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let rewrite = rewrite::rewrite_document(
        &original,
        &config.allowed_hosts,
        |url: &str| -> Result<Option<String>, ProcessError> {
            let local = cache.resolve(url, fetcher)?;
            Ok(local.and_then(|p| local_reference(&config.image_dir, &p)))
        },
    )?;

    let updated = rewrite.changed(&original);
    if updated {
        fs::write(path, &rewrite.text).map_err(|source| ProcessError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            resolved = rewrite.resolved,
            failed = rewrite.failed,
            "rewrote post"
        );
    } else {
        tracing::debug!(path = %path.display(), "no changes");
    }

    Ok(FileReport {
        path: path.to_path_buf(),
        resolved: rewrite.resolved,
        failed: rewrite.failed,
        updated,
    })
}

/// References found in one post, for the read-only `check` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub path: PathBuf,
    pub references: Vec<ImageReference>,
}

impl CheckReport {
    pub fn eligible(&self) -> impl Iterator<Item = &ImageReference> {
        self.references.iter().filter(|r| r.eligible)
    }
}

/// List the image references of every post without downloading or writing.
///
/// Posts without any image reference are omitted.
pub fn check(config: &Config) -> Result<Vec<CheckReport>, ProcessError> {
    let mut reports = Vec::new();
    for path in scan::markdown_files(&config.root_dir) {
        let text = fs::read_to_string(&path).map_err(|source| ProcessError::Read {
            path: path.clone(),
            source,
        })?;
        let references = reference::find_references(&text, &config.allowed_hosts);
        if !references.is_empty() {
            reports.push(CheckReport { path, references });
        }
    }
    Ok(reports)
}

/// The string written into posts for a cached file: `<image_dir>/<file name>`.
fn local_reference(image_dir: &str, path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    Some(format!("{image_dir}/{name}"))
}
