//! Markdown file discovery.
//!
//! Walks the posts directory recursively and yields every `.md` /
//! `.markdown` file (extension matched case-insensitively). Paths come out
//! sorted so runs are reproducible: the same tree always produces the same
//! download order and the same log.
//!
//! A missing root is not an error: there is simply nothing to do. Entries that
//! cannot be read while walking are skipped. Symlinked files are included;
//! symlinked directories are not descended into.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Sorted markdown files under `root`.
///
/// The walk happens up front (sorting needs the full listing); the returned
/// iterator hands the paths out one at a time and cannot be restarted.
pub fn markdown_files(root: &Path) -> std::vec::IntoIter<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_markdown(p))
        .collect();
    files.sort();
    files.into_iter()
}

/// Whether `path` has a markdown extension.
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MARKDOWN_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
