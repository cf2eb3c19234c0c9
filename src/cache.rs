//! On-disk image cache.
//!
//! The image directory *is* the cache. There is no manifest: because every
//! URL maps to a deterministic filename (see [`crate::naming`]), a file that
//! already exists under that name is the image for that URL, and a second run
//! over the same posts never touches the network for it.
//!
//! ## Lookup order
//!
//! 1. The name derived from the URL alone (`pic-<digest>.png`). Exists → hit.
//! 2. When the URL has no extension, the derived name carries the `.bin`
//!    placeholder. A previous run may have stored the image under its real
//!    extension (`pic-<digest>.png`), so any `pic-<digest>.*` file is a hit.
//! 3. Otherwise download once. If the extension was still unknown, the name is
//!    re-derived from the response `Content-Type` and re-checked before the
//!    body is written.
//!
//! Download failures are reported as `Ok(None)`; only filesystem errors are
//! returned as `Err`.

use crate::fetch::Fetch;
use crate::naming::LocalName;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The image directory plus running statistics for this run.
#[derive(Debug)]
pub struct ImageCache {
    dir: PathBuf,
    stats: CacheStats,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stats: CacheStats::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn into_stats(self) -> CacheStats {
        self.stats
    }

    /// Return the local file holding the image at `url`, downloading it with
    /// `fetcher` if no cached copy exists.
    ///
    /// `Ok(None)` means the download failed; the caller keeps the remote URL.
    pub fn resolve(&mut self, url: &str, fetcher: &dyn Fetch) -> io::Result<Option<PathBuf>> {
        let local = LocalName::derive(url, None);
        let target = self.dir.join(local.file_name());

        if target.is_file() {
            tracing::debug!(url, path = %target.display(), "cache hit");
            self.stats.hit();
            return Ok(Some(target));
        }

        if local.has_placeholder_extension()
            && let Some(existing) = self.find_variant(&local.base())?
        {
            tracing::debug!(url, path = %existing.display(), "cache hit (typed variant)");
            self.stats.hit();
            return Ok(Some(existing));
        }

        let fetched = match fetcher.fetch(url) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(url, error = %e, "download failed, keeping remote reference");
                self.stats.failure();
                return Ok(None);
            }
        };

        let target = if local.has_placeholder_extension() {
            let corrected = LocalName::derive(url, fetched.content_type.as_deref());
            let corrected_path = self.dir.join(corrected.file_name());
            if corrected_path.is_file() {
                tracing::debug!(url, path = %corrected_path.display(), "cache hit after content-type lookup");
                self.stats.hit();
                return Ok(Some(corrected_path));
            }
            corrected_path
        } else {
            target
        };

        fs::create_dir_all(&self.dir)?;
        fs::write(&target, &fetched.body)?;
        tracing::info!(
            url,
            path = %target.display(),
            bytes = fetched.body.len(),
            "downloaded image"
        );
        self.stats.download();
        Ok(Some(target))
    }

    /// First file (by name) in the cache directory named `<base>.<ext>`.
    fn find_variant(&self, base: &str) -> io::Result<Option<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let prefix = format!("{base}.");
        let mut matches: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(&prefix) && n.len() > prefix.len())
            })
            .collect();
        matches.sort();
        Ok(matches.into_iter().next())
    }
}

/// Summary of cache performance for a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub downloads: u32,
    pub failures: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn download(&mut self) {
        self.downloads += 1;
    }

    pub fn failure(&mut self) {
        self.failures += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.downloads + self.failures
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures > 0 {
            write!(
                f,
                "{} cached, {} downloaded, {} failed ({} total)",
                self.hits,
                self.downloads,
                self.failures,
                self.total()
            )
        } else if self.hits > 0 {
            write!(
                f,
                "{} cached, {} downloaded ({} total)",
                self.hits,
                self.downloads,
                self.total()
            )
        } else {
            write!(f, "{} downloaded", self.downloads)
        }
    }
}
