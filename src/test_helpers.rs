//! Shared test utilities.
//!
//! Provides a recording [`MockFetcher`] and small helpers for laying out a
//! posts directory in a temp dir.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_post(tmp.path(), "hello.md", "![a](https://cdn.nlark.com/a.png)");
//! let fetcher = MockFetcher::new().with_image("https://cdn.nlark.com/a.png", b"png", Some("image/png"));
//! let summary = run_with_fetcher(&test_config(tmp.path()), &fetcher).unwrap();
//! assert_eq!(fetcher.calls().len(), 1);
//! ```

use crate::config::Config;
use crate::fetch::{Fetch, FetchError, Fetched};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

// =========================================================================
// Mock fetcher
// =========================================================================

#[derive(Debug, Clone)]
enum MockResponse {
    Image(Fetched),
    Status(u16),
}

/// Fetcher that serves canned responses and records every URL requested.
///
/// URLs with no canned response fail as a transport error, like an
/// unreachable host.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, MockResponse>,
    calls: RefCell<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: &str, body: &[u8], content_type: Option<&str>) -> Self {
        self.responses.insert(
            url.to_string(),
            MockResponse::Image(Fetched {
                body: body.to_vec(),
                content_type: content_type.map(str::to_string),
            }),
        );
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses
            .insert(url.to_string(), MockResponse::Status(status));
        self
    }

    /// Every URL requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Fetch for MockFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        self.calls.borrow_mut().push(url.to_string());
        match self.responses.get(url) {
            Some(MockResponse::Image(fetched)) => Ok(fetched.clone()),
            Some(MockResponse::Status(code)) => Err(FetchError::Status(*code)),
            None => Err(FetchError::Transport(format!("no route to {url}"))),
        }
    }
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Config rooted at `root` with `cdn.nlark.com` allow-listed.
pub fn test_config(root: &Path) -> Config {
    Config {
        allowed_hosts: BTreeSet::from(["cdn.nlark.com".to_string()]),
        root_dir: root.to_path_buf(),
        ..Config::default()
    }
}

/// Write a post at `root/rel`, creating parent directories.
pub fn write_post(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Read a post back as a string.
pub fn read_post(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap()
}

/// Names of all files in the image directory, sorted.
pub fn image_files(config: &Config) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(config.image_path()) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
