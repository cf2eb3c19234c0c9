//! Run configuration.
//!
//! Everything the downloader needs to know about its environment lives in a
//! single [`Config`] value that is passed into [`crate::process::run`]. The
//! stock defaults match the blog layout the tool was written for: posts under
//! `data/posts/`, images under `data/posts/image/`, and `cdn.nlark.com` as the
//! only host worth mirroring.
//!
//! ## Config File
//!
//! An optional TOML file (by default `cdn-images.toml` in the working
//! directory) overrides the defaults:
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! allowed_hosts = ["cdn.nlark.com"]      # Hosts whose images are downloaded
//! root_dir = "data/posts"                # Directory scanned for markdown
//! image_dir = "image"                    # Image folder, relative to root_dir
//! timeout_secs = 30                      # Per-request timeout
//! user_agent = "cdn-image-downloader/1.0"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cdn-images.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Downloader configuration.
///
/// `allowed_hosts` and `root_dir` are the two tunables that decide what the
/// run touches; the remaining fields shape the download itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Hostnames whose images are downloaded and rewritten. Compared
    /// case-insensitively against the parsed URL host.
    pub allowed_hosts: BTreeSet<String>,
    /// Directory scanned recursively for markdown files.
    pub root_dir: PathBuf,
    /// Image folder name, relative to `root_dir`. Also the prefix written
    /// into rewritten references (`image/<file>`).
    pub image_dir: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every download.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_hosts: BTreeSet::from(["cdn.nlark.com".to_string()]),
            root_dir: PathBuf::from("data/posts"),
            image_dir: "image".to_string(),
            timeout_secs: 30,
            user_agent: "cdn-image-downloader/1.0".to_string(),
        }
    }
}

impl Config {
    /// Validate values and normalise hosts to lowercase.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.allowed_hosts.is_empty() {
            return Err(ConfigError::Validation(
                "allowed_hosts must not be empty".into(),
            ));
        }
        for host in &self.allowed_hosts {
            if host.is_empty() || host.contains(['/', ':', ' ']) {
                return Err(ConfigError::Validation(format!(
                    "allowed_hosts entry '{host}' must be a bare hostname"
                )));
            }
        }
        self.allowed_hosts = self
            .allowed_hosts
            .into_iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();

        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than zero".into(),
            ));
        }

        let mut components = Path::new(&self.image_dir).components();
        let single_normal = matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();
        if !single_normal {
            return Err(ConfigError::Validation(format!(
                "image_dir '{}' must be a single relative directory name",
                self.image_dir
            )));
        }
        Ok(self)
    }

    /// Absolute-or-relative path of the image cache directory.
    pub fn image_path(&self) -> PathBuf {
        self.root_dir.join(&self.image_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load configuration from `path`, falling back to stock defaults when the
/// file does not exist.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = if path.exists() {
        let content = fs::read_to_string(path)?;
        toml::from_str::<Config>(&content)?
    } else {
        Config::default()
    };
    config.validate()
}

/// A documented config file with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r#"# cdn-image-downloader configuration
#
# All options are optional. Values shown are the defaults.

# Hosts whose images are downloaded and rewritten to local copies.
# Anything else (including plain links and raw URLs) is left alone.
allowed_hosts = ["cdn.nlark.com"]

# Directory scanned recursively for .md / .markdown files.
root_dir = "data/posts"

# Image folder name relative to root_dir. Rewritten references use
# this as their prefix, e.g. ![x](image/pic-0123456789.png).
image_dir = "image"

# Seconds to wait for a single download before giving up on it.
timeout_secs = 30

# User-Agent header sent with every download.
user_agent = "cdn-image-downloader/1.0"
"#
}
