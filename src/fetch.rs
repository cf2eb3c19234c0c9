//! Downloading remote images.
//!
//! The [`Fetch`] trait is the single seam between the pipeline and the
//! network. The production implementation is [`HttpFetcher`], a blocking
//! `ureq` agent with a fixed timeout and a descriptive `User-Agent`. Tests
//! swap in a recording mock so rewriting and caching can be exercised without
//! sockets.
//!
//! A fetch makes exactly one request. Timeouts, connection failures, and
//! non-2xx statuses all come back as [`FetchError`]; the caller decides what
//! to do with them (the pipeline leaves the reference untouched).

use crate::config::Config;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("IO error reading body: {0}")]
    Io(#[from] std::io::Error),
}

/// A successfully downloaded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub body: Vec<u8>,
    /// Raw `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
}

/// Something that can GET a URL.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Fetched, FetchError>;
}

/// Blocking HTTP(S) fetcher backed by a shared `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self { agent }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.timeout(), &config.user_agent)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        let response = match self.agent.get(url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, _)) => return Err(FetchError::Status(code)),
            Err(ureq::Error::Transport(t)) => return Err(FetchError::Transport(t.to_string())),
        };

        let content_type = response.header("Content-Type").map(str::to_string);
        let mut body = Vec::new();
        response.into_reader().read_to_end(&mut body)?;

        Ok(Fetched { body, content_type })
    }
}
