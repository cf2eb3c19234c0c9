//! Logging init: structured `tracing` events to stderr.
//!
//! Stdout is reserved for the run report (see [`crate::output`]), so log
//! lines never interleave with the summary a script might parse. `RUST_LOG`
//! overrides the default filter.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,cdn_image_downloader=info";
const VERBOSE_FILTER: &str = "warn,cdn_image_downloader=debug";

/// Default filter directive for the given verbosity.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
