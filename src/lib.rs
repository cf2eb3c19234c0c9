//! # CDN Image Downloader
//!
//! Mirrors CDN-hosted images referenced by a directory of markdown posts into
//! a local `image/` folder and rewrites the references to point at the local
//! copies. Everything else in a post (plain links, bare URLs, fenced code
//! examples) is left exactly as it was.
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan      data/posts/**/*.md         →  sorted list of posts
//! 2. Extract   post text (fences hidden)  →  eligible image URLs
//! 3. Fetch     URL                        →  data/posts/image/<name>  (or cache hit)
//! 4. Rewrite   post text                  →  written back if anything changed
//! ```
//!
//! Posts are processed one at a time, references one at a time, with one
//! request in flight at most. The image directory doubles as the cache:
//! filenames are a pure function of the URL, so a second run finds every
//! image already present and, because rewritten posts now point at local
//! paths, has nothing left to fetch.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Recursive, sorted markdown file discovery |
//! | [`fence`] | Hides fenced code blocks behind placeholders and restores them |
//! | [`reference`] | Markdown `![]()` and HTML `<img src>` matching, allow-list check |
//! | [`naming`] | URL → `<stem>-<digest>.<ext>` local filename |
//! | [`fetch`] | [`Fetch`](fetch::Fetch) trait and the blocking HTTP client |
//! | [`cache`] | Image directory lookups, downloads, and run statistics |
//! | [`rewrite`] | Pattern-scoped substitution of resolved references |
//! | [`process`] | The per-post pipeline and the read-only `check` listing |
//! | [`config`] | Allow-listed hosts, root directory, and download settings |
//! | [`output`] | CLI report formatting |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## Patterns, Not a Markdown Parser
//!
//! Only two syntactic shapes matter, and everything around them must survive
//! byte for byte. A parser would have to round-trip the whole document;
//! two regular expressions only touch what they match.
//!
//! ## Skip on Error
//!
//! A failed download leaves that reference pointing at the CDN and the run
//! carries on. There are no retries; running the tool again is the retry.
//! Filesystem errors, on the other hand, stop the run.

pub mod cache;
pub mod config;
pub mod fence;
pub mod fetch;
pub mod logging;
pub mod naming;
pub mod output;
pub mod process;
pub mod reference;
pub mod rewrite;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
