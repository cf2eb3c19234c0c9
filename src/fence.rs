//! Fenced code block protection.
//!
//! Documentation posts routinely show image syntax inside ```` ``` ```` fences
//! as examples. Those must never be rewritten, so before any reference
//! matching runs every fenced block is swapped for a placeholder token and the
//! original text is kept aside. [`Protected::restore`] puts the blocks back
//! verbatim once all substitutions are done.
//!
//! Fences pair greedily from first to last: each opening ```` ``` ```` closes
//! at the next ```` ``` ````, and an unmatched trailing fence is left as
//! ordinary text.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}CODE_BLOCK_([0-9]+)\u{E001}").expect("valid regex"));

/// Document text with its fenced code blocks replaced by placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Protected {
    /// Text with each fenced block replaced by a unique placeholder.
    pub text: String,
    /// Original fenced blocks, indexed by placeholder number.
    blocks: Vec<String>,
}

/// Placeholder token for block `index`.
///
/// Private-use code points delimit the token so it cannot collide with
/// anything a markdown author would plausibly type, and neither the image
/// nor the `<img>` patterns can match across it.
fn placeholder(index: usize) -> String {
    format!("\u{E000}CODE_BLOCK_{index}\u{E001}")
}

/// Replace every fenced code block in `text` with a placeholder.
pub fn protect(text: &str) -> Protected {
    let mut blocks = Vec::new();
    let protected = FENCED_BLOCK.replace_all(text, |caps: &Captures| {
        let token = placeholder(blocks.len());
        blocks.push(caps[0].to_string());
        token
    });
    Protected {
        text: protected.into_owned(),
        blocks,
    }
}

impl Protected {
    /// Number of fenced blocks that were set aside.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Put the original fenced blocks back into `text`.
    ///
    /// `text` is normally a rewritten version of [`Protected::text`]; the
    /// placeholders survive rewriting untouched, so every block lands back
    /// where it came from.
    pub fn restore(&self, text: &str) -> String {
        if self.blocks.is_empty() {
            return text.to_string();
        }
        PLACEHOLDER
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.blocks.get(i))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
