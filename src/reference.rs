//! Image reference extraction.
//!
//! Two syntactic shapes count as image references:
//!
//! | Form | Example | Replaced part |
//! |------|---------|---------------|
//! | Markdown | `![alt](https://host/p.png "title")` | the URL; alt and title are kept |
//! | HTML | `<img class="x" src="https://host/p.png">` | the `src` value; the rest of the tag is kept |
//!
//! Plain links (`[text](url)`), bare URLs, and anything inside fenced code
//! blocks are never references. Matching is deliberately a pair of regular
//! expressions rather than a markdown parser: the tool only needs to find
//! these two shapes and must reproduce everything else byte for byte.
//!
//! A reference is *eligible* for download when its URL is `http`/`https` and
//! its host is in the configured allow-list. See [`is_eligible`].

use crate::fence;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// `![alt](target)` where target runs to the first unescaped `)`.
///
/// Groups: 1 = alt text, 2 = raw target.
pub(crate) static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(((?:\\.|[^)\\])+)\)").expect("valid regex")
});

/// `<img ... src="url">` / `<img ... src='url'>` with matching quotes.
///
/// Groups: 1 = tag text up to and including `src=`, 2 = double-quoted value,
/// 3 = single-quoted value. `\s` before `src` keeps `data-src` out. A value
/// never spans `>` or a newline, so a stray quote cannot swallow later text.
pub(crate) static HTML_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*?\ssrc\s*=\s*)(?:"([^"\n>]*)"|'([^'\n>]*)')"#)
        .expect("valid regex")
});

/// Syntactic form of a reference. Decides how replacement text is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefForm {
    Markdown,
    Html,
}

impl fmt::Display for RefForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefForm::Markdown => write!(f, "markdown"),
            RefForm::Html => write!(f, "html"),
        }
    }
}

/// One image reference found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub form: RefForm,
    pub url: String,
    pub eligible: bool,
}

/// A markdown image target split into URL and title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownTarget<'a> {
    /// The URL, without surrounding whitespace or angle brackets, with
    /// backslash escapes resolved (`x\).png` is `x).png`).
    pub url: Cow<'a, str>,
    /// Everything after the URL, including the whitespace that separated it
    /// (e.g. `` "title"`` with its leading space). Empty when absent.
    pub title: &'a str,
}

/// Split the raw text between `(` and `)` of a markdown image.
///
/// Handles `url`, `<url>`, `url "title"`, `url 'title'`, and `<url> "title"`.
/// Surrounding whitespace is dropped; the title keeps its original leading
/// delimiter so it can be reassembled verbatim.
pub fn parse_markdown_target(raw: &str) -> MarkdownTarget<'_> {
    let cleaned = raw.trim();

    if let Some(rest) = cleaned.strip_prefix('<')
        && let Some(close) = rest.find('>')
    {
        return MarkdownTarget {
            url: unescape(rest[..close].trim()),
            title: &rest[close + 1..],
        };
    }

    let cleaned = cleaned.trim_end_matches('>');
    match cleaned.find(char::is_whitespace) {
        Some(split) => MarkdownTarget {
            url: unescape(&cleaned[..split]),
            title: &cleaned[split..],
        },
        None => MarkdownTarget {
            url: unescape(cleaned),
            title: "",
        },
    }
}

/// Resolve markdown backslash escapes: `\` before ASCII punctuation is
/// dropped, any other backslash is literal.
pub fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// True if `url` is `http(s)` and its host is in `allowed_hosts`.
///
/// Hosts in the set must already be lowercase (see
/// [`Config::validate`](crate::config::Config::validate)); the URL host is
/// lowercased by the parser.
pub fn is_eligible(url: &str, allowed_hosts: &BTreeSet<String>) -> bool {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return false;
    }
    match url::Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| allowed_hosts.contains(&h.to_ascii_lowercase()))
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// List every image reference in `text`, ignoring fenced code blocks.
///
/// Markdown references come first, then HTML ones, each in document order.
/// This mirrors the order in which a rewrite resolves them.
pub fn find_references(text: &str, allowed_hosts: &BTreeSet<String>) -> Vec<ImageReference> {
    let protected = fence::protect(text);
    scan_protected(&protected.text)
        .into_iter()
        .filter(|(_, url)| !url.is_empty())
        .map(|(form, url)| ImageReference {
            form,
            eligible: is_eligible(&url, allowed_hosts),
            url: url.into_owned(),
        })
        .collect()
}

/// `(form, url)` pairs in resolution order, from already-protected text.
/// Markdown URLs come back unescaped; HTML values as written.
pub(crate) fn scan_protected(text: &str) -> Vec<(RefForm, Cow<'_, str>)> {
    let markdown = MARKDOWN_IMAGE.captures_iter(text).filter_map(|caps| {
        let raw = caps.get(2)?.as_str();
        Some((RefForm::Markdown, parse_markdown_target(raw).url))
    });
    let html = HTML_IMAGE.captures_iter(text).filter_map(|caps| {
        let value = caps.get(2).or_else(|| caps.get(3))?;
        Some((RefForm::Html, Cow::Borrowed(value.as_str())))
    });
    markdown.chain(html).collect()
}
