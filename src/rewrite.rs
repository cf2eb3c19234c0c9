//! Pattern-scoped rewriting of image references.
//!
//! Rewriting a document happens in two passes over the fence-protected text:
//!
//! 1. **Resolve**: every eligible URL is handed to the resolver once, in
//!    document order (markdown references, then `<img>` tags). Results,
//!    including failures, are memoized per document so a URL repeated in one
//!    post costs at most one download attempt.
//! 2. **Substitute**: each matched span is rebuilt in its own syntactic form
//!    with the local path in place of the URL. Text outside the two image
//!    patterns is never touched, so a URL that also appears in a plain link
//!    or in prose keeps its original spelling there.
//!
//! Resolution finishes before any substitution, so a resolver error aborts
//! the document without a half-applied rewrite.

use crate::fence;
use crate::reference::{self, HTML_IMAGE, MARKDOWN_IMAGE, RefForm};
use regex::Captures;
use std::collections::{BTreeSet, HashMap};

/// Result of rewriting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Document text after substitution, fenced blocks restored.
    pub text: String,
    /// Reference occurrences replaced with a local path.
    pub resolved: usize,
    /// Eligible occurrences left as-is because the resolver gave up on them.
    pub failed: usize,
}

impl Rewrite {
    /// True when at least one reference was rewritten and the text differs.
    pub fn changed(&self, original: &str) -> bool {
        self.resolved > 0 && self.text != original
    }
}

/// Rewrite all eligible image references in `text`.
///
/// `resolve` maps an eligible URL to the local reference to write
/// (e.g. `image/pic-0123456789.png`), or `None` when it could not be fetched.
/// Errors from `resolve` are fatal and returned unchanged.
pub fn rewrite_document<F, E>(
    text: &str,
    allowed_hosts: &BTreeSet<String>,
    mut resolve: F,
) -> Result<Rewrite, E>
where
    F: FnMut(&str) -> Result<Option<String>, E>,
{
    let protected = fence::protect(text);

    let mut local: HashMap<String, Option<String>> = HashMap::new();
    for (_, url) in reference::scan_protected(&protected.text) {
        if url.is_empty()
            || local.contains_key(&*url)
            || !reference::is_eligible(&url, allowed_hosts)
        {
            continue;
        }
        let resolved = resolve(&*url)?;
        local.insert(url.into_owned(), resolved);
    }

    let mut resolved = 0;
    let mut failed = 0;
    let mut lookup = |form: RefForm, url: &str| -> Option<String> {
        let entry = local.get(url)?;
        match entry {
            Some(path) => {
                resolved += 1;
                tracing::trace!(%form, url, path = %path, "rewriting reference");
                Some(path.clone())
            }
            None => {
                failed += 1;
                None
            }
        }
    };

    let after_markdown = MARKDOWN_IMAGE.replace_all(&protected.text, |caps: &Captures| {
        let target = reference::parse_markdown_target(&caps[2]);
        match lookup(RefForm::Markdown, &target.url) {
            Some(path) => format!("![{}]({}{})", &caps[1], path, target.title),
            None => caps[0].to_string(),
        }
    });

    let after_html = HTML_IMAGE.replace_all(&after_markdown, |caps: &Captures| {
        let (quote, value) = match (caps.get(2), caps.get(3)) {
            (Some(v), _) => ('"', v.as_str()),
            (None, Some(v)) => ('\'', v.as_str()),
            (None, None) => return caps[0].to_string(),
        };
        match lookup(RefForm::Html, value) {
            Some(path) => format!("{}{quote}{path}{quote}", &caps[1]),
            None => caps[0].to_string(),
        }
    });

    let text = protected.restore(&after_html);
    Ok(Rewrite {
        text,
        resolved,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn hosts() -> BTreeSet<String> {
        BTreeSet::from(["cdn.nlark.com".to_string()])
    }

    /// Resolver that maps every URL to `image/<last segment>` and records calls.
    fn run(text: &str) -> (Rewrite, Vec<String>) {
        let mut calls = Vec::new();
        let rewrite = rewrite_document(text, &hosts(), |url| {
            calls.push(url.to_string());
            let name = url.rsplit('/').next().unwrap_or_default();
            Ok::<_, Infallible>(Some(format!("image/{name}")))
        })
        .unwrap();
        (rewrite, calls)
    }

    #[test]
    fn markdown_title_preserved() {
        let (r, _) = run("![x](https://cdn.nlark.com/a/b/pic.png \"t\")");
        assert_eq!(r.text, "![x](image/pic.png \"t\")");
        assert_eq!(r.resolved, 1);
    }

    #[test]
    fn markdown_angle_brackets_dropped() {
        let (r, _) = run("![x]( <https://cdn.nlark.com/p.png> )");
        assert_eq!(r.text, "![x](image/p.png)");
    }

    #[test]
    fn html_quote_and_attributes_preserved() {
        let (r, _) = run("<img class=\"w\" src='https://cdn.nlark.com/p.png' width=\"3\">");
        assert_eq!(r.text, "<img class=\"w\" src='image/p.png' width=\"3\">");
    }

    #[test]
    fn ineligible_untouched_and_not_resolved() {
        let doc = "![x](https://example.com/pic.png)\n<img src=\"http://other/p.png\">";
        let (r, calls) = run(doc);
        assert_eq!(r.text, doc);
        assert_eq!(r.resolved, 0);
        assert!(calls.is_empty());
        assert!(!r.changed(doc));
    }

    #[test]
    fn repeated_url_resolved_once() {
        let doc = "![a](https://cdn.nlark.com/p.png)\n![b](https://cdn.nlark.com/p.png)\n<img src=\"https://cdn.nlark.com/p.png\">";
        let (r, calls) = run(doc);
        assert_eq!(calls, vec!["https://cdn.nlark.com/p.png"]);
        assert_eq!(r.resolved, 3);
        assert_eq!(
            r.text,
            "![a](image/p.png)\n![b](image/p.png)\n<img src=\"image/p.png\">"
        );
    }

    #[test]
    fn failed_resolution_memoized_and_left_alone() {
        let doc = "![a](https://cdn.nlark.com/p.png) ![b](https://cdn.nlark.com/p.png) ![c](https://cdn.nlark.com/ok.png)";
        let mut calls = 0;
        let r = rewrite_document(doc, &hosts(), |url| {
            calls += 1;
            Ok::<_, Infallible>(url.ends_with("ok.png").then(|| "image/ok.png".to_string()))
        })
        .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(r.resolved, 1);
        assert_eq!(r.failed, 2);
        assert_eq!(
            r.text,
            "![a](https://cdn.nlark.com/p.png) ![b](https://cdn.nlark.com/p.png) ![c](image/ok.png)"
        );
    }

    #[test]
    fn plain_link_with_same_url_untouched() {
        let doc = "![a](https://cdn.nlark.com/p.png) see [full size](https://cdn.nlark.com/p.png) or https://cdn.nlark.com/p.png";
        let (r, _) = run(doc);
        assert_eq!(
            r.text,
            "![a](image/p.png) see [full size](https://cdn.nlark.com/p.png) or https://cdn.nlark.com/p.png"
        );
    }

    #[test]
    fn url_prefix_of_another_not_corrupted() {
        let doc = "![a](https://cdn.nlark.com/p.png) ![b](https://cdn.nlark.com/p.png.webp)";
        let (r, _) = run(doc);
        assert_eq!(r.text, "![a](image/p.png) ![b](image/p.png.webp)");
    }

    #[test]
    fn fenced_code_preserved() {
        let doc = "![a](https://cdn.nlark.com/p.png)\n```md\n![a](https://cdn.nlark.com/p.png)\n```\n";
        let (r, _) = run(doc);
        assert_eq!(
            r.text,
            "![a](image/p.png)\n```md\n![a](https://cdn.nlark.com/p.png)\n```\n"
        );
        assert_eq!(r.resolved, 1);
    }

    #[test]
    fn resolver_error_propagates() {
        let result = rewrite_document("![a](https://cdn.nlark.com/p.png)", &hosts(), |_| {
            Err::<Option<String>, _>("disk full")
        });
        assert_eq!(result.unwrap_err(), "disk full");
    }

    #[test]
    fn alt_text_with_special_chars_kept() {
        let (r, _) = run("![图 1: a (b)](https://cdn.nlark.com/p.png)");
        assert_eq!(r.text, "![图 1: a (b)](image/p.png)");
    }

    #[test]
    fn escaped_target_resolved_by_unescaped_url() {
        let (r, calls) = run(r#"![x](https://cdn.nlark.com/a\(1\).png "t")"#);
        assert_eq!(calls, vec!["https://cdn.nlark.com/a(1).png"]);
        assert_eq!(r.text, r#"![x](image/a(1).png "t")"#);
    }
}
