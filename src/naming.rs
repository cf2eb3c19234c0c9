//! Local filename derivation for downloaded images.
//!
//! Every remote URL maps to exactly one local filename:
//!
//! ```text
//! https://cdn.nlark.com/yuque/0/2024/png/pic.png
//!                                       └─┬─┘└┬┘
//!                          pic-3f9a0c12be.png
//!                          stem  digest   extension
//! ```
//!
//! - **stem**: the last path segment's file stem, sanitized to
//!   `[A-Za-z0-9._-]` (any other run becomes a single `-`).
//! - **digest**: first 10 hex characters of SHA-256 over the full URL, so two
//!   URLs that share a basename never collide.
//! - **extension**: taken from the URL path; when the path has none, from the
//!   response `Content-Type`; otherwise the [`PLACEHOLDER_EXTENSION`].
//!
//! The mapping is a pure function of the URL (plus content type), which is
//! what makes the on-disk image directory usable as a cache across runs.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Length of the URL fingerprint appended to each stem.
pub const DIGEST_LEN: usize = 10;

/// Extension used when neither the URL nor the content type names one.
pub const PLACEHOLDER_EXTENSION: &str = "bin";

/// Stem used when the URL path has no usable file name.
const FALLBACK_STEM: &str = "image";

/// Content types where `mime_guess` lists several extensions (or none yet),
/// pinned to the one a browser expects. Everything else takes the first
/// extension `mime_guess` knows.
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    ("application/octet-stream", PLACEHOLDER_EXTENSION),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/pjpeg", "jpg"),
    ("image/tiff", "tiff"),
    ("image/svg+xml", "svg"),
    ("image/x-icon", "ico"),
    ("image/vnd.microsoft.icon", "ico"),
    ("image/x-ms-bmp", "bmp"),
    ("image/apng", "apng"),
    ("image/avif", "avif"),
    ("image/heic", "heic"),
    ("image/heif", "heif"),
    ("image/jxl", "jxl"),
    ("image/vnd.adobe.photoshop", "psd"),
];

/// The pieces of a derived filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalName {
    pub stem: String,
    pub digest: String,
    /// Extension without the leading dot.
    pub extension: String,
}

impl LocalName {
    /// Derive the local name for `url`, consulting `content_type` only when
    /// the URL path carries no extension.
    pub fn derive(url: &str, content_type: Option<&str>) -> Self {
        let segment = last_path_segment(url);
        let path = Path::new(&segment);
        let raw_stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let url_ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .filter(|e| !e.is_empty());

        let extension = url_ext
            .or_else(|| content_type.and_then(extension_for_mime).map(str::to_string))
            .unwrap_or_else(|| PLACEHOLDER_EXTENSION.to_string());

        Self {
            stem: sanitize_stem(&raw_stem),
            digest: url_digest(url),
            extension,
        }
    }

    /// Whether the extension is the placeholder, i.e. the real type is still
    /// unknown and should be corrected from the response content type.
    pub fn has_placeholder_extension(&self) -> bool {
        self.extension == PLACEHOLDER_EXTENSION
    }

    /// The `<stem>-<digest>` part shared by every extension variant.
    pub fn base(&self) -> String {
        format!("{}-{}", self.stem, self.digest)
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.base(), self.extension)
    }
}

/// Local filename for `url`. See the [module docs](self) for the format.
pub fn url_to_filename(url: &str, content_type: Option<&str>) -> String {
    LocalName::derive(url, content_type).file_name()
}

/// First [`DIGEST_LEN`] hex characters of SHA-256 over the URL bytes.
pub fn url_digest(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(DIGEST_LEN);
    hex
}

/// Map a `Content-Type` header value to a file extension.
///
/// Parameters (`; charset=...`) are ignored and the comparison is
/// case-insensitive. Unknown types yield `None`.
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    if essence.is_empty() {
        return None;
    }
    if let Some((_, ext)) = PREFERRED_EXTENSIONS.iter().find(|(mime, _)| *mime == essence) {
        return Some(*ext);
    }
    mime_guess::get_mime_extensions_str(&essence)?
        .first()
        .copied()
}

/// Restrict a stem to `[A-Za-z0-9._-]`, collapsing other runs to `-`.
///
/// Leading and trailing dashes are trimmed; an empty result becomes
/// `"image"`.
pub fn sanitize_stem(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut in_run = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Last non-empty segment of the URL path, without query or fragment.
fn last_path_segment(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .unwrap_or_default()
        .to_string()
}
