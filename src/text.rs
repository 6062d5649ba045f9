//! Text normalization helpers shared by id derivation and URL matching.

use url::Url;

/// Slugify a title or path segment: lowercase, alphanumerics kept,
/// everything else collapsed into single hyphens.
///
/// Non-ASCII alphanumerics are kept as-is (lowercased per Unicode rules),
/// so non-Latin category titles still produce usable slugs.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_hyphen = true;
        }
    }
    out
}

/// Canonicalize a URL for exact comparison: lowercase scheme/host, drop
/// query, fragment, and trailing slash.
///
/// Returns `None` for unparsable input - malformed URLs degrade to
/// "no match", they never error.
#[must_use]
pub fn canonical_url(input: &str) -> Option<String> {
    let url = Url::parse(input.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let path = url.path().trim_end_matches('/');
    Some(format!("{}://{}{}", url.scheme(), host, path))
}

/// Split a URL's path into slugified segments.
///
/// Accepts either a full URL or a bare path. Empty segments from doubled
/// slashes are dropped. For a full URL only the path contributes; scheme,
/// host, and query never leak into the segments.
#[must_use]
pub fn url_path_segments(input: &str) -> Vec<String> {
    let path = match Url::parse(input.trim()) {
        Ok(url) => url.path().to_string(),
        // Not an absolute URL: treat the whole input as a path.
        Err(_) => input.trim().to_string(),
    };
    path.split('/')
        .map(slugify)
        .filter(|s| !s.is_empty())
        .collect()
}
