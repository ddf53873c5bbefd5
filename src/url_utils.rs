//! URL helper functions used throughout the audit pipeline

use url::Url;

/// Canonicalize a URL for dedup and cross-page joins.
///
/// Lowercases the host, strips the fragment, and removes a single trailing
/// slash from non-root paths. The query string is kept. Idempotent.
pub fn canonicalize(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    parsed.set_fragment(None);

    // Url already lowercases registered hosts; normalize the path separately.
    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    Some(parsed.to_string())
}

/// Extract the host portion of a URL
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_lowercase()))
}

/// Check whether a URL belongs to the audited host
pub fn is_internal(url: &str, base_host: &str) -> bool {
    extract_host(url).as_deref() == Some(base_host)
}

/// Resolve a link against the provided base URL
pub fn resolve(link: &str, base_url: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(link).ok().map(|u| u.to_string())
}

/// Build the robots.txt URL for the given base URL
pub fn robots_url(base_url: &str) -> Option<String> {
    let parsed = Url::parse(base_url).ok()?;
    let host = parsed.host_str()?;
    Some(format!("{}://{}/robots.txt", parsed.scheme(), host))
}

/// Build the llms.txt URL for the given base URL
pub fn llms_txt_url(base_url: &str) -> Option<String> {
    let parsed = Url::parse(base_url).ok()?;
    let host = parsed.host_str()?;
    Some(format!("{}://{}/llms.txt", parsed.scheme(), host))
}

/// Join a site-relative path (e.g. "/sitemap.xml") onto the base origin
pub fn join_origin(base_url: &str, path: &str) -> Option<String> {
    let parsed = Url::parse(base_url).ok()?;
    let host = parsed.host_str()?;
    Some(format!("{}://{}{}", parsed.scheme(), host, path))
}

/// Number of non-empty path segments
pub fn path_depth(url: &str) -> usize {
    Url::parse(url)
        .ok()
        .map(|u| u.path().split('/').filter(|s| !s.is_empty()).count())
        .unwrap_or(0)
}

/// Path contains characters outside `[a-z0-9-_./]`
pub fn path_has_special_characters(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .map(|u| {
            u.path()
                .chars()
                .any(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || "-_./".contains(c)))
        })
        .unwrap_or(false)
}

/// Check if a content type represents HTML
pub fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.starts_with("text/html") || lower.starts_with("application/xhtml+xml")
}

/// Normalize CLI input by adding https:// when no scheme is provided
pub fn normalize_url_for_cli(url: &str) -> String {
    let trimmed = url.trim();

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }

    format!("https://{}", trimmed)
}
