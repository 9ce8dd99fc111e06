//! URL normalization shared by the page cache and the result merger.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string for page caching and navigation.
///
/// Trims whitespace, defaults the scheme to https, lowercases the host and
/// drops the fragment. The query string is kept in its original order.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    // The url crate already lowercases special-scheme hosts on parse.
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Identity used to collapse the same page reported by several providers.
///
/// Coarser than [`canonicalize`]: scheme, a leading `www.`, a trailing
/// slash and `utm_*` tracking parameters do not distinguish two hits.
/// Unparseable input falls back to its trimmed lowercase form.
pub fn dedup_key(input: &str) -> String {
    let Ok(url) = canonicalize(input) else {
        return input.trim().to_lowercase();
    };

    let host = url.host_str().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);

    let mut key = String::from(host);
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(url.path().trim_end_matches('/'));

    let kept: Vec<String> = url
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_"))
        .map(|(k, v)| if v.is_empty() { k.into_owned() } else { format!("{k}={v}") })
        .collect();
    if !kept.is_empty() {
        key.push('?');
        key.push_str(&kept.join("&"));
    }

    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_defaults_and_lowercases() {
        let url = canonicalize("  EXAMPLE.com/Docs#intro ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/Docs");
    }

    #[test]
    fn test_canonicalize_preserves_query_order() {
        let url = canonicalize("https://example.com/?b=2&a=1").unwrap();
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_canonicalize_rejects() {
        assert!(matches!(canonicalize(""), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("file:///etc/passwd"), Err(UrlError::UnsupportedScheme(_))));
        assert!(matches!(canonicalize("javascript://x"), Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_dedup_key_collapses_variants() {
        let a = dedup_key("https://www.rust-lang.org/learn/");
        let b = dedup_key("http://rust-lang.org/learn");
        let c = dedup_key("https://rust-lang.org/learn?utm_source=x#top");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a, "rust-lang.org/learn");
    }

    #[test]
    fn test_dedup_key_keeps_meaningful_query() {
        assert_ne!(dedup_key("https://example.com/item?id=1"), dedup_key("https://example.com/item?id=2"));
        assert_eq!(dedup_key("https://example.com:8443/"), "example.com:8443");
    }

    #[test]
    fn test_dedup_key_unparseable() {
        assert_eq!(dedup_key("  Not A Url "), "not a url");
    }
}
