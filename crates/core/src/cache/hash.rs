//! Scoped cache keys and their storage hash.

use sha2::{Digest, Sha256};
use std::fmt;

/// What kind of payload a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheScope {
    /// Search results for one query variant.
    Search,
    /// Planned variants for one query.
    Plan,
    /// Extracted content for one page url.
    Page,
    /// A host whose pages failed to render.
    Domain,
}

impl CacheScope {
    pub fn tag(&self) -> &'static str {
        match self {
            CacheScope::Search => "search",
            CacheScope::Plan => "plan",
            CacheScope::Page => "page",
            CacheScope::Domain => "domain",
        }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A cache key: a normalized fingerprint within a scope.
///
/// Page keys use the canonical url as their fingerprint, so the logical key
/// reads `page:<url>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub scope: CacheScope,
    pub fingerprint: String,
}

impl CacheKey {
    pub fn new(scope: CacheScope, fingerprint: impl Into<String>) -> Self {
        Self { scope, fingerprint: fingerprint.into() }
    }

    pub fn search(fingerprint: impl Into<String>) -> Self {
        Self::new(CacheScope::Search, fingerprint)
    }

    pub fn plan(fingerprint: impl Into<String>) -> Self {
        Self::new(CacheScope::Plan, fingerprint)
    }

    pub fn page(url: impl Into<String>) -> Self {
        Self::new(CacheScope::Page, url)
    }

    /// Hosts are matched case-insensitively.
    pub fn domain(host: &str) -> Self {
        Self::new(CacheScope::Domain, host.to_ascii_lowercase())
    }

    /// Storage hash used as the primary key.
    pub fn hash(&self) -> String {
        compute_cache_key(self.scope.tag(), &self.fingerprint)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.fingerprint)
    }
}

/// Compute the storage hash for a scoped fingerprint.
pub fn compute_cache_key(scope: &str, fingerprint: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(scope.as_bytes());
    hasher.update(b"\n");
    hasher.update(fingerprint.as_bytes());
    hex::encode(hasher.finalize())
}
