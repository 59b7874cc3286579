use crate::UrlError;
use std::collections::BTreeSet;
use url::Url;

/// The set of URL prefixes a crawl may visit
///
/// A URL is in scope if its string form starts with at least one prefix.
/// A prefix ending in `/` also admits the directory URL itself without the
/// slash (`https://example.test/docs` for the prefix
/// `https://example.test/docs/`), because normalization strips trailing
/// slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePrefixes {
    prefixes: BTreeSet<String>,
}

impl ScopePrefixes {
    /// Builds a scope from explicit prefixes
    ///
    /// Each prefix must parse as an HTTP(S) URL; its host is lowercased by
    /// parsing.
    pub fn new<I, S>(prefixes: I) -> Result<Self, UrlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for prefix in prefixes {
            let url = Url::parse(prefix.as_ref().trim())
                .map_err(|e| UrlError::Parse(format!("{}: {}", prefix.as_ref(), e)))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(UrlError::InvalidScheme(url.scheme().to_string()));
            }
            if url.host_str().is_none() {
                return Err(UrlError::MissingHost);
            }
            set.insert(url.as_str().to_string());
        }

        if set.is_empty() {
            return Err(UrlError::Malformed("scope has no prefixes".to_string()));
        }

        Ok(Self { prefixes: set })
    }

    /// Derives a scope from a seed URL: scheme + host + leading path segment
    ///
    /// # Examples
    ///
    /// ```
    /// use docsweep::url::ScopePrefixes;
    /// use url::Url;
    ///
    /// let seed = Url::parse("https://example.test/docs/swift-book/intro").unwrap();
    /// let scope = ScopePrefixes::derive(&seed);
    /// assert!(scope.contains_str("https://example.test/docs/api"));
    /// assert!(!scope.contains_str("https://example.test/blog/post"));
    /// ```
    pub fn derive(seed: &Url) -> Self {
        let origin = seed.origin().ascii_serialization();
        let segments: Vec<&str> = seed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let prefix = match segments.first() {
            // A lone file at the root (`/index.html`) scopes to the whole host
            Some(first)
                if segments.len() == 1 && !seed.path().ends_with('/') && first.contains('.') =>
            {
                format!("{}/", origin)
            }
            Some(first) => format!("{}/{}/", origin, first),
            None => format!("{}/", origin),
        };

        Self {
            prefixes: [prefix].into_iter().collect(),
        }
    }

    /// Returns true if `url` is inside the scope
    pub fn contains(&self, url: &Url) -> bool {
        self.contains_str(url.as_str())
    }

    pub fn contains_str(&self, url: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            url.starts_with(prefix.as_str())
                || (prefix.ends_with('/') && prefix.len() == url.len() + 1 && prefix.starts_with(url))
        })
    }

    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.prefixes
    }
}
