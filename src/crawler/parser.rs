//! Outbound link extraction
//!
//! Links are pulled from `<a href>` and `<link rel="canonical">`, resolved
//! against the page's final URL, normalized, and deduplicated in document
//! order. Scope filtering is the frontier's job, not this module's.

use crate::url::normalize_url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Links and title of one rendered page
#[derive(Debug, Clone, Default)]
pub struct PageLinks {
    pub title: Option<String>,
    /// Normalized absolute links, first occurrence order
    pub links: Vec<Url>,
}

/// Parses rendered HTML and collects its outbound links
///
/// **Excluded:** `javascript:`, `mailto:`, `tel:` and `data:` hrefs,
/// fragment-only anchors, `<a download>`, and anything that does not resolve
/// to HTTP(S). `rel="nofollow"` is still followed.
///
/// # Example
///
/// ```
/// use docsweep::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><head><title>Guide</title></head>
///     <body><a href="intro#top">Intro</a><a href="mailto:x@y.z">Mail</a></body></html>"#;
/// let base = Url::parse("https://example.test/docs/guide").unwrap();
/// let page = extract_links(html, &base);
/// assert_eq!(page.title.as_deref(), Some("Guide"));
/// assert_eq!(page.links[0].as_str(), "https://example.test/docs/intro");
/// assert_eq!(page.links.len(), 1);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> PageLinks {
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, base_url) {
            if seen.insert(url.as_str().to_string()) {
                links.push(url);
            }
        }
    };

    if let Ok(anchors) = Selector::parse("a[href]") {
        for element in document.select(&anchors) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    PageLinks {
        title: page_title(&document),
        links,
    }
}

fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolves and normalizes one href; `None` means the link is not followed
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok()
}
