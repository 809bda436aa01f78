//! HTML querying for fetched documents
//!
//! This module handles reading an HTML body with CSS selectors:
//! - Text of the first matching element (record titles)
//! - `href` targets of all matching elements (outbound links)

use crate::crawler::PortError;
use scraper::{Html, Selector};
use url::Url;

/// Parses a CSS selector, mapping failures to a port error
pub fn parse_selector(selector: &str) -> Result<Selector, PortError> {
    Selector::parse(selector).map_err(|e| PortError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Returns the trimmed text of the first element matching `selector`
///
/// Empty or whitespace-only text counts as no match.
///
/// # Example
///
/// ```
/// use trawl::crawler::select_text;
///
/// let html = r#"<html><body><h1>  QA Engineer </h1></body></html>"#;
/// assert_eq!(select_text(html, "h1").unwrap(), Some("QA Engineer".to_string()));
/// ```
pub fn select_text(html: &str, selector: &str) -> Result<Option<String>, PortError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Extracts absolute link targets from every element matching `selector`
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `href` of every matching element, resolved against `base_url`
///
/// **Exclude:**
/// - Elements with a `download` attribute
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Non-HTTP(S) URLs after resolution
///
/// Duplicates are kept in document order; deduplication belongs to the crawler.
///
/// # Example
///
/// ```
/// use trawl::crawler::select_links;
/// use url::Url;
///
/// let html = r#"<a href="/job-offer/1">One</a><a href="/about">About</a>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let links = select_links(html, "a[href*='/job-offer/']", &base).unwrap();
/// assert_eq!(links, vec!["https://example.com/job-offer/1".to_string()]);
/// ```
pub fn select_links(html: &str, selector: &str, base_url: &Url) -> Result<Vec<String>, PortError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_link(href, base_url) {
                links.push(absolute_url);
            }
        }
    }

    Ok(links)
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
