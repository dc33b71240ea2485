//! Small, forgiving helpers over `scraper`. Nothing here fails: a selector
//! that does not parse or matches nothing yields `None` / an empty list.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

pub fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(_) => {
            debug!(selector = css, "Ignoring unparseable CSS selector");
            None
        }
    }
}

/// Element text with whitespace runs collapsed to single spaces.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Text of the first element matching `css`.
pub fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = parse_selector(css)?;
    document.select(&selector).next().map(element_text).and_then(non_empty)
}

/// Texts of every element matching `css`, joined by `separator`.
pub fn joined_text(document: &Html, css: &str, separator: &str) -> Option<String> {
    let selector = parse_selector(css)?;
    let parts: Vec<String> = document
        .select(&selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    non_empty(parts.join(separator))
}

/// Canonical form used as the dedup key: fragment dropped, trailing slash
/// trimmed from non-root paths. Unparseable input is only trimmed.
pub fn normalize_link(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    url.set_fragment(None);
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    url.to_string()
}

/// Resolves an href against the site base. Only http(s) targets survive.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = base.join(href).ok()?;
    match url.scheme() {
        "http" | "https" => Some(normalize_link(url.as_str())),
        _ => None,
    }
}

/// Absolute, normalized, de-duplicated hrefs of every element matching
/// `css`, in document order.
pub fn listing_links(page: &str, css: &str, base_url: &str) -> Vec<String> {
    let (Some(selector), Ok(base)) = (parse_selector(css), Url::parse(base_url)) else {
        return Vec::new();
    };
    let document = Html::parse_document(page);
    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| resolve_link(&base, href))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_link_drops_fragment_and_trailing_slash() {
        assert_eq!(
            normalize_link(" https://Example.com/jobs/42/#apply "),
            "https://example.com/jobs/42"
        );
        assert_eq!(normalize_link("https://example.com/"), "https://example.com/");
        assert_eq!(normalize_link("not a url"), "not a url");
    }

    #[test]
    fn test_resolve_link_handles_relative_and_absolute() {
        let base = Url::parse("https://hirelebanese.com/").unwrap();
        assert_eq!(
            resolve_link(&base, "job.aspx?id=7").as_deref(),
            Some("https://hirelebanese.com/job.aspx?id=7")
        );
        assert_eq!(
            resolve_link(&base, "https://other.com/x").as_deref(),
            Some("https://other.com/x")
        );
        assert_eq!(resolve_link(&base, "#top"), None);
        assert_eq!(resolve_link(&base, "mailto:hr@example.com"), None);
        assert_eq!(resolve_link(&base, "   "), None);
    }

    #[test]
    fn test_listing_links_preserve_order_without_duplicates() {
        let page = r#"
            <ul>
              <li><a class="job" href="/jobs/2">Two</a></li>
              <li><a class="job" href="/jobs/1">One</a></li>
              <li><a class="job" href="/jobs/2/">Two again</a></li>
              <li><a class="job">No href</a></li>
              <li><a class="other" href="/jobs/3">Not a job</a></li>
            </ul>
        "#;
        let links = listing_links(page, "a.job", "https://example.com");
        assert_eq!(
            links,
            vec![
                "https://example.com/jobs/2".to_string(),
                "https://example.com/jobs/1".to_string()
            ]
        );
    }

    #[test]
    fn test_bad_selector_yields_nothing() {
        let document = Html::parse_document("<h1>Title</h1>");
        assert_eq!(first_text(&document, "h1[[["), None);
        assert!(listing_links("<a href='/x'></a>", ":::", "https://e.com").is_empty());
    }

    #[test]
    fn test_text_helpers_collapse_whitespace() {
        let document = Html::parse_document(
            "<div><span class='loc'> Beirut\n </span><span class='loc'>Lebanon</span><p>  </p></div>",
        );
        assert_eq!(
            joined_text(&document, "span.loc", ", ").as_deref(),
            Some("Beirut, Lebanon")
        );
        assert_eq!(first_text(&document, "p"), None);
    }
}
