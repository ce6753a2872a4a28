//! Seed index scraping

use super::links::resolve_link;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static INDEX_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dd a[href]").expect("valid selector"));

/// Collects the breed page URLs listed on the A-Z index
///
/// Every `dd a[href]` that resolves (against `origin`) to a path under
/// `page_prefix` ending in `.html` is kept. Links to other hosts are ignored.
/// The result is deduplicated and keeps document order.
pub fn scrape_index(raw: &[u8], origin: &Url, page_prefix: &str) -> Vec<Url> {
    let html = String::from_utf8_lossy(raw);
    let document = Html::parse_document(&html);

    let mut seen = HashSet::new();
    let mut pages = Vec::new();

    for element in document.select(&INDEX_LINK) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(url) = resolve_link(href, origin) else {
            continue;
        };

        let is_page = url.host_str() == origin.host_str()
            && url.path().starts_with(page_prefix)
            && url.path().ends_with(".html");

        if is_page && seen.insert(url.path().to_string()) {
            pages.push(url);
        }
    }

    tracing::debug!("Index lists {} breed pages", pages.len());
    pages
}
