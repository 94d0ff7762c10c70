use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::filter::{BaseDomain, resolve_in_scope};
use super::types::{SHORT_META_DESCRIPTION_CHARS, SHORT_TITLE_CHARS, SeoFeatures};

/// An in-scope link found on a page, with the anchor text that pointed at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub url: String,
    pub anchor: String,
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

fn has_any(doc: &Html, css: &str) -> bool {
    selector(css)
        .map(|sel| doc.select(&sel).next().is_some())
        .unwrap_or(false)
}

fn count_elements(doc: &Html, css: &str) -> usize {
    selector(css)
        .map(|sel| doc.select(&sel).count())
        .unwrap_or(0)
}

/// `content` of the first element matching `css`, if that element carries one.
fn first_content_attr(doc: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

/// Trimmed text of the first `title` element, `None` when the page has none.
pub fn page_title(doc: &Html) -> Option<String> {
    selector("title")
        .and_then(|sel| doc.select(&sel).next().map(|el| element_text(&el)))
        .map(|title| title.trim().to_string())
}

pub fn extract_title(doc: &Html) -> String {
    page_title(doc).unwrap_or_default()
}

fn image_alt_stats(doc: &Html) -> (usize, usize) {
    let Some(sel) = selector("img") else {
        return (0, 0);
    };
    let mut total = 0usize;
    let mut missing_alt = 0usize;
    for el in doc.select(&sel) {
        total += 1;
        // An empty alt marks a decorative image; only a missing attribute counts.
        if el.value().attr("alt").is_none() {
            missing_alt += 1;
        }
    }
    (total, missing_alt)
}

fn unlabeled_button_count(doc: &Html) -> usize {
    let Some(sel) = selector("button") else {
        return 0;
    };
    doc.select(&sel)
        .filter(|el| is_blank(el.value().attr("title")) && is_blank(el.value().attr("aria-label")))
        .count()
}

fn has_html_lang(doc: &Html) -> bool {
    !is_blank(doc.root_element().value().attr("lang"))
}

/// Extracts the on-page signals. Pure: the same document always yields the
/// same features.
pub fn analyze_document(doc: &Html) -> SeoFeatures {
    let title = extract_title(doc);

    let meta_description = first_content_attr(doc, "meta[name=\"description\"]");
    let robots = first_content_attr(doc, "meta[name=\"robots\"]");
    let robots_value = robots.clone().unwrap_or_default();
    let description = meta_description.clone().unwrap_or_default();

    let h1_count = count_elements(doc, "h1");
    let (total_images, missing_alt_count) = image_alt_stats(doc);

    SeoFeatures {
        has_h1: h1_count > 0,
        multiple_h1s: h1_count > 1,
        missing_alt_count,
        total_images,
        buttons_without_label_count: unlabeled_button_count(doc),
        has_meta_description: meta_description.is_some(),
        meta_desc_empty_or_short: description.chars().count() < SHORT_META_DESCRIPTION_CHARS,
        meta_description: description,
        has_canonical: has_any(doc, "link[rel=\"canonical\"][href]"),
        has_robots_meta: robots.is_some(),
        has_noindex: robots_value.to_ascii_lowercase().contains("noindex"),
        robots_meta_value: robots_value,
        has_favicon: has_any(doc, "link[rel=\"icon\"], link[rel=\"shortcut icon\"]"),
        has_open_graph: has_any(doc, "meta[property^=\"og:\"]"),
        has_twitter_card: has_any(doc, "meta[name^=\"twitter:\"]"),
        has_structured_data: has_any(doc, "script[type=\"application/ld+json\"]"),
        has_viewport: has_any(doc, "meta[name=\"viewport\"]"),
        has_html_lang: has_html_lang(doc),
        title_empty_or_short: title.chars().count() < SHORT_TITLE_CHARS,
    }
}

/// In-scope `a[href]` targets of a page, first occurrence wins.
pub fn extract_links(doc: &Html, page_url: &Url, base: &BaseDomain) -> Vec<DiscoveredLink> {
    let Some(sel) = selector("a[href]") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for el in doc.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_in_scope(page_url, href, base) else {
            continue;
        };
        if seen.insert(url.clone()) {
            out.push(DiscoveredLink {
                url,
                anchor: element_text(&el).trim().to_string(),
            });
        }
    }
    out
}
