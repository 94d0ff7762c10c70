use serde::{Deserialize, Serialize};

/// Status recorded for a fetch that never produced an HTTP response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

pub const SHORT_TITLE_CHARS: usize = 10;
pub const SHORT_META_DESCRIPTION_CHARS: usize = 30;

/// On-page signals extracted from a page that answered with HTTP 200.
///
/// Every field stays at its default until the analyzer has run, so a record
/// that failed (or was never fetched) serializes with zeroes and `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoFeatures {
    pub has_h1: bool,
    pub multiple_h1s: bool,
    pub missing_alt_count: usize,
    pub total_images: usize,
    pub buttons_without_label_count: usize,
    pub has_meta_description: bool,
    pub meta_description: String,
    pub has_canonical: bool,
    pub has_robots_meta: bool,
    pub robots_meta_value: String,
    pub has_noindex: bool,
    pub has_favicon: bool,
    pub has_open_graph: bool,
    pub has_twitter_card: bool,
    pub has_structured_data: bool,
    pub has_viewport: bool,
    pub has_html_lang: bool,
    pub title_empty_or_short: bool,
    pub meta_desc_empty_or_short: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub http_status: u16,
    pub visited: bool,
    #[serde(flatten)]
    pub seo: SeoFeatures,
}

impl PageRecord {
    pub fn discovered(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            http_status: 0,
            visited: false,
            seo: SeoFeatures::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.visited && self.http_status == 200
    }
}

/// Lifecycle of a URL inside one crawl. Transitions only move forward:
/// `Discovered -> Requested -> Succeeded | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Discovered,
    Requested,
    Succeeded,
    Failed,
}

impl PageState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PageState::Succeeded | PageState::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            PageState::Discovered => "discovered",
            PageState::Requested => "requested",
            PageState::Succeeded => "fetched_success",
            PageState::Failed => "fetched_error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    pub visited: usize,
    pub success: usize,
    pub errors: usize,
    pub not_visited: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub total_links: usize,
    pub links: Vec<PageRecord>,
    pub stats: CrawlStats,
}
