use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use scraper::Html;
use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info, warn};
use url::Url;

use super::analyzer::{analyze_document, extract_links, page_title};
use super::config::{CrawlConfig, sanitize_fetch_concurrency};
use super::error::{CrawlError, PageError};
use super::filter::{BaseDomain, normalize_crawl_url};
use super::registry::UrlRegistry;
use super::report::build_report;
use super::types::{CrawlReport, TRANSPORT_FAILURE_STATUS};

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
struct CrawlItem {
    url: String,
    // Hops from the seed; the seed is 0.
    depth: usize,
}

#[derive(Debug)]
struct FetchOutcome {
    item: CrawlItem,
    status: u16,
    links: Vec<String>,
}

impl FetchOutcome {
    fn without_links(item: CrawlItem, status: u16) -> Self {
        Self {
            item,
            status,
            links: Vec::new(),
        }
    }
}

/// Crawls the site behind `seed` with default tuning and the given depth.
pub async fn run_crawl(seed: &str, max_depth: usize) -> Result<CrawlReport, CrawlError> {
    Crawler::new(CrawlConfig::default().with_max_depth(max_depth))
        .run(seed)
        .await
}

/// Validates the seed: it must be an absolute http(s) URL with a host.
pub fn parse_seed(seed: &str) -> Result<(Url, BaseDomain), CrawlError> {
    let trimmed = seed.trim();
    if trimmed.is_empty() {
        return Err(CrawlError::invalid_seed(seed, "empty URL"));
    }

    let url = Url::parse(trimmed).map_err(|err| CrawlError::invalid_seed(seed, err.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(CrawlError::invalid_seed(
            seed,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    let base = BaseDomain::of(&url).ok_or_else(|| CrawlError::invalid_seed(seed, "URL has no host"))?;
    Ok((url, base))
}

fn politeness_delay(max_jitter: Duration) -> Duration {
    let max_ms = u64::try_from(max_jitter.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

fn is_html_response(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("html"))
        .unwrap_or(true)
}

/// Follows redirects while every hop stays on `base`. An off-domain hop is
/// not followed; the 3xx response itself becomes the page's outcome.
fn scoped_redirect_policy(base: BaseDomain) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if base.contains(attempt.url()) {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

/// Title pass, analyzer, and link discovery for one fetched body. `page_url`
/// is the registry key; relative links resolve against `final_url`, where the
/// body actually came from. Returns the in-scope links found on the page; each
/// one is registered before returning.
fn process_html(
    registry: &UrlRegistry,
    base: &BaseDomain,
    page_url: &str,
    final_url: &Url,
    status: u16,
    body: &str,
) -> Vec<String> {
    let doc = Html::parse_document(body);

    if let Some(title) = page_title(&doc) {
        registry.set_title(page_url, &title);
    }
    if status == 200 {
        registry.apply_analysis(page_url, analyze_document(&doc));
    }

    extract_links(&doc, final_url, base)
        .into_iter()
        .map(|link| {
            let (_, inserted) = registry.get_or_create(&link.url, &link.anchor);
            if inserted {
                debug!(url = %link.url, from = page_url, "discovered page");
            }
            link.url
        })
        .collect()
}

async fn fetch_page(
    client: reqwest::Client,
    registry: Arc<UrlRegistry>,
    base: Arc<BaseDomain>,
    item: CrawlItem,
) -> FetchOutcome {
    let response = match client.get(&item.url).send().await {
        Ok(response) => response,
        Err(err) => {
            let err = PageError::Fetch(err);
            let status = err.status().unwrap_or(TRANSPORT_FAILURE_STATUS);
            warn!(url = %item.url, depth = item.depth, error = %err, "page fetch failed");
            registry.mark_visited(&item.url, status);
            return FetchOutcome::without_links(item, status);
        }
    };

    let status = response.status().as_u16();
    let final_url = response.url().clone();
    let on_domain = base.contains(&final_url);
    if !on_domain {
        debug!(url = %item.url, final_url = %final_url, "response came from outside the crawl domain");
    }
    let parse_body = on_domain && response.status().is_success() && is_html_response(&response);
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            let err = PageError::Body(err);
            warn!(url = %item.url, status, error = %err, "page body unreadable");
            registry.mark_visited(&item.url, TRANSPORT_FAILURE_STATUS);
            return FetchOutcome::without_links(item, TRANSPORT_FAILURE_STATUS);
        }
    };

    registry.mark_visited(&item.url, status);
    if status != 200 {
        debug!(url = %item.url, status, "page fetched with error status");
    }
    if !parse_body {
        return FetchOutcome::without_links(item, status);
    }

    let links = process_html(&registry, &base, &item.url, &final_url, status, &body);
    FetchOutcome {
        item,
        status,
        links,
    }
}

/// Concurrent, depth-bounded crawler confined to the seed's host.
///
/// Every call to [`Crawler::run`] owns a fresh [`UrlRegistry`], so crawls
/// running side by side never see each other's pages.
#[derive(Debug, Clone, Default)]
pub struct Crawler {
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    fn build_client(&self, base: &BaseDomain) -> Result<reqwest::Client, CrawlError> {
        reqwest::Client::builder()
            .user_agent(self.config.user_agent.clone())
            .timeout(self.config.request_timeout)
            .redirect(scoped_redirect_policy(base.clone()))
            .build()
            .map_err(CrawlError::ClientSetup)
    }

    #[tracing::instrument(skip(self), fields(max_depth = self.config.max_depth))]
    pub async fn run(&self, seed: &str) -> Result<CrawlReport, CrawlError> {
        let (seed_url, base) = parse_seed(seed)?;
        let Some(seed_key) = normalize_crawl_url(seed_url) else {
            return Err(CrawlError::invalid_seed(seed, "URL cannot be crawled"));
        };
        let client = self.build_client(&base)?;

        let registry = Arc::new(UrlRegistry::new());
        let base = Arc::new(base);
        let max_depth = self.config.max_depth;
        let concurrency = sanitize_fetch_concurrency(self.config.fetch_concurrency);
        info!(seed = %seed_key, domain = %base, concurrency, "starting crawl");

        let mut queue = VecDeque::new();
        registry.get_or_create(&seed_key, "");
        if registry.begin_request(&seed_key) {
            queue.push_back(CrawlItem {
                url: seed_key,
                depth: 0,
            });
        }

        let mut set = JoinSet::new();
        let mut in_flight: HashMap<Id, String> = HashMap::new();
        loop {
            while set.len() < concurrency {
                let Some(item) = queue.pop_front() else {
                    break;
                };
                let delay = politeness_delay(self.config.max_jitter);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                debug!(url = %item.url, depth = item.depth, "dispatching fetch");
                let url = item.url.clone();
                let handle = set.spawn(fetch_page(
                    client.clone(),
                    Arc::clone(&registry),
                    Arc::clone(&base),
                    item,
                ));
                in_flight.insert(handle.id(), url);
            }

            let Some(joined) = set.join_next_with_id().await else {
                break;
            };
            match joined {
                Ok((id, outcome)) => {
                    in_flight.remove(&id);
                    debug!(
                        url = %outcome.item.url,
                        status = outcome.status,
                        links = outcome.links.len(),
                        "fetch completed"
                    );
                    let child_depth = outcome.item.depth + 1;
                    if child_depth > max_depth {
                        continue;
                    }
                    for link in outcome.links {
                        if registry.begin_request(&link) {
                            queue.push_back(CrawlItem {
                                url: link,
                                depth: child_depth,
                            });
                        }
                    }
                }
                Err(err) => {
                    let url = in_flight.remove(&err.id());
                    error!(url = ?url, error = %err, "fetch worker failed");
                    if let Some(url) = url {
                        registry.fail_in_flight(&url);
                    }
                }
            }
        }

        let pending = registry.pending();
        if pending > 0 {
            warn!(pending, "crawl loop ended with pages still marked in flight");
        }

        let report = build_report(registry.snapshot());
        info!(
            total = report.total_links,
            visited = report.stats.visited,
            success = report.stats.success,
            errors = report.stats.errors,
            not_visited = report.stats.not_visited,
            "crawl finished"
        );
        Ok(report)
    }
}
