use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use super::types::{PageRecord, PageState, SeoFeatures, TRANSPORT_FAILURE_STATUS};

#[derive(Debug)]
struct Entry {
    record: PageRecord,
    state: PageState,
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: HashMap<String, Entry>,
    pending: usize,
}

/// Deduplicated URL -> record map for a single crawl.
///
/// One lock guards the whole map; every method is one critical section, so a
/// lookup and the insert or state change that depends on it never interleave
/// with another caller.
#[derive(Debug, Default)]
pub struct UrlRegistry {
    inner: Mutex<RegistryInner>,
}

impl UrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // Every critical section leaves the map consistent, so a poisoned
        // lock still holds usable data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the record for `url`, inserting a fresh `Discovered` one when
    /// absent. The flag is `true` only for the caller that inserted it.
    pub fn get_or_create(&self, url: &str, title: &str) -> (PageRecord, bool) {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get(url) {
            return (entry.record.clone(), false);
        }
        let record = PageRecord::discovered(url, title.trim());
        inner.entries.insert(
            url.to_string(),
            Entry {
                record: record.clone(),
                state: PageState::Discovered,
            },
        );
        (record, true)
    }

    /// Claims `url` for fetching. Succeeds at most once per URL, and only
    /// while it is still `Discovered`.
    ///
    /// The crawler claims a URL when it queues it, not when a worker picks it
    /// up, so a queued URL already counts as `Requested` and pending.
    pub fn begin_request(&self, url: &str) -> bool {
        let mut inner = self.lock();
        let claimed = match inner.entries.get_mut(url) {
            Some(entry) if entry.state == PageState::Discovered => {
                entry.state = PageState::Requested;
                true
            }
            _ => false,
        };
        if claimed {
            inner.pending += 1;
        }
        claimed
    }

    /// Records the fetch outcome. Returns the pending count left afterwards,
    /// or `None` when the URL was not in flight.
    pub fn mark_visited(&self, url: &str, status: u16) -> Option<usize> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(url)?;
        if entry.state != PageState::Requested {
            if entry.state.is_terminal() {
                warn!(url, state = entry.state.label(), "ignoring repeated completion");
            } else {
                warn!(url, state = entry.state.label(), "ignoring completion for page not in flight");
            }
            return None;
        }
        entry.state = if status == 200 {
            PageState::Succeeded
        } else {
            PageState::Failed
        };
        entry.record.http_status = status;
        entry.record.visited = true;
        inner.pending = inner.pending.saturating_sub(1);
        Some(inner.pending)
    }

    /// Stores analyzer output. Only pages that finished with HTTP 200 accept it.
    pub fn apply_analysis(&self, url: &str, features: SeoFeatures) -> bool {
        let mut inner = self.lock();
        match inner.entries.get_mut(url) {
            Some(entry) if entry.state == PageState::Succeeded => {
                entry.record.seo = features;
                true
            }
            _ => false,
        }
    }

    pub fn set_title(&self, url: &str, title: &str) -> bool {
        let mut inner = self.lock();
        match inner.entries.get_mut(url) {
            Some(entry) => {
                entry.record.title = title.trim().to_string();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn state(&self, url: &str) -> Option<PageState> {
        self.lock().entries.get(url).map(|entry| entry.state)
    }

    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Fails a page whose worker died before reporting back, so the pending
    /// count can still reach zero.
    pub fn fail_in_flight(&self, url: &str) -> Option<usize> {
        self.mark_visited(url, TRANSPORT_FAILURE_STATUS)
    }

    /// Copy of every record. Meant to be called once the pending count is zero.
    pub fn snapshot(&self) -> Vec<PageRecord> {
        let inner = self.lock();
        if inner.pending > 0 {
            warn!(pending = inner.pending, "registry snapshot taken while fetches are in flight");
        }
        inner
            .entries
            .values()
            .map(|entry| entry.record.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn get_or_create_inserts_once() {
        let registry = UrlRegistry::new();
        let (first, inserted) = registry.get_or_create("https://example.com/", " Home ");
        assert!(inserted);
        assert_eq!(first.title, "Home");
        assert!(!first.visited);
        assert_eq!(first.http_status, 0);

        let (second, inserted) = registry.get_or_create("https://example.com/", "Other");
        assert!(!inserted);
        assert_eq!(second.title, "Home");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn begin_request_claims_once_and_tracks_pending() {
        let registry = UrlRegistry::new();
        registry.get_or_create("https://example.com/a", "");
        assert!(registry.begin_request("https://example.com/a"));
        assert!(!registry.begin_request("https://example.com/a"));
        assert!(!registry.begin_request("https://example.com/unknown"));
        assert_eq!(registry.pending(), 1);
        assert_eq!(
            registry.state("https://example.com/a"),
            Some(PageState::Requested)
        );

        assert_eq!(registry.mark_visited("https://example.com/a", 200), Some(0));
        assert_eq!(
            registry.state("https://example.com/a"),
            Some(PageState::Succeeded)
        );
        assert!(!registry.begin_request("https://example.com/a"));
    }

    #[test]
    fn visited_is_written_exactly_once() {
        let registry = UrlRegistry::new();
        registry.get_or_create("https://example.com/a", "");
        assert_eq!(registry.mark_visited("https://example.com/a", 404), None);

        registry.begin_request("https://example.com/a");
        assert_eq!(registry.mark_visited("https://example.com/a", 404), Some(0));
        assert_eq!(registry.mark_visited("https://example.com/a", 200), None);

        let records = registry.snapshot();
        assert_eq!(records[0].http_status, 404);
        assert!(records[0].visited);
        assert_eq!(
            registry.state("https://example.com/a"),
            Some(PageState::Failed)
        );
    }

    #[test]
    fn analysis_only_lands_on_successful_pages() {
        let registry = UrlRegistry::new();
        let features = SeoFeatures {
            has_h1: true,
            ..SeoFeatures::default()
        };

        registry.get_or_create("https://example.com/missing", "");
        registry.begin_request("https://example.com/missing");
        registry.mark_visited("https://example.com/missing", 404);
        assert!(!registry.apply_analysis("https://example.com/missing", features.clone()));

        registry.get_or_create("https://example.com/ok", "");
        registry.begin_request("https://example.com/ok");
        registry.mark_visited("https://example.com/ok", 200);
        assert!(registry.apply_analysis("https://example.com/ok", features));

        let records = registry.snapshot();
        let ok = records
            .iter()
            .find(|r| r.url == "https://example.com/ok")
            .unwrap();
        let missing = records
            .iter()
            .find(|r| r.url == "https://example.com/missing")
            .unwrap();
        assert!(ok.seo.has_h1);
        assert_eq!(missing.seo, SeoFeatures::default());
    }

    #[test]
    fn set_title_is_last_writer_wins() {
        let registry = UrlRegistry::new();
        registry.get_or_create("https://example.com/", "anchor text");
        assert!(registry.set_title("https://example.com/", "  Page Title "));
        assert!(!registry.set_title("https://example.com/nope", "x"));
        assert_eq!(registry.snapshot()[0].title, "Page Title");
    }

    #[test]
    fn concurrent_discoverers_see_a_single_insert() {
        let registry = Arc::new(UrlRegistry::new());
        let inserted = Arc::new(AtomicUsize::new(0));
        let claimed = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|scope| {
            for _ in 0..16 {
                let registry = Arc::clone(&registry);
                let inserted = Arc::clone(&inserted);
                let claimed = Arc::clone(&claimed);
                scope.spawn(move || {
                    for i in 0..50 {
                        let url = format!("https://example.com/page/{i}");
                        if registry.get_or_create(&url, "").1 {
                            inserted.fetch_add(1, Ordering::SeqCst);
                        }
                        if registry.begin_request(&url) {
                            claimed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(inserted.load(Ordering::SeqCst), 50);
        assert_eq!(claimed.load(Ordering::SeqCst), 50);
        assert_eq!(registry.len(), 50);
        assert_eq!(registry.pending(), 50);
    }

    #[test]
    fn fail_in_flight_releases_pending_slot() {
        let registry = UrlRegistry::new();
        registry.get_or_create("https://example.com/", "");
        registry.begin_request("https://example.com/");
        assert_eq!(registry.fail_in_flight("https://example.com/"), Some(0));
        let record = &registry.snapshot()[0];
        assert!(record.visited);
        assert_eq!(record.http_status, TRANSPORT_FAILURE_STATUS);
    }
}
