use super::types::{CrawlReport, CrawlStats, PageRecord};

pub fn compute_stats(records: &[PageRecord]) -> CrawlStats {
    let mut stats = records
        .iter()
        .filter(|record| record.visited)
        .fold(CrawlStats::default(), |mut stats, record| {
            stats.visited += 1;
            if record.is_success() {
                stats.success += 1;
            } else {
                stats.errors += 1;
            }
            stats
        });
    stats.not_visited = records.len() - stats.visited;
    stats
}

/// Builds the immutable report from the finished registry contents. Records
/// are sorted by URL so repeated exports of the same crawl are identical.
pub fn build_report(mut records: Vec<PageRecord>) -> CrawlReport {
    records.sort_by(|a, b| a.url.cmp(&b.url));
    CrawlReport {
        total_links: records.len(),
        stats: compute_stats(&records),
        links: records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, visited: bool, status: u16) -> PageRecord {
        let mut record = PageRecord::discovered(url, "");
        record.visited = visited;
        record.http_status = status;
        record
    }

    #[test]
    fn stats_split_visited_pages_by_status() {
        let report = build_report(vec![
            record("https://example.com/c", true, 404),
            record("https://example.com/a", true, 200),
            record("https://example.com/b", false, 0),
            record("https://example.com/d", true, 0),
            record("https://example.com/e", true, 200),
        ]);

        assert_eq!(report.total_links, 5);
        assert_eq!(
            report.stats,
            CrawlStats {
                visited: 4,
                success: 2,
                errors: 2,
                not_visited: 1,
            }
        );
        assert_eq!(
            report.stats.visited + report.stats.not_visited,
            report.total_links
        );
        assert_eq!(report.stats.success + report.stats.errors, report.stats.visited);
        assert_eq!(report.links[0].url, "https://example.com/a");
    }

    #[test]
    fn empty_crawl_is_a_valid_report() {
        let report = build_report(Vec::new());
        assert_eq!(report.total_links, 0);
        assert_eq!(report.stats, CrawlStats::default());
        assert!(report.links.is_empty());
    }
}
