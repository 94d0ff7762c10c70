use std::time::Duration;

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 5;
pub const DEFAULT_MAX_JITTER_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_FETCH_CONCURRENCY: usize = 256;

pub fn sanitize_fetch_concurrency(value: usize) -> usize {
    value.clamp(1, MAX_FETCH_CONCURRENCY)
}

pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Tuning for one crawl invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Maximum hop count from the seed that is still fetched. The seed is hop 0.
    pub max_depth: usize,
    pub fetch_concurrency: usize,
    /// Upper bound of the random pause inserted before each dispatch.
    pub max_jitter: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            max_jitter: Duration::from_millis(DEFAULT_MAX_JITTER_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        }
    }
}

impl CrawlConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = sanitize_fetch_concurrency(concurrency);
        self
    }

    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        if !user_agent.trim().is_empty() {
            self.user_agent = user_agent;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_documented_values() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.fetch_concurrency, 5);
        assert_eq!(config.max_jitter, Duration::from_secs(1));
        assert!(config.user_agent.starts_with("linkscope/"));
    }

    #[test]
    fn concurrency_is_clamped() {
        assert_eq!(sanitize_fetch_concurrency(0), 1);
        assert_eq!(sanitize_fetch_concurrency(12), 12);
        assert_eq!(sanitize_fetch_concurrency(10_000), 256);
        assert_eq!(
            CrawlConfig::default().with_fetch_concurrency(0).fetch_concurrency,
            1
        );
    }

    #[test]
    fn blank_user_agent_keeps_default() {
        let config = CrawlConfig::default().with_user_agent("   ");
        assert_eq!(config.user_agent, default_user_agent());
        let config = CrawlConfig::default().with_user_agent("audit-bot/1.0");
        assert_eq!(config.user_agent, "audit-bot/1.0");
    }
}
