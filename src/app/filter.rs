use url::Url;

/// Host and explicit port of a URL, the unit a crawl is confined to.
///
/// Default ports are dropped by the `url` crate, so `http://example.com:80/`
/// and `http://example.com/` share a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDomain {
    host: String,
    port: Option<u16>,
}

impl BaseDomain {
    pub fn of(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        if host.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_ascii_lowercase(),
            port: url.port(),
        })
    }

    pub fn contains(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| host.eq_ignore_ascii_case(&self.host))
            .unwrap_or(false)
            && url.port() == self.port
    }
}

impl std::fmt::Display for BaseDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

fn is_non_navigable(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
}

/// Drops the fragment so `/a#x` and `/a#y` are one registry key.
pub fn normalize_crawl_url(mut url: Url) -> Option<String> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    let normalized = url.to_string();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Resolves `href` against the page it was found on and returns the registry
/// key for it, or `None` when the link is out of scope.
pub fn resolve_in_scope(page_url: &Url, href: &str, base: &BaseDomain) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || is_non_navigable(href) {
        return None;
    }

    let resolved = page_url.join(href).ok()?;
    if !is_in_scope(resolved.as_str(), base) {
        return None;
    }
    normalize_crawl_url(resolved)
}

/// Scope check for an already absolute candidate URL.
pub fn is_in_scope(candidate: &str, base: &BaseDomain) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() || is_non_navigable(candidate) {
        return false;
    }
    match Url::parse(candidate) {
        Ok(url) => base.contains(&url) && normalize_crawl_url(url).is_some(),
        Err(_) => false,
    }
}
