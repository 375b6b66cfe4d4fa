use url::Url;

/// Canonical form used for the visited set: fragment stripped, host
/// lowercased and default ports dropped by the `url` serializer. The
/// query string is kept because it addresses a different page.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.to_string()
}

pub fn normalize_str(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| normalize_url(&u))
}

/// Resolve an href against the page it was found on. Skips pseudo
/// schemes and bare fragments.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);

    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// The domain used for same-site checks: the last two labels of the
/// host, so `blog.example.com` and `www.example.com` both map to
/// `example.com`. Multi-label public suffixes (`co.uk`) are not
/// special-cased; include/exclude patterns cover those sites.
pub fn registrable_domain(host: &str) -> String {
    let host = host.strip_prefix("www.").unwrap_or(host);
    let labels: Vec<&str> = host.rsplitn(3, '.').collect();
    if labels.len() >= 2 {
        format!("{}.{}", labels[1], labels[0])
    } else {
        host.to_string()
    }
}

pub fn same_registrable_domain(a: &str, b: &str) -> bool {
    registrable_domain(a) == registrable_domain(b)
}

/// Decides whether a discovered URL belongs to the crawl: same
/// registrable domain as the seed, passes the include patterns (if
/// any were given) and matches no exclude pattern.
pub struct ScopeFilter {
    seed_domain: String,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl ScopeFilter {
    pub fn new(seed: &Url, include_patterns: Vec<String>, exclude_patterns: Vec<String>) -> Self {
        let seed_domain = seed
            .host_str()
            .map(registrable_domain)
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            seed_domain,
            include_patterns,
            exclude_patterns,
        }
    }

    pub fn seed_domain(&self) -> &str {
        &self.seed_domain
    }

    pub fn in_scope(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };

        if registrable_domain(host) != self.seed_domain {
            return false;
        }

        let as_str = url.as_str();

        if !self.include_patterns.is_empty()
            && !self.include_patterns.iter().any(|p| as_str.contains(p))
        {
            return false;
        }

        !self.exclude_patterns.iter().any(|p| as_str.contains(p))
    }
}
