use crate::model::{Issue, IssueType};
use serde_json::json;
use sitelint_crawler::PageRecord;
use sitelint_crawler::scope::registrable_domain;
use std::collections::HashMap;
use url::Url;

const TITLE_MIN: usize = 10;
const TITLE_MAX: usize = 60;
const META_DESC_MIN: usize = 50;
const META_DESC_MAX: usize = 160;
const REDIRECT_CHAIN_MAX: usize = 3;

/// Per-run inputs the page rules need beyond the page itself.
pub struct AnalyzerContext {
    pub seed_is_https: bool,
    pub thin_content_threshold: usize,
}

/// Evaluate every rule against one page. Deterministic, and
/// short-circuits on fatal page states: an unreachable page or an
/// error status yields exactly one issue.
pub fn analyze_page(page: &PageRecord, ctx: &AnalyzerContext) -> Vec<Issue> {
    let mut issues = Vec::new();

    if page.status_code == 0 {
        issues.push(Issue::new(
            &page.url,
            IssueType::FetchError,
            json!({ "error": page.error.as_deref().unwrap_or("unknown") }),
        ));
        return issues;
    }

    if (500..600).contains(&page.status_code) {
        issues.push(Issue::new(
            &page.url,
            IssueType::ServerError5xx,
            json!({ "status_code": page.status_code }),
        ));
        return issues;
    }

    if (400..500).contains(&page.status_code) {
        issues.push(Issue::new(
            &page.url,
            IssueType::ClientError4xx,
            json!({ "status_code": page.status_code }),
        ));
        return issues;
    }

    if page.redirect_chain.len() > REDIRECT_CHAIN_MAX {
        issues.push(Issue::new(
            &page.url,
            IssueType::RedirectChain,
            json!({ "chain": page.redirect_chain, "hops": page.redirect_chain.len() }),
        ));
    }

    if has_redirect_loop(page) {
        issues.push(Issue::new(
            &page.url,
            IssueType::RedirectLoop,
            json!({ "chain": page.redirect_chain, "final_url": page.final_url }),
        ));
    }

    // Content rules only apply to pages that actually delivered
    // content.
    if !page.is_success() {
        return issues;
    }

    match page.effective_title() {
        None => issues.push(Issue::new(&page.url, IssueType::MissingTitle, json!({}))),
        Some(title) => {
            let len = title.chars().count();
            if len < TITLE_MIN {
                issues.push(Issue::new(
                    &page.url,
                    IssueType::TitleTooShort,
                    json!({ "title": title, "length": len }),
                ));
            } else if len > TITLE_MAX {
                issues.push(Issue::new(
                    &page.url,
                    IssueType::TitleTooLong,
                    json!({ "title": title, "length": len }),
                ));
            }
        }
    }

    match page.effective_meta_description() {
        None => issues.push(Issue::new(
            &page.url,
            IssueType::MissingMetaDescription,
            json!({}),
        )),
        Some(desc) => {
            let len = desc.chars().count();
            if len < META_DESC_MIN {
                issues.push(Issue::new(
                    &page.url,
                    IssueType::MetaDescTooShort,
                    json!({ "length": len }),
                ));
            } else if len > META_DESC_MAX {
                issues.push(Issue::new(
                    &page.url,
                    IssueType::MetaDescTooLong,
                    json!({ "length": len }),
                ));
            }
        }
    }

    match page.effective_h1_count() {
        0 => issues.push(Issue::new(&page.url, IssueType::MissingH1, json!({}))),
        1 => {}
        n => issues.push(Issue::new(
            &page.url,
            IssueType::MultipleH1,
            json!({ "h1_count": n }),
        )),
    }

    match page.canonical() {
        None => issues.push(Issue::new(&page.url, IssueType::MissingCanonical, json!({}))),
        Some(canonical) => {
            if let Some(canonical_domain) = domain_of(canonical)
                && let Some(final_domain) = domain_of(&page.final_url)
                && canonical_domain != final_domain
            {
                issues.push(Issue::new(
                    &page.url,
                    IssueType::CanonicalMismatch,
                    json!({ "canonical": canonical, "final_url": page.final_url }),
                ));
            }
        }
    }

    if ctx.seed_is_https && !page.final_url.starts_with("https://") {
        issues.push(Issue::new(
            &page.url,
            IssueType::NonHttps,
            json!({ "final_url": page.final_url }),
        ));
    }

    if page.effective_word_count() < ctx.thin_content_threshold {
        issues.push(Issue::new(
            &page.url,
            IssueType::ThinContent,
            json!({
                "word_count": page.effective_word_count(),
                "threshold": ctx.thin_content_threshold,
            }),
        ));
    }

    issues
}

/// A loop exists when any URL appears more than once across the full
/// redirect chain including the terminal URL. This also catches a
/// self-redirect as the very first hop.
fn has_redirect_loop(page: &PageRecord) -> bool {
    if page.redirect_chain.is_empty() {
        return false;
    }

    let mut seen = std::collections::HashSet::new();
    for url in page.redirect_chain.iter().chain(std::iter::once(&page.final_url)) {
        if !seen.insert(url) {
            return true;
        }
    }
    false
}

fn domain_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(registrable_domain)
}

/// Whole-run pass over accumulated titles and content hashes. Runs
/// only after every page has been analyzed; duplicates are a run
/// property, not a page property.
pub fn detect_duplicates(pages: &[PageRecord]) -> Vec<Issue> {
    let mut by_title: HashMap<String, Vec<&str>> = HashMap::new();
    let mut by_hash: HashMap<&str, Vec<&str>> = HashMap::new();

    for page in pages.iter().filter(|p| p.is_success()) {
        if let Some(title) = page.effective_title() {
            let normalized = title.trim().to_lowercase();
            if !normalized.is_empty() {
                by_title.entry(normalized).or_default().push(&page.url);
            }
        }
        if let Some(hash) = page.content_hash() {
            by_hash.entry(hash).or_default().push(&page.url);
        }
    }

    let mut issues = Vec::new();

    for (title, urls) in &by_title {
        if urls.len() < 2 {
            continue;
        }
        for url in urls {
            let siblings: Vec<&&str> = urls.iter().filter(|u| *u != url).collect();
            issues.push(Issue::new(
                url,
                IssueType::DuplicateTitle,
                json!({ "title": title, "duplicates": siblings }),
            ));
        }
    }

    for (hash, urls) in &by_hash {
        if urls.len() < 2 {
            continue;
        }
        for url in urls {
            let siblings: Vec<&&str> = urls.iter().filter(|u| *u != url).collect();
            issues.push(Issue::new(
                url,
                IssueType::DuplicateContent,
                json!({ "content_hash": hash, "duplicates": siblings }),
            ));
        }
    }

    // Deterministic output regardless of map iteration order.
    issues.sort_by(|a, b| {
        (a.page_url.as_str(), a.issue_type.as_str())
            .cmp(&(b.page_url.as_str(), b.issue_type.as_str()))
    });

    issues
}

/// Per-page rules for every page, then the duplicate barrier pass.
pub fn analyze_run(pages: &[PageRecord], ctx: &AnalyzerContext) -> Vec<Issue> {
    let mut issues: Vec<Issue> = pages
        .iter()
        .flat_map(|page| analyze_page(page, ctx))
        .collect();

    issues.extend(detect_duplicates(pages));
    issues
}
