// Tests for the page rule engine and the duplicate barrier pass

use sitelint_core::analyzer::{AnalyzerContext, analyze_page, analyze_run, detect_duplicates};
use sitelint_core::model::{IssueType, Severity};
use sitelint_crawler::{ExtractedData, PageRecord, RenderedData};
use std::time::Duration;

fn test_ctx() -> AnalyzerContext {
    AnalyzerContext {
        seed_is_https: true,
        thin_content_threshold: 300,
    }
}

fn healthy_page(url: &str) -> PageRecord {
    let mut page = PageRecord::new(url.to_string(), 0);
    page.status_code = 200;
    page.response_time = Duration::from_millis(50);
    page.extracted = Some(ExtractedData {
        title: Some("A perfectly sized page title here".to_string()),
        meta_description: Some(
            "A meta description that is long enough to satisfy the length rule comfortably."
                .to_string(),
        ),
        canonical: Some(url.to_string()),
        h1_count: 1,
        first_h1: Some("Heading".to_string()),
        word_count: 500,
        meta_robots: None,
        content_hash: format!("{:016x}", url.len() as u64),
    });
    page
}

// ============================================================================
// Fatal page states short-circuit
// ============================================================================

#[test]
fn test_healthy_page_yields_no_issues() {
    let page = healthy_page("https://example.com/");
    let issues = analyze_page(&page, &test_ctx());
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

#[test]
fn test_fetch_error_yields_single_issue() {
    let page = PageRecord::with_error(
        "https://example.com/down".to_string(),
        0,
        "connection refused".to_string(),
    );

    let issues = analyze_page(&page, &test_ctx());
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].issue_type, IssueType::FetchError);
    assert_eq!(issues[0].severity, Severity::High);
}

#[test]
fn test_fetch_error_mid_chain_yields_single_issue() {
    // A network failure after one or more redirect hops still lands
    // as status 0; the redirect rules must not run on top of it.
    let mut page = PageRecord::with_error(
        "https://example.com/away".to_string(),
        0,
        "connection refused".to_string(),
    );
    page.redirect_chain = vec!["https://example.com/away".to_string()];

    let issues = analyze_page(&page, &test_ctx());
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].issue_type, IssueType::FetchError);
}

#[test]
fn test_server_error_yields_exactly_one_issue() {
    // A 500 page has no title, no h1, no canonical; none of those
    // rules may fire on top of the error.
    let mut page = PageRecord::new("https://example.com/broken".to_string(), 1);
    page.status_code = 500;

    let issues = analyze_page(&page, &test_ctx());
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].issue_type, IssueType::ServerError5xx);
    assert_eq!(issues[0].severity, Severity::Critical);
}

#[test]
fn test_client_error_yields_exactly_one_issue() {
    let mut page = PageRecord::new("https://example.com/gone".to_string(), 1);
    page.status_code = 404;

    let issues = analyze_page(&page, &test_ctx());
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].issue_type, IssueType::ClientError4xx);
    assert_eq!(issues[0].severity, Severity::High);
}

// ============================================================================
// Redirect rules
// ============================================================================

#[test]
fn test_long_redirect_chain_flagged() {
    let mut page = healthy_page("https://example.com/a");
    page.redirect_chain = vec![
        "https://example.com/a".to_string(),
        "https://example.com/b".to_string(),
        "https://example.com/c".to_string(),
        "https://example.com/d".to_string(),
    ];
    page.final_url = "https://example.com/e".to_string();

    let issues = analyze_page(&page, &test_ctx());
    assert!(
        issues
            .iter()
            .any(|i| i.issue_type == IssueType::RedirectChain)
    );
}

#[test]
fn test_three_hop_chain_not_flagged() {
    let mut page = healthy_page("https://example.com/a");
    page.redirect_chain = vec![
        "https://example.com/a".to_string(),
        "https://example.com/b".to_string(),
        "https://example.com/c".to_string(),
    ];
    page.final_url = "https://example.com/d".to_string();

    let issues = analyze_page(&page, &test_ctx());
    assert!(
        !issues
            .iter()
            .any(|i| i.issue_type == IssueType::RedirectChain)
    );
}

#[test]
fn test_redirect_loop_detected() {
    let mut page = healthy_page("https://example.com/a");
    page.redirect_chain = vec![
        "https://example.com/a".to_string(),
        "https://example.com/b".to_string(),
    ];
    // Terminal URL revisits the start of the chain.
    page.final_url = "https://example.com/a".to_string();

    let issues = analyze_page(&page, &test_ctx());
    let loop_issue = issues
        .iter()
        .find(|i| i.issue_type == IssueType::RedirectLoop)
        .expect("loop should be flagged");
    assert_eq!(loop_issue.severity, Severity::Critical);
}

#[test]
fn test_no_loop_without_redirects() {
    let page = healthy_page("https://example.com/");
    let issues = analyze_page(&page, &test_ctx());
    assert!(
        !issues
            .iter()
            .any(|i| i.issue_type == IssueType::RedirectLoop)
    );
}

// ============================================================================
// Content rules
// ============================================================================

#[test]
fn test_missing_title_high_severity() {
    let mut page = healthy_page("https://example.com/");
    page.extracted.as_mut().unwrap().title = None;

    let issues = analyze_page(&page, &test_ctx());
    let issue = issues
        .iter()
        .find(|i| i.issue_type == IssueType::MissingTitle)
        .expect("missing title should be flagged");
    assert_eq!(issue.severity, Severity::High);
}

#[test]
fn test_title_length_bounds() {
    let mut short = healthy_page("https://example.com/short");
    short.extracted.as_mut().unwrap().title = Some("Tiny".to_string());
    let issues = analyze_page(&short, &test_ctx());
    assert!(
        issues
            .iter()
            .any(|i| i.issue_type == IssueType::TitleTooShort)
    );

    let mut long = healthy_page("https://example.com/long");
    long.extracted.as_mut().unwrap().title = Some("x".repeat(61));
    let issues = analyze_page(&long, &test_ctx());
    assert!(
        issues
            .iter()
            .any(|i| i.issue_type == IssueType::TitleTooLong)
    );
}

#[test]
fn test_title_length_counts_chars_not_bytes() {
    // Ten multibyte chars meet the minimum even though the byte count
    // is far higher.
    let mut page = healthy_page("https://example.com/unicode");
    page.extracted.as_mut().unwrap().title = Some("日本語のタイトルです!".to_string());

    let issues = analyze_page(&page, &test_ctx());
    assert!(
        !issues
            .iter()
            .any(|i| i.issue_type == IssueType::TitleTooShort)
    );
}

#[test]
fn test_meta_description_rules() {
    let mut missing = healthy_page("https://example.com/no-desc");
    missing.extracted.as_mut().unwrap().meta_description = None;
    let issues = analyze_page(&missing, &test_ctx());
    assert!(
        issues
            .iter()
            .any(|i| i.issue_type == IssueType::MissingMetaDescription)
    );

    let mut short = healthy_page("https://example.com/short-desc");
    short.extracted.as_mut().unwrap().meta_description = Some("Too short".to_string());
    let issues = analyze_page(&short, &test_ctx());
    assert!(
        issues
            .iter()
            .any(|i| i.issue_type == IssueType::MetaDescTooShort)
    );

    let mut long = healthy_page("https://example.com/long-desc");
    long.extracted.as_mut().unwrap().meta_description = Some("y".repeat(161));
    let issues = analyze_page(&long, &test_ctx());
    assert!(
        issues
            .iter()
            .any(|i| i.issue_type == IssueType::MetaDescTooLong)
    );
}

#[test]
fn test_h1_rules() {
    let mut none = healthy_page("https://example.com/no-h1");
    none.extracted.as_mut().unwrap().h1_count = 0;
    let issues = analyze_page(&none, &test_ctx());
    assert!(issues.iter().any(|i| i.issue_type == IssueType::MissingH1));

    let mut many = healthy_page("https://example.com/many-h1");
    many.extracted.as_mut().unwrap().h1_count = 3;
    let issues = analyze_page(&many, &test_ctx());
    assert!(issues.iter().any(|i| i.issue_type == IssueType::MultipleH1));
}

#[test]
fn test_canonical_rules() {
    let mut missing = healthy_page("https://example.com/no-canonical");
    missing.extracted.as_mut().unwrap().canonical = None;
    let issues = analyze_page(&missing, &test_ctx());
    assert!(
        issues
            .iter()
            .any(|i| i.issue_type == IssueType::MissingCanonical)
    );

    let mut mismatch = healthy_page("https://example.com/page");
    mismatch.extracted.as_mut().unwrap().canonical = Some("https://other.net/page".to_string());
    let issues = analyze_page(&mismatch, &test_ctx());
    assert!(
        issues
            .iter()
            .any(|i| i.issue_type == IssueType::CanonicalMismatch)
    );
}

#[test]
fn test_canonical_subdomain_not_a_mismatch() {
    // www.example.com and example.com share a registrable domain.
    let mut page = healthy_page("https://example.com/page");
    page.extracted.as_mut().unwrap().canonical = Some("https://www.example.com/page".to_string());

    let issues = analyze_page(&page, &test_ctx());
    assert!(
        !issues
            .iter()
            .any(|i| i.issue_type == IssueType::CanonicalMismatch)
    );
}

#[test]
fn test_non_https_only_for_https_seed() {
    let mut page = healthy_page("https://example.com/insecure");
    page.final_url = "http://example.com/insecure".to_string();

    let issues = analyze_page(&page, &test_ctx());
    assert!(issues.iter().any(|i| i.issue_type == IssueType::NonHttps));

    let http_ctx = AnalyzerContext {
        seed_is_https: false,
        thin_content_threshold: 300,
    };
    let issues = analyze_page(&page, &http_ctx);
    assert!(!issues.iter().any(|i| i.issue_type == IssueType::NonHttps));
}

#[test]
fn test_thin_content_low_severity() {
    let mut page = healthy_page("https://example.com/thin");
    page.extracted.as_mut().unwrap().word_count = 100;

    let issues = analyze_page(&page, &test_ctx());
    let issue = issues
        .iter()
        .find(|i| i.issue_type == IssueType::ThinContent)
        .expect("thin content should be flagged");
    assert_eq!(issue.severity, Severity::Low);
}

// ============================================================================
// Rendered data wins over static extraction
// ============================================================================

#[test]
fn test_rendered_signals_take_precedence() {
    // Static extraction sees an empty shell; the rendered DOM has
    // everything. Content rules must judge the rendered values.
    let mut page = healthy_page("https://example.com/spa");
    {
        let extracted = page.extracted.as_mut().unwrap();
        extracted.title = None;
        extracted.h1_count = 0;
        extracted.word_count = 5;
    }
    page.rendered = Some(RenderedData {
        title: Some("Hydrated single page application".to_string()),
        meta_description: Some(
            "A client-rendered page whose description only exists after scripts run properly."
                .to_string(),
        ),
        h1_count: 1,
        word_count: 800,
    });
    page.is_rendered = true;

    let issues = analyze_page(&page, &test_ctx());
    assert!(
        !issues
            .iter()
            .any(|i| i.issue_type == IssueType::MissingTitle)
    );
    assert!(!issues.iter().any(|i| i.issue_type == IssueType::MissingH1));
    assert!(
        !issues
            .iter()
            .any(|i| i.issue_type == IssueType::ThinContent)
    );
}

#[test]
fn test_unrendered_page_uses_static_data() {
    // rendered data present but is_rendered false: static wins.
    let mut page = healthy_page("https://example.com/static");
    page.extracted.as_mut().unwrap().word_count = 10;
    page.rendered = Some(RenderedData {
        word_count: 900,
        ..Default::default()
    });

    let issues = analyze_page(&page, &test_ctx());
    assert!(
        issues
            .iter()
            .any(|i| i.issue_type == IssueType::ThinContent)
    );
}

// ============================================================================
// Duplicate detection
// ============================================================================

#[test]
fn test_duplicate_titles_cross_referenced() {
    let mut a = healthy_page("https://example.com/a");
    let mut b = healthy_page("https://example.com/b");
    a.extracted.as_mut().unwrap().title = Some("Shared Product Page Title".to_string());
    b.extracted.as_mut().unwrap().title = Some("shared product page title".to_string());
    b.extracted.as_mut().unwrap().content_hash = "deadbeefdeadbeef".to_string();

    let issues = detect_duplicates(&[a, b]);
    let dupes: Vec<_> = issues
        .iter()
        .filter(|i| i.issue_type == IssueType::DuplicateTitle)
        .collect();

    // One issue per page, each listing the other as a sibling.
    assert_eq!(dupes.len(), 2);
    assert!(
        dupes[0].details["duplicates"]
            .as_array()
            .unwrap()
            .iter()
            .any(|u| u.as_str() != Some(dupes[0].page_url.as_str()))
    );
}

#[test]
fn test_duplicate_content_by_hash() {
    let mut a = healthy_page("https://example.com/a");
    let mut b = healthy_page("https://example.com/b");
    a.extracted.as_mut().unwrap().title = Some("First page distinct title".to_string());
    b.extracted.as_mut().unwrap().title = Some("Second page distinct title".to_string());
    a.extracted.as_mut().unwrap().content_hash = "cafebabecafebabe".to_string();
    b.extracted.as_mut().unwrap().content_hash = "cafebabecafebabe".to_string();

    let issues = detect_duplicates(&[a, b]);
    let dupes: Vec<_> = issues
        .iter()
        .filter(|i| i.issue_type == IssueType::DuplicateContent)
        .collect();
    assert_eq!(dupes.len(), 2);
}

#[test]
fn test_error_pages_excluded_from_duplicates() {
    // Two 404s share a title; broken pages never count as duplicates.
    let mut a = healthy_page("https://example.com/a");
    let mut b = healthy_page("https://example.com/b");
    a.status_code = 404;
    b.status_code = 404;
    a.extracted.as_mut().unwrap().title = Some("Not Found".to_string());
    b.extracted.as_mut().unwrap().title = Some("Not Found".to_string());

    let issues = detect_duplicates(&[a, b]);
    assert!(issues.is_empty());
}

#[test]
fn test_empty_titles_never_duplicates() {
    let mut a = healthy_page("https://example.com/a");
    let mut b = healthy_page("https://example.com/b");
    a.extracted.as_mut().unwrap().title = Some("   ".to_string());
    b.extracted.as_mut().unwrap().title = Some("".to_string());
    b.extracted.as_mut().unwrap().content_hash = "feedfacefeedface".to_string();

    let issues = detect_duplicates(&[a, b]);
    assert!(
        !issues
            .iter()
            .any(|i| i.issue_type == IssueType::DuplicateTitle)
    );
}

// ============================================================================
// Whole-run determinism
// ============================================================================

#[test]
fn test_analyze_run_is_deterministic() {
    let mut a = healthy_page("https://example.com/a");
    let mut b = healthy_page("https://example.com/b");
    let mut c = healthy_page("https://example.com/c");
    a.extracted.as_mut().unwrap().title = Some("Shared title across pages".to_string());
    b.extracted.as_mut().unwrap().title = Some("Shared title across pages".to_string());
    c.status_code = 500;
    b.extracted.as_mut().unwrap().content_hash = "0123456789abcdef".to_string();

    let pages = vec![a, b, c];
    let ctx = test_ctx();

    let first = analyze_run(&pages, &ctx);
    let second = analyze_run(&pages, &ctx);

    let keys = |issues: &[sitelint_core::Issue]| {
        issues
            .iter()
            .map(|i| (i.page_url.clone(), i.issue_type))
            .collect::<Vec<_>>()
    };
    assert_eq!(keys(&first), keys(&second));
}
