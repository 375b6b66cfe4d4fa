// Tests for database functionality

use sitelint_core::config::AuditConfig;
use sitelint_core::data::Database;
use sitelint_core::model::{Issue, IssueType, RunStats, RunStatus};
use sitelint_crawler::{ExtractedData, LinkEdge, PageRecord};
use std::time::Duration;
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn test_page(url: &str, status: u16) -> PageRecord {
    let mut page = PageRecord::new(url.to_string(), 0);
    page.status_code = status;
    page.response_time = Duration::from_millis(42);
    page.extracted = Some(ExtractedData {
        title: Some("Stored page".to_string()),
        word_count: 120,
        content_hash: "abcdef0123456789".to_string(),
        ..Default::default()
    });
    page
}

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path);
    assert!(db.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_database_exists() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    assert!(!Database::exists(&db_path));

    let _db = Database::new(&db_path).unwrap();
    assert!(Database::exists(&db_path));
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_create_run() {
    let (_temp_dir, db) = create_test_db();

    let run_id = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();
    assert!(!run_id.is_empty());

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(run.seed_url, "https://example.com");
    assert_eq!(run.status, "queued");
    assert!(run.finished_at.is_none());

    // The config snapshot round-trips.
    let config: AuditConfig = serde_json::from_str(&run.config).unwrap();
    assert_eq!(config.max_pages, 500);
}

#[test]
fn test_run_status_and_progress() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();

    db.set_run_status(&run_id, RunStatus::Crawling).unwrap();
    db.update_progress(&run_id, 30, "Crawled 30 pages").unwrap();

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(run.status, "crawling");
    assert_eq!(run.progress_pct, 30);
    assert_eq!(run.progress_message.as_deref(), Some("Crawled 30 pages"));
}

#[test]
fn test_complete_run_stores_stats() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();

    let stats = RunStats {
        pages_crawled: 12,
        total_issues: 3,
        ..Default::default()
    };
    db.complete_run(&run_id, &stats).unwrap();

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(run.status, "completed");
    assert_eq!(run.progress_pct, 100);
    assert!(run.finished_at.is_some());

    let stored: RunStats = serde_json::from_str(run.stats.as_deref().unwrap()).unwrap();
    assert_eq!(stored.pages_crawled, 12);
}

#[test]
fn test_fail_run() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();

    db.fail_run(&run_id, "seed unreachable").unwrap();

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(run.status, "failed");
    assert_eq!(run.error_message.as_deref(), Some("seed unreachable"));
}

#[test]
fn test_get_missing_run_is_none() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.get_run("no-such-run").unwrap().is_none());
}

#[test]
fn test_latest_completed_run_excludes_current() {
    let (_temp_dir, db) = create_test_db();
    let config = AuditConfig::for_seed("https://example.com");

    let old = db.create_run(&config).unwrap();
    db.complete_run(&old, &RunStats::default()).unwrap();

    let current = db.create_run(&config).unwrap();

    let baseline = db
        .latest_completed_run("https://example.com", &current)
        .unwrap();
    assert_eq!(baseline.as_deref(), Some(old.as_str()));

    // A completed run never diffs against itself.
    let none = db.latest_completed_run("https://example.com", &old).unwrap();
    assert!(none.is_none());
}

#[test]
fn test_latest_completed_run_ignores_other_seeds() {
    let (_temp_dir, db) = create_test_db();

    let other = db
        .create_run(&AuditConfig::for_seed("https://other.net"))
        .unwrap();
    db.complete_run(&other, &RunStats::default()).unwrap();

    let current = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();
    let baseline = db
        .latest_completed_run("https://example.com", &current)
        .unwrap();
    assert!(baseline.is_none());
}

#[test]
fn test_list_runs_newest_first() {
    let (_temp_dir, db) = create_test_db();
    let a = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();
    let b = db
        .create_run(&AuditConfig::for_seed("https://other.net"))
        .unwrap();

    let runs = db.list_runs().unwrap();
    assert_eq!(runs.len(), 2);
    let ids: Vec<&str> = runs.iter().map(|r| r.id.as_str()).collect();
    assert!(ids.contains(&a.as_str()));
    assert!(ids.contains(&b.as_str()));
}

// ============================================================================
// Page Tests
// ============================================================================

#[test]
fn test_insert_and_read_pages() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();

    let page_id = db
        .insert_page(&run_id, &test_page("https://example.com/", 200))
        .unwrap();
    assert!(page_id > 0);
    db.insert_page(&run_id, &test_page("https://example.com/a", 404))
        .unwrap();

    let pages = db.get_pages_by_run(&run_id).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].url, "https://example.com/");
    assert_eq!(pages[0].status_code, 200);
    assert_eq!(pages[0].title.as_deref(), Some("Stored page"));
    assert_eq!(pages[1].status_code, 404);

    assert_eq!(db.count_pages(&run_id).unwrap(), 2);
}

#[test]
fn test_duplicate_page_url_rejected() {
    // One row per URL per run.
    let (_temp_dir, db) = create_test_db();
    let run_id = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();

    db.insert_page(&run_id, &test_page("https://example.com/", 200))
        .unwrap();
    let dup = db.insert_page(&run_id, &test_page("https://example.com/", 200));
    assert!(dup.is_err());
}

#[test]
fn test_insert_links() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();

    let links = vec![LinkEdge {
        source_url: "https://example.com/".to_string(),
        target_url: "https://example.com/a".to_string(),
        anchor_text: "About".to_string(),
        is_internal: true,
        is_followed: true,
    }];
    db.insert_links(&run_id, &links).unwrap();

    let count: i64 = db
        .get_connection()
        .query_row(
            "SELECT COUNT(*) FROM links WHERE run_id = ?1",
            [&run_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

// ============================================================================
// Issue Tests
// ============================================================================

#[test]
fn test_insert_and_read_issues() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();

    let issues = vec![
        Issue::new(
            "https://example.com/a",
            IssueType::ThinContent,
            serde_json::json!({ "word_count": 40 }),
        ),
        Issue::new("https://example.com/b", IssueType::ServerError5xx, serde_json::json!({})),
    ];
    db.insert_issues(&run_id, &issues).unwrap();

    let rows = db.get_issues_by_run(&run_id).unwrap();
    assert_eq!(rows.len(), 2);
    // Severity ordering: critical before low.
    assert_eq!(rows[0].issue_type, "server_error_5xx");
    assert_eq!(rows[1].issue_type, "thin_content");
}

#[test]
fn test_issue_index_and_severity_counts() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db
        .create_run(&AuditConfig::for_seed("https://example.com"))
        .unwrap();

    let mut issue = Issue::new(
        "https://example.com/",
        IssueType::MissingTitle,
        serde_json::json!({}),
    );
    issue.first_seen_run_id = Some("earlier-run".to_string());
    db.insert_issues(&run_id, &[issue]).unwrap();

    let index = db.issue_index(&run_id).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].0, "https://example.com/");
    assert_eq!(index[0].1, "missing_title");
    assert_eq!(index[0].2.as_deref(), Some("earlier-run"));

    let counts = db.count_issues_by_severity(&run_id).unwrap();
    assert_eq!(counts, vec![("high".to_string(), 1)]);
}
