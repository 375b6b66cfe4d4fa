use crate::config::AuditConfig;
use crate::model::{Issue, RunStats, RunStatus};
use rusqlite::{Connection, OptionalExtension, Result, params};
use sitelint_crawler::{LinkEdge, PageRecord};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct Database {
    conn: Connection,
}

/// A persisted audit run as read back from storage.
#[derive(Debug, Clone)]
pub struct RunRow {
    pub id: String,
    pub seed_url: String,
    pub status: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub config: String,
    pub stats: Option<String>,
    pub progress_pct: i64,
    pub progress_message: Option<String>,
    pub error_message: Option<String>,
}

/// A persisted page, flattened for listing.
#[derive(Debug, Clone)]
pub struct PageRow {
    pub url: String,
    pub final_url: String,
    pub depth: i64,
    pub status_code: u16,
    pub response_time_ms: i64,
    pub title: Option<String>,
    pub word_count: Option<i64>,
    pub is_rendered: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IssueRow {
    pub page_url: String,
    pub issue_type: String,
    pub severity: String,
    pub details: String,
    pub first_seen_run_id: Option<String>,
    pub is_new: bool,
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

impl Database {
    pub fn drop(path: &Path) {
        fs::remove_file(path).unwrap();
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Optimize for concurrent writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- Audit runs
            CREATE TABLE IF NOT EXISTS audit_runs (
    id TEXT PRIMARY KEY,
    seed_url TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN (
        'queued', 'crawling', 'rendering', 'analyzing', 'diffing', 'completed', 'failed'
    )),
    started_at INTEGER NOT NULL,
    finished_at INTEGER,
    config TEXT NOT NULL,       -- JSON snapshot frozen at run start
    stats TEXT,                 -- JSON aggregate counters
    progress_pct INTEGER NOT NULL DEFAULT 0,
    progress_message TEXT,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_seed ON audit_runs(seed_url, status);

-- One row per fetched URL per run
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    url TEXT NOT NULL,
    final_url TEXT NOT NULL,
    depth INTEGER NOT NULL DEFAULT 0,
    status_code INTEGER NOT NULL DEFAULT 0,
    content_type TEXT,
    response_time_ms INTEGER,
    redirect_chain TEXT,        -- JSON array of intermediate URLs

    -- Static extraction
    title TEXT,
    meta_description TEXT,
    canonical TEXT,
    h1_count INTEGER,
    first_h1 TEXT,
    word_count INTEGER,
    meta_robots TEXT,
    content_hash TEXT,

    -- Rendered variants
    rendered_title TEXT,
    rendered_meta_description TEXT,
    rendered_h1_count INTEGER,
    rendered_word_count INTEGER,
    is_rendered BOOLEAN NOT NULL DEFAULT 0,

    error TEXT,

    FOREIGN KEY(run_id) REFERENCES audit_runs(id) ON DELETE CASCADE,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_run ON pages(run_id);
CREATE INDEX IF NOT EXISTS idx_pages_status ON pages(run_id, status_code);

-- Discovered hyperlinks, audit evidence
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    source_url TEXT NOT NULL,
    target_url TEXT NOT NULL,
    anchor_text TEXT,
    is_internal BOOLEAN NOT NULL,
    is_followed BOOLEAN NOT NULL,

    FOREIGN KEY(run_id) REFERENCES audit_runs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_links_run ON links(run_id);
CREATE INDEX IF NOT EXISTS idx_links_source ON links(run_id, source_url);

-- Rule violations
CREATE TABLE IF NOT EXISTS issues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    page_url TEXT NOT NULL,
    issue_type TEXT NOT NULL,
    severity TEXT NOT NULL CHECK(severity IN ('critical', 'high', 'medium', 'low')),
    details TEXT,               -- JSON evidence
    first_seen_run_id TEXT,
    is_new BOOLEAN NOT NULL DEFAULT 1,

    FOREIGN KEY(run_id) REFERENCES audit_runs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_issues_run ON issues(run_id);
CREATE INDEX IF NOT EXISTS idx_issues_severity ON issues(run_id, severity);
CREATE INDEX IF NOT EXISTS idx_issues_key ON issues(run_id, page_url, issue_type);
            ",
        )?;
        Ok(())
    }

    // Run management

    pub fn create_run(&self, config: &AuditConfig) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = current_timestamp();
        let config_json =
            serde_json::to_string(config).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        self.conn.execute(
            "INSERT INTO audit_runs (id, seed_url, status, started_at, config) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&run_id, &config.seed_url, RunStatus::Queued.as_str(), timestamp, config_json],
        )?;

        Ok(run_id)
    }

    pub fn set_run_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE audit_runs SET status = ?1 WHERE id = ?2",
            params![status.as_str(), run_id],
        )?;
        Ok(())
    }

    pub fn update_progress(&self, run_id: &str, pct: u8, message: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE audit_runs SET progress_pct = ?1, progress_message = ?2 WHERE id = ?3",
            params![pct.min(100) as i64, message, run_id],
        )?;
        Ok(())
    }

    pub fn complete_run(&self, run_id: &str, stats: &RunStats) -> Result<()> {
        let timestamp = current_timestamp();
        let stats_json = serde_json::to_string(stats)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        self.conn.execute(
            "UPDATE audit_runs SET status = ?1, finished_at = ?2, stats = ?3, progress_pct = 100 WHERE id = ?4",
            params![RunStatus::Completed.as_str(), timestamp, stats_json, run_id],
        )?;
        Ok(())
    }

    pub fn fail_run(&self, run_id: &str, error_message: &str) -> Result<()> {
        let timestamp = current_timestamp();
        self.conn.execute(
            "UPDATE audit_runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.as_str(), timestamp, error_message, run_id],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<RunRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seed_url, status, started_at, finished_at, config, stats,
                    progress_pct, progress_message, error_message
             FROM audit_runs WHERE id = ?1",
        )?;

        stmt.query_row(params![run_id], |row| {
            Ok(RunRow {
                id: row.get(0)?,
                seed_url: row.get(1)?,
                status: row.get(2)?,
                started_at: row.get(3)?,
                finished_at: row.get(4)?,
                config: row.get(5)?,
                stats: row.get(6)?,
                progress_pct: row.get(7)?,
                progress_message: row.get(8)?,
                error_message: row.get(9)?,
            })
        })
        .optional()
    }

    pub fn list_runs(&self) -> Result<Vec<RunRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seed_url, status, started_at, finished_at, config, stats,
                    progress_pct, progress_message, error_message
             FROM audit_runs ORDER BY started_at DESC",
        )?;

        let runs = stmt
            .query_map([], |row| {
                Ok(RunRow {
                    id: row.get(0)?,
                    seed_url: row.get(1)?,
                    status: row.get(2)?,
                    started_at: row.get(3)?,
                    finished_at: row.get(4)?,
                    config: row.get(5)?,
                    stats: row.get(6)?,
                    progress_pct: row.get(7)?,
                    progress_message: row.get(8)?,
                    error_message: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(runs)
    }

    /// The most recent completed run for the same seed, excluding the
    /// run being diffed. This is the diff baseline.
    pub fn latest_completed_run(&self, seed_url: &str, exclude_run_id: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM audit_runs
             WHERE seed_url = ?1 AND status = 'completed' AND id != ?2
             ORDER BY finished_at DESC LIMIT 1",
        )?;

        stmt.query_row(params![seed_url, exclude_run_id], |row| row.get(0))
            .optional()
    }

    // Page operations

    pub fn insert_page(&self, run_id: &str, page: &PageRecord) -> Result<i64> {
        let redirect_chain = serde_json::to_string(&page.redirect_chain)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let extracted = page.extracted.as_ref();
        let rendered = page.rendered.as_ref();

        self.conn.execute(
            "INSERT INTO pages (
                run_id, url, final_url, depth, status_code, content_type,
                response_time_ms, redirect_chain,
                title, meta_description, canonical, h1_count, first_h1,
                word_count, meta_robots, content_hash,
                rendered_title, rendered_meta_description, rendered_h1_count,
                rendered_word_count, is_rendered, error
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            params![
                run_id,
                &page.url,
                &page.final_url,
                page.depth as i64,
                page.status_code as i64,
                &page.content_type,
                page.response_time.as_millis() as i64,
                redirect_chain,
                extracted.and_then(|e| e.title.as_deref()),
                extracted.and_then(|e| e.meta_description.as_deref()),
                extracted.and_then(|e| e.canonical.as_deref()),
                extracted.map(|e| e.h1_count as i64),
                extracted.and_then(|e| e.first_h1.as_deref()),
                extracted.map(|e| e.word_count as i64),
                extracted.and_then(|e| e.meta_robots.as_deref()),
                extracted.map(|e| e.content_hash.as_str()),
                rendered.and_then(|r| r.title.as_deref()),
                rendered.and_then(|r| r.meta_description.as_deref()),
                rendered.map(|r| r.h1_count as i64),
                rendered.map(|r| r.word_count as i64),
                page.is_rendered,
                &page.error,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_links(&self, run_id: &str, links: &[LinkEdge]) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO links (run_id, source_url, target_url, anchor_text, is_internal, is_followed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;

        for link in links {
            stmt.execute(params![
                run_id,
                &link.source_url,
                &link.target_url,
                &link.anchor_text,
                link.is_internal,
                link.is_followed,
            ])?;
        }

        Ok(())
    }

    pub fn get_pages_by_run(&self, run_id: &str) -> Result<Vec<PageRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, final_url, depth, status_code, response_time_ms,
                    title, word_count, is_rendered, error
             FROM pages WHERE run_id = ?1 ORDER BY id",
        )?;

        let pages = stmt
            .query_map(params![run_id], |row| {
                Ok(PageRow {
                    url: row.get(0)?,
                    final_url: row.get(1)?,
                    depth: row.get(2)?,
                    status_code: row.get::<_, i64>(3)? as u16,
                    response_time_ms: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                    title: row.get(5)?,
                    word_count: row.get(6)?,
                    is_rendered: row.get(7)?,
                    error: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(pages)
    }

    pub fn count_pages(&self, run_id: &str) -> Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )
    }

    // Issue operations

    pub fn insert_issues(&self, run_id: &str, issues: &[Issue]) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO issues (run_id, page_url, issue_type, severity, details, first_seen_run_id, is_new)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for issue in issues {
            let details = serde_json::to_string(&issue.details)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

            stmt.execute(params![
                run_id,
                &issue.page_url,
                issue.issue_type.as_str(),
                issue.severity.as_str(),
                details,
                &issue.first_seen_run_id,
                issue.is_new,
            ])?;
        }

        Ok(())
    }

    pub fn get_issues_by_run(&self, run_id: &str) -> Result<Vec<IssueRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_url, issue_type, severity, details, first_seen_run_id, is_new
             FROM issues WHERE run_id = ?1
             ORDER BY CASE severity
                 WHEN 'critical' THEN 1
                 WHEN 'high' THEN 2
                 WHEN 'medium' THEN 3
                 WHEN 'low' THEN 4
             END, page_url, id",
        )?;

        let issues = stmt
            .query_map(params![run_id], |row| {
                Ok(IssueRow {
                    page_url: row.get(0)?,
                    issue_type: row.get(1)?,
                    severity: row.get(2)?,
                    details: row.get(3)?,
                    first_seen_run_id: row.get(4)?,
                    is_new: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(issues)
    }

    /// Diff baseline: `(page_url, issue_type) -> first_seen_run_id`
    /// for one prior run.
    pub fn issue_index(&self, run_id: &str) -> Result<Vec<(String, String, Option<String>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_url, issue_type, first_seen_run_id FROM issues WHERE run_id = ?1",
        )?;

        let index = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(index)
    }

    pub fn count_issues_by_severity(&self, run_id: &str) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT severity, COUNT(*) FROM issues WHERE run_id = ?1 GROUP BY severity",
        )?;

        let counts = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>>>()?;

        Ok(counts)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}
