use crate::analyzer::{AnalyzerContext, analyze_run};
use crate::config::AuditConfig;
use crate::data::Database;
use crate::diff::{diff_issues, prior_issue_index};
use crate::model::{RunStats, RunStatus};
use sitelint_crawler::crawler::Crawler;
use sitelint_crawler::error::CrawlError;
use sitelint_crawler::render::{RenderMode, Renderer, select_render_candidates};
use sitelint_crawler::{Fetcher, RobotsGate, ScopeFilter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// How often crawl progress is flushed to the run row.
const PROGRESS_EVERY_PAGES: usize = 10;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("invalid seed URL: {0}")]
    InvalidSeed(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

pub type ProgressCallback = Arc<dyn Fn(u8, String) + Send + Sync>;

/// Shared handle to the store; rusqlite connections are Send but not
/// Sync, so writers take turns.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Run the full audit pipeline: crawl, conditional render, persist,
/// analyze, diff. Returns the run id. Any run-level fatal error
/// transitions the run to `failed` with a human-readable message
/// before propagating.
pub async fn execute_audit(
    db: SharedDatabase,
    config: AuditConfig,
    cancel: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
) -> Result<String, AuditError> {
    let run_id = {
        let db = db.lock().unwrap();
        db.create_run(&config)?
    };

    info!("Audit run {} created for {}", run_id, config.seed_url);

    match run_pipeline(&db, &config, &run_id, cancel, progress).await {
        Ok(stats) => {
            let db = db.lock().unwrap();
            db.complete_run(&run_id, &stats)?;
            info!(
                "Audit run {} completed: {} pages, {} issues",
                run_id, stats.pages_crawled, stats.total_issues
            );
            Ok(run_id)
        }
        Err(e) => {
            let message = e.to_string();
            warn!("Audit run {} failed: {}", run_id, message);
            if let Ok(db) = db.lock() {
                let _ = db.fail_run(&run_id, &message);
            }
            Err(e)
        }
    }
}

fn advance(
    db: &SharedDatabase,
    run_id: &str,
    status: &mut RunStatus,
    next: RunStatus,
) -> Result<(), AuditError> {
    if !status.can_transition_to(next) {
        return Err(AuditError::InvalidTransition {
            from: status.as_str(),
            to: next.as_str(),
        });
    }
    let db = db.lock().unwrap();
    db.set_run_status(run_id, next)?;
    *status = next;
    Ok(())
}

fn report_progress(
    db: &SharedDatabase,
    run_id: &str,
    progress: &Option<ProgressCallback>,
    pct: u8,
    message: String,
) {
    if let Ok(db) = db.lock()
        && let Err(e) = db.update_progress(run_id, pct, &message)
    {
        warn!("Failed to persist progress for {}: {}", run_id, e);
    }
    if let Some(callback) = progress {
        callback(pct, message);
    }
}

async fn run_pipeline(
    db: &SharedDatabase,
    config: &AuditConfig,
    run_id: &str,
    cancel: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
) -> Result<RunStats, AuditError> {
    let seed = Url::parse(&config.seed_url)
        .map_err(|e| AuditError::InvalidSeed(format!("{}: {}", config.seed_url, e)))?;

    let mut status = RunStatus::Queued;
    advance(db, run_id, &mut status, RunStatus::Crawling)?;
    report_progress(db, run_id, &progress, 0, "Starting crawl".to_string());

    // Crawl
    let fetcher = Fetcher::new(&config.user_agent, config.fetch_timeout_secs)?;
    let robots = if config.respect_robots {
        RobotsGate::fetch(fetcher.client(), &seed, &config.user_agent).await
    } else {
        RobotsGate::unrestricted(&config.user_agent)
    };
    let scope = ScopeFilter::new(
        &seed,
        config.include_patterns.clone(),
        config.exclude_patterns.clone(),
    );

    let crawl_progress = {
        let db = db.clone();
        let run_id = run_id.to_string();
        let progress = progress.clone();
        let max_pages = config.max_pages;
        Arc::new(move |done: usize, url: String| {
            if done % PROGRESS_EVERY_PAGES != 0 {
                return;
            }
            // Crawling owns the first 60% of the progress bar.
            let pct = ((done * 60) / max_pages.max(1)).min(60) as u8;
            report_progress(
                &db,
                &run_id,
                &progress,
                pct,
                format!("Crawled {} pages (last: {})", done, url),
            );
        })
    };

    let crawler = Crawler::new(fetcher, robots, scope)
        .with_max_depth(config.max_depth)
        .with_max_pages(config.max_pages)
        .with_cancel_flag(cancel.clone())
        .with_progress_callback(crawl_progress);

    let mut output = crawler.crawl(&config.seed_url, config.concurrency).await?;
    let cancelled = cancel.load(Ordering::Relaxed);

    // Render: a no-op transition when rendering is off for the run.
    advance(db, run_id, &mut status, RunStatus::Rendering)?;

    let mut pages_rendered = 0usize;
    if config.render_mode != RenderMode::Never && !cancelled {
        let candidates = select_render_candidates(
            &output.pages,
            config.render_mode,
            config.render_word_threshold,
            config.max_render_pages,
        );

        if !candidates.is_empty() {
            report_progress(
                db,
                run_id,
                &progress,
                60,
                format!("Rendering {} pages", candidates.len()),
            );

            match Renderer::launch(&config.user_agent, config.render_timeout_secs).await {
                Ok(renderer) => {
                    let rendered = renderer
                        .render_all(candidates, config.render_concurrency)
                        .await;
                    renderer.shutdown().await;

                    for page in output.pages.iter_mut() {
                        if let Some(data) = rendered.get(&page.url) {
                            page.rendered = Some(data.clone());
                            page.is_rendered = true;
                            pages_rendered += 1;
                        }
                    }
                }
                Err(e) => {
                    // Rendering is best-effort; the audit proceeds on
                    // static data.
                    warn!("Headless renderer unavailable: {}", e);
                }
            }
        }
    }

    // Persist the page set before any whole-run pass runs.
    {
        let db = db.lock().unwrap();
        for page in &output.pages {
            db.insert_page(run_id, page)?;
        }
        db.insert_links(run_id, &output.links)?;
    }

    // Analyze
    advance(db, run_id, &mut status, RunStatus::Analyzing)?;
    report_progress(
        db,
        run_id,
        &progress,
        70,
        format!("Analyzing {} pages", output.pages.len()),
    );

    let ctx = AnalyzerContext {
        seed_is_https: seed.scheme() == "https",
        thin_content_threshold: config.thin_content_threshold,
    };
    let mut issues = analyze_run(&output.pages, &ctx);

    // Diff against the previous completed run
    advance(db, run_id, &mut status, RunStatus::Diffing)?;

    let (prior_run_id, prior_index) = {
        let db_lock = db.lock().unwrap();
        match db_lock.latest_completed_run(&config.seed_url, run_id)? {
            Some(prior_id) => {
                let index = prior_issue_index(&db_lock, &prior_id)?;
                (Some(prior_id), index)
            }
            None => (None, Default::default()),
        }
    };

    report_progress(
        db,
        run_id,
        &progress,
        90,
        match &prior_run_id {
            Some(id) => format!("Diffing against run {}", id),
            None => "No prior run; all issues are new".to_string(),
        },
    );

    let outcome = diff_issues(&mut issues, &prior_index, prior_run_id.as_deref(), run_id);

    {
        let db = db.lock().unwrap();
        db.insert_issues(run_id, &issues)?;
    }

    // Stats
    let mut stats = RunStats {
        pages_crawled: output.pages.len(),
        pages_rendered,
        new_issues: outcome.new_count,
        resolved_issues: outcome.resolved_count,
        ..Default::default()
    };
    for issue in &issues {
        stats.count_severity(issue.severity);
    }

    let reachable: Vec<&sitelint_crawler::PageRecord> = output
        .pages
        .iter()
        .filter(|p| p.status_code != 0)
        .collect();
    if !reachable.is_empty() {
        let total_ms: u128 = reachable.iter().map(|p| p.response_time.as_millis()).sum();
        stats.avg_response_time_ms = (total_ms / reachable.len() as u128) as u64;
    }

    let final_message = if cancelled {
        format!("Cancelled after {} pages", stats.pages_crawled)
    } else {
        format!(
            "Audit complete: {} pages, {} issues ({} new, {} resolved)",
            stats.pages_crawled, stats.total_issues, stats.new_issues, stats.resolved_issues
        )
    };
    report_progress(db, run_id, &progress, 100, final_message);

    advance(db, run_id, &mut status, RunStatus::Completed)?;

    Ok(stats)
}
