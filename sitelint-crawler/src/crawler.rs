use crate::error::{CrawlError, Result};
use crate::extract;
use crate::fetcher::Fetcher;
use crate::result::{LinkEdge, PageRecord};
use crate::robots::RobotsGate;
use crate::scope::{self, ScopeFilter};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

pub struct CrawlOutput {
    pub pages: Vec<PageRecord>,
    pub links: Vec<LinkEdge>,
}

/// The frontier: one visited set and one pending queue, drained by a
/// bounded worker pool. Workers never touch the set or queue except
/// through the frontier's own locks.
pub struct Crawler {
    fetcher: Arc<Fetcher>,
    robots: Arc<RobotsGate>,
    scope: Arc<ScopeFilter>,
    visited: Arc<Mutex<HashSet<String>>>,
    queue: Arc<Mutex<VecDeque<(String, usize)>>>,
    in_flight: Arc<AtomicUsize>,
    pages: Arc<Mutex<Vec<PageRecord>>>,
    links: Arc<Mutex<Vec<LinkEdge>>>,
    fetched_count: Arc<AtomicUsize>,
    max_depth: usize,
    max_pages: usize,
    cancel: Arc<AtomicBool>,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(fetcher: Fetcher, robots: RobotsGate, scope: ScopeFilter) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            robots: Arc::new(robots),
            scope: Arc::new(scope),
            visited: Arc::new(Mutex::new(HashSet::new())),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            pages: Arc::new(Mutex::new(Vec::new())),
            links: Arc::new(Mutex::new(Vec::new())),
            fetched_count: Arc::new(AtomicUsize::new(0)),
            max_depth: 3,
            max_pages: 500,
            cancel: Arc::new(AtomicBool::new(false)),
            progress_callback: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// External stop switch: in-flight fetches drain, no new work is
    /// dispatched.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn crawl(&self, seed_url: &str, workers: usize) -> Result<CrawlOutput> {
        info!("Starting crawl of {} with {} workers", seed_url, workers);

        let parsed_seed = Url::parse(seed_url)
            .map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", seed_url, e)))?;
        let seed = scope::normalize_url(&parsed_seed);

        if !self.robots.allowed(&seed) {
            warn!("Seed URL {} is disallowed by robots.txt", seed);
            return Ok(CrawlOutput {
                pages: Vec::new(),
                links: Vec::new(),
            });
        }

        // Seed: claim the visited slot and enqueue at depth 0.
        {
            let mut visited = self.visited.lock().await;
            visited.insert(seed.clone());
            let mut queue = self.queue.lock().await;
            queue.push_back((seed, 0));
        }

        let mut worker_handles = Vec::new();

        for worker_id in 0..workers.max(1) {
            let fetcher = self.fetcher.clone();
            let robots = self.robots.clone();
            let scope_filter = self.scope.clone();
            let visited = self.visited.clone();
            let queue = self.queue.clone();
            let in_flight = self.in_flight.clone();
            let pages = self.pages.clone();
            let links = self.links.clone();
            let fetched_count = self.fetched_count.clone();
            let cancel = self.cancel.clone();
            let progress_cb = self.progress_callback.clone();
            let max_depth = self.max_depth;
            let max_pages = self.max_pages;

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);
                let mut empty_iterations = 0;
                const MAX_EMPTY_ITERATIONS: usize = 10;

                loop {
                    if cancel.load(Ordering::Relaxed) {
                        debug!("Worker {} stopping on cancellation", worker_id);
                        break;
                    }

                    // Claim work and mark in-flight under the same
                    // lock so the emptiness check below cannot race a
                    // worker that is still about to produce offers.
                    let work_item = {
                        let mut queue = queue.lock().await;
                        match queue.pop_front() {
                            Some(item) => {
                                in_flight.fetch_add(1, Ordering::SeqCst);
                                Some(item)
                            }
                            None => None,
                        }
                    };

                    let (url, depth) = match work_item {
                        Some(item) => {
                            empty_iterations = 0;
                            item
                        }
                        None => {
                            let drained = {
                                let queue = queue.lock().await;
                                queue.is_empty() && in_flight.load(Ordering::SeqCst) == 0
                            };
                            if drained {
                                empty_iterations += 1;
                                if empty_iterations >= MAX_EMPTY_ITERATIONS {
                                    debug!("Worker {} exiting", worker_id);
                                    break;
                                }
                            } else {
                                empty_iterations = 0;
                            }
                            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                            continue;
                        }
                    };

                    let fetched = fetcher.fetch_page(&url, depth).await;
                    let mut record = fetched.record;

                    if let Some(body) = fetched.body
                        && record.is_success()
                        && let Ok(base) = Url::parse(&record.final_url)
                    {
                        let (data, page_links) =
                            extract::extract(&body, &base, scope_filter.seed_domain());
                        record.extracted = Some(data);

                        if !cancel.load(Ordering::Relaxed) {
                            Self::offer_links(
                                &page_links,
                                depth,
                                max_depth,
                                max_pages,
                                &robots,
                                &scope_filter,
                                &visited,
                                &queue,
                            )
                            .await;
                        }

                        let mut links_lock = links.lock().await;
                        links_lock.extend(page_links);
                    }

                    {
                        let mut pages_lock = pages.lock().await;
                        pages_lock.push(record);
                    }

                    let done = fetched_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(ref callback) = progress_cb {
                        callback(done, url);
                    }

                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }

                debug!("Worker {} finished", worker_id);
            });

            worker_handles.push(handle);
        }

        for handle in worker_handles {
            handle
                .await
                .map_err(|e| CrawlError::Other(format!("Worker task failed: {}", e)))?;
        }

        let pages = std::mem::take(&mut *self.pages.lock().await);
        let links = std::mem::take(&mut *self.links.lock().await);
        info!("Crawl complete. Fetched {} pages", pages.len());

        Ok(CrawlOutput { pages, links })
    }

    /// Push a page's internal links onto the frontier, applying the
    /// visited/depth/page-budget/robots/scope gates.
    #[allow(clippy::too_many_arguments)]
    async fn offer_links(
        page_links: &[LinkEdge],
        depth: usize,
        max_depth: usize,
        max_pages: usize,
        robots: &RobotsGate,
        scope_filter: &ScopeFilter,
        visited: &Mutex<HashSet<String>>,
        queue: &Mutex<VecDeque<(String, usize)>>,
    ) {
        let next_depth = depth + 1;
        if next_depth > max_depth {
            return;
        }

        for link in page_links.iter().filter(|l| l.is_internal) {
            let Ok(target) = Url::parse(&link.target_url) else {
                continue;
            };

            if !scope_filter.in_scope(&target) || !robots.allowed(link.target_url.as_str()) {
                continue;
            }

            let mut visited = visited.lock().await;
            if visited.len() >= max_pages || visited.contains(&link.target_url) {
                continue;
            }
            visited.insert(link.target_url.clone());

            let mut queue = queue.lock().await;
            queue.push_back((link.target_url.clone(), next_depth));
        }
    }

    pub async fn visited_count(&self) -> usize {
        self.visited.lock().await.len()
    }
}
