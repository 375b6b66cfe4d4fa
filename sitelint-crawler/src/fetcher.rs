use crate::error::{CrawlError, Result};
use crate::result::PageRecord;
use reqwest::header::LOCATION;
use reqwest::{Client, redirect};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

const MAX_REDIRECT_HOPS: usize = 10;

/// Outcome of fetching one URL: the page record skeleton (no
/// extraction yet) plus the HTML body when there was one to read.
pub struct FetchedPage {
    pub record: PageRecord,
    pub body: Option<String>,
}

/// Performs the HTTP side of the crawl. Redirects are followed by
/// hand so every intermediate URL lands in the redirect chain; the
/// reqwest policy is disabled entirely.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(redirect::Policy::none())
            .build()
            .map_err(CrawlError::HttpError)?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch one URL. A timeout or connection error never escapes as
    /// `Err`; it becomes a record with status 0 and an error marker so
    /// one bad page cannot take the run down.
    pub async fn fetch_page(&self, url: &str, depth: usize) -> FetchedPage {
        debug!("Fetching {}", url);

        let mut record = PageRecord::new(url.to_string(), depth);
        let mut current = url.to_string();
        let start = Instant::now();

        for _hop in 0..=MAX_REDIRECT_HOPS {
            let response = match self.client.get(&current).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!("Fetch failed for {}: {}", current, e);
                    record.response_time = start.elapsed();
                    record.final_url = current;
                    // A failure partway through a redirect chain must
                    // not leave the last 3xx status behind.
                    record.status_code = 0;
                    record.error = Some(e.to_string());
                    return FetchedPage { record, body: None };
                }
            };

            let status = response.status();

            if status.is_redirection() {
                let next = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|loc| Url::parse(&current).ok()?.join(loc).ok());

                match next {
                    Some(next_url) => {
                        debug!("Redirect {} -> {}", current, next_url);
                        record.redirect_chain.push(current);
                        current = next_url.to_string();
                        record.status_code = status.as_u16();
                        continue;
                    }
                    None => {
                        // Redirect without a usable Location header is
                        // terminal; record it as-is.
                        record.response_time = start.elapsed();
                        record.final_url = current;
                        record.status_code = status.as_u16();
                        record.error = Some("redirect without location header".to_string());
                        return FetchedPage { record, body: None };
                    }
                }
            }

            record.status_code = status.as_u16();
            record.final_url = current;
            record.content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            let is_html = record
                .content_type
                .as_ref()
                .map(|ct| ct.contains("text/html"))
                .unwrap_or(false);

            let body = if status.is_success() && is_html {
                match response.text().await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!("Failed to read body of {}: {}", record.final_url, e);
                        record.error = Some(e.to_string());
                        None
                    }
                }
            } else {
                None
            };

            record.response_time = start.elapsed();
            return FetchedPage { record, body };
        }

        // Hop cap exhausted while still being redirected. The last
        // 3xx status and the full chain stay on the record so the
        // analyzer can flag it.
        record.response_time = start.elapsed();
        record.final_url = current;
        record.error = Some("too many redirects".to_string());
        FetchedPage { record, body: None }
    }
}
