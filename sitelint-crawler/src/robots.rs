use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// robots.txt policy for one origin, fetched once per run.
///
/// Fails open: any fetch or parse trouble means the site is treated
/// as unrestricted rather than the run dying on a flaky robots.txt.
pub struct RobotsGate {
    body: Option<String>,
    user_agent: String,
}

impl RobotsGate {
    /// A gate that allows everything, used when robots compliance is
    /// disabled for the project.
    pub fn unrestricted(user_agent: &str) -> Self {
        Self {
            body: None,
            user_agent: user_agent.to_string(),
        }
    }

    /// Fetch `/robots.txt` for the seed's origin.
    pub async fn fetch(client: &Client, origin: &Url, user_agent: &str) -> Self {
        let robots_url = match origin.join("/robots.txt") {
            Ok(u) => u,
            Err(_) => {
                warn!("Could not build robots.txt URL for {}", origin);
                return Self::unrestricted(user_agent);
            }
        };

        debug!("Fetching robots policy from {}", robots_url);

        let body = match client
            .get(robots_url.as_str())
            .timeout(ROBOTS_FETCH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(text) => {
                    info!("Loaded robots.txt for {} ({} bytes)", origin, text.len());
                    Some(text)
                }
                Err(e) => {
                    warn!("Failed to read robots.txt body for {}: {}", origin, e);
                    None
                }
            },
            Ok(response) => {
                debug!(
                    "No usable robots.txt for {} (HTTP {})",
                    origin,
                    response.status()
                );
                None
            }
            Err(e) => {
                warn!("Failed to fetch robots.txt for {}: {}", origin, e);
                None
            }
        };

        Self {
            body,
            user_agent: user_agent.to_string(),
        }
    }

    pub fn allowed(&self, url: &str) -> bool {
        match &self.body {
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                let allowed = matcher.one_agent_allowed_by_robots(body, &self.user_agent, url);
                if !allowed {
                    debug!("robots.txt disallows {}", url);
                }
                allowed
            }
            None => true,
        }
    }
}
