use serde::{Deserialize, Serialize};
use sitelint_crawler::RenderMode;

/// Immutable configuration for one audit run. Snapshotted into the
/// run row at start so later config edits cannot touch an in-flight
/// run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub seed_url: String,
    pub max_pages: usize,
    pub max_depth: usize,
    pub concurrency: usize,
    pub user_agent: String,
    pub respect_robots: bool,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub render_mode: RenderMode,
    pub max_render_pages: usize,
    pub render_concurrency: usize,
    pub render_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Below this static word count a page is a render candidate.
    pub render_word_threshold: usize,
    /// Below this effective word count a page is thin content.
    pub thin_content_threshold: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            seed_url: String::new(),
            max_pages: 500,
            max_depth: 3,
            concurrency: 5,
            user_agent: "Sitelint/0.2 (+https://github.com/trapdoorsec/sitelint)".to_string(),
            respect_robots: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            render_mode: RenderMode::Hybrid,
            max_render_pages: 20,
            render_concurrency: 2,
            render_timeout_secs: 30,
            fetch_timeout_secs: 30,
            render_word_threshold: 50,
            thin_content_threshold: 300,
        }
    }
}

impl AuditConfig {
    pub fn for_seed(seed_url: &str) -> Self {
        Self {
            seed_url: seed_url.to_string(),
            ..Default::default()
        }
    }
}
