use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signals pulled out of a page's static HTML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedData {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical: Option<String>,
    pub h1_count: usize,
    pub first_h1: Option<String>,
    pub word_count: usize,
    pub meta_robots: Option<String>,
    pub content_hash: String,
}

/// The subset of signals re-extracted from the live DOM after rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderedData {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1_count: usize,
    pub word_count: usize,
}

/// One hyperlink discovered on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEdge {
    pub source_url: String,
    pub target_url: String,
    pub anchor_text: String,
    pub is_internal: bool,
    pub is_followed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub final_url: String,
    pub depth: usize,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub response_time: Duration,
    pub redirect_chain: Vec<String>,
    pub extracted: Option<ExtractedData>,
    pub rendered: Option<RenderedData>,
    pub is_rendered: bool,
    pub error: Option<String>,
}

impl PageRecord {
    pub fn new(url: String, depth: usize) -> Self {
        Self {
            final_url: url.clone(),
            url,
            depth,
            status_code: 0,
            content_type: None,
            response_time: Duration::from_secs(0),
            redirect_chain: Vec::new(),
            extracted: None,
            rendered: None,
            is_rendered: false,
            error: None,
        }
    }

    pub fn with_error(url: String, depth: usize, error: String) -> Self {
        let mut record = Self::new(url, depth);
        record.error = Some(error);
        record
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Rendered values, when present, win over static extraction.
    pub fn effective_title(&self) -> Option<&str> {
        if self.is_rendered
            && let Some(ref rendered) = self.rendered
        {
            return rendered.title.as_deref();
        }
        self.extracted.as_ref().and_then(|e| e.title.as_deref())
    }

    pub fn effective_meta_description(&self) -> Option<&str> {
        if self.is_rendered
            && let Some(ref rendered) = self.rendered
        {
            return rendered.meta_description.as_deref();
        }
        self.extracted
            .as_ref()
            .and_then(|e| e.meta_description.as_deref())
    }

    pub fn effective_h1_count(&self) -> usize {
        if self.is_rendered
            && let Some(ref rendered) = self.rendered
        {
            return rendered.h1_count;
        }
        self.extracted.as_ref().map(|e| e.h1_count).unwrap_or(0)
    }

    pub fn effective_word_count(&self) -> usize {
        if self.is_rendered
            && let Some(ref rendered) = self.rendered
        {
            return rendered.word_count;
        }
        self.extracted.as_ref().map(|e| e.word_count).unwrap_or(0)
    }

    pub fn canonical(&self) -> Option<&str> {
        self.extracted.as_ref().and_then(|e| e.canonical.as_deref())
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.extracted.as_ref().map(|e| e.content_hash.as_str())
    }
}
