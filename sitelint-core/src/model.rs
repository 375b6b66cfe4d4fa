use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    ServerError5xx,
    ClientError4xx,
    FetchError,
    RedirectChain,
    RedirectLoop,
    MissingTitle,
    TitleTooShort,
    TitleTooLong,
    MissingMetaDescription,
    MetaDescTooShort,
    MetaDescTooLong,
    MissingH1,
    MultipleH1,
    MissingCanonical,
    CanonicalMismatch,
    NonHttps,
    ThinContent,
    DuplicateTitle,
    DuplicateContent,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::ServerError5xx => "server_error_5xx",
            IssueType::ClientError4xx => "client_error_4xx",
            IssueType::FetchError => "fetch_error",
            IssueType::RedirectChain => "redirect_chain",
            IssueType::RedirectLoop => "redirect_loop",
            IssueType::MissingTitle => "missing_title",
            IssueType::TitleTooShort => "title_too_short",
            IssueType::TitleTooLong => "title_too_long",
            IssueType::MissingMetaDescription => "missing_meta_description",
            IssueType::MetaDescTooShort => "meta_desc_too_short",
            IssueType::MetaDescTooLong => "meta_desc_too_long",
            IssueType::MissingH1 => "missing_h1",
            IssueType::MultipleH1 => "multiple_h1",
            IssueType::MissingCanonical => "missing_canonical",
            IssueType::CanonicalMismatch => "canonical_mismatch",
            IssueType::NonHttps => "non_https",
            IssueType::ThinContent => "thin_content",
            IssueType::DuplicateTitle => "duplicate_title",
            IssueType::DuplicateContent => "duplicate_content",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "server_error_5xx" => Some(IssueType::ServerError5xx),
            "client_error_4xx" => Some(IssueType::ClientError4xx),
            "fetch_error" => Some(IssueType::FetchError),
            "redirect_chain" => Some(IssueType::RedirectChain),
            "redirect_loop" => Some(IssueType::RedirectLoop),
            "missing_title" => Some(IssueType::MissingTitle),
            "title_too_short" => Some(IssueType::TitleTooShort),
            "title_too_long" => Some(IssueType::TitleTooLong),
            "missing_meta_description" => Some(IssueType::MissingMetaDescription),
            "meta_desc_too_short" => Some(IssueType::MetaDescTooShort),
            "meta_desc_too_long" => Some(IssueType::MetaDescTooLong),
            "missing_h1" => Some(IssueType::MissingH1),
            "multiple_h1" => Some(IssueType::MultipleH1),
            "missing_canonical" => Some(IssueType::MissingCanonical),
            "canonical_mismatch" => Some(IssueType::CanonicalMismatch),
            "non_https" => Some(IssueType::NonHttps),
            "thin_content" => Some(IssueType::ThinContent),
            "duplicate_title" => Some(IssueType::DuplicateTitle),
            "duplicate_content" => Some(IssueType::DuplicateContent),
            _ => None,
        }
    }

    /// The one place severity is assigned. Never computed per page.
    pub fn severity(&self) -> Severity {
        match self {
            IssueType::ServerError5xx => Severity::Critical,
            IssueType::RedirectChain => Severity::Critical,
            IssueType::RedirectLoop => Severity::Critical,
            IssueType::ClientError4xx => Severity::High,
            IssueType::FetchError => Severity::High,
            IssueType::MissingTitle => Severity::High,
            IssueType::MissingMetaDescription => Severity::High,
            IssueType::DuplicateTitle => Severity::High,
            IssueType::TitleTooShort => Severity::Medium,
            IssueType::TitleTooLong => Severity::Medium,
            IssueType::MetaDescTooShort => Severity::Medium,
            IssueType::MetaDescTooLong => Severity::Medium,
            IssueType::MissingH1 => Severity::Medium,
            IssueType::MultipleH1 => Severity::Medium,
            IssueType::MissingCanonical => Severity::Medium,
            IssueType::CanonicalMismatch => Severity::Medium,
            IssueType::NonHttps => Severity::Medium,
            IssueType::DuplicateContent => Severity::Medium,
            IssueType::ThinContent => Severity::Low,
        }
    }
}

/// One rule violation on one page, plus its diff classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub page_url: String,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub details: serde_json::Value,
    pub first_seen_run_id: Option<String>,
    pub is_new: bool,
}

impl Issue {
    pub fn new(page_url: &str, issue_type: IssueType, details: serde_json::Value) -> Self {
        Self {
            page_url: page_url.to_string(),
            issue_type,
            severity: issue_type.severity(),
            details,
            first_seen_run_id: None,
            is_new: true,
        }
    }
}

/// Strictly forward state machine; `Failed` is reachable from any
/// non-terminal state and terminal states absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Queued,
    Crawling,
    Rendering,
    Analyzing,
    Diffing,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Crawling => "crawling",
            RunStatus::Rendering => "rendering",
            RunStatus::Analyzing => "analyzing",
            RunStatus::Diffing => "diffing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(RunStatus::Queued),
            "crawling" => Some(RunStatus::Crawling),
            "rendering" => Some(RunStatus::Rendering),
            "analyzing" => Some(RunStatus::Analyzing),
            "diffing" => Some(RunStatus::Diffing),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == RunStatus::Failed {
            return true;
        }
        matches!(
            (self, next),
            (RunStatus::Queued, RunStatus::Crawling)
                | (RunStatus::Crawling, RunStatus::Rendering)
                | (RunStatus::Rendering, RunStatus::Analyzing)
                | (RunStatus::Analyzing, RunStatus::Diffing)
                | (RunStatus::Diffing, RunStatus::Completed)
        )
    }
}

/// Aggregate counters reported at the end of a run and exposed while
/// it is in flight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub pages_crawled: usize,
    pub pages_rendered: usize,
    pub total_issues: usize,
    pub critical_issues: usize,
    pub high_issues: usize,
    pub medium_issues: usize,
    pub low_issues: usize,
    pub new_issues: usize,
    pub resolved_issues: usize,
    pub avg_response_time_ms: u64,
}

impl RunStats {
    pub fn count_severity(&mut self, severity: Severity) {
        self.total_issues += 1;
        match severity {
            Severity::Critical => self.critical_issues += 1,
            Severity::High => self.high_issues += 1,
            Severity::Medium => self.medium_issues += 1,
            Severity::Low => self.low_issues += 1,
        }
    }
}
