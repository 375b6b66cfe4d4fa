// Report generation from database

use crate::data::{Database, IssueRow};
use crate::model::RunStats;
use rusqlite::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub run_id: String,
    pub seed_url: String,
    pub status: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub total_pages: i64,
    pub stats: Option<RunStats>,
    pub severity_counts: SeverityCounts,
    pub issues: Vec<IssueData>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueData {
    pub page_url: String,
    pub issue_type: String,
    pub severity: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen_run_id: Option<String>,
    pub is_new: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

impl SeverityCounts {
    pub fn total(&self) -> i64 {
        self.critical + self.high + self.medium + self.low
    }
}

pub fn gather_report_data(db: &Database, run_id: &str) -> Result<Option<ReportData>> {
    let Some(run) = db.get_run(run_id)? else {
        return Ok(None);
    };

    let total_pages = db.count_pages(run_id)?;

    let mut severity_counts = SeverityCounts::default();
    for (severity, count) in db.count_issues_by_severity(run_id)? {
        match severity.as_str() {
            "critical" => severity_counts.critical = count,
            "high" => severity_counts.high = count,
            "medium" => severity_counts.medium = count,
            "low" => severity_counts.low = count,
            _ => {}
        }
    }

    let issues = db
        .get_issues_by_run(run_id)?
        .into_iter()
        .map(issue_row_to_data)
        .collect();

    let stats = run
        .stats
        .as_deref()
        .and_then(|json| serde_json::from_str(json).ok());

    Ok(Some(ReportData {
        run_id: run.id,
        seed_url: run.seed_url,
        status: run.status,
        started_at: run.started_at,
        finished_at: run.finished_at,
        total_pages,
        stats,
        severity_counts,
        issues,
        error_message: run.error_message,
    }))
}

fn issue_row_to_data(row: IssueRow) -> IssueData {
    let details =
        serde_json::from_str(&row.details).unwrap_or(serde_json::Value::Null);
    IssueData {
        page_url: row.page_url,
        issue_type: row.issue_type,
        severity: row.severity,
        details,
        first_seen_run_id: row.first_seen_run_id,
        is_new: row.is_new,
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("                           SITELINT AUDIT REPORT\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    report.push_str(&format!("Run ID:       {}\n", data.run_id));
    report.push_str(&format!("Seed URL:     {}\n", data.seed_url));
    report.push_str(&format!("Status:       {}\n", data.status_display()));
    report.push_str(&format!(
        "Audit Date:   {}\n",
        format_timestamp(data.started_at)
    ));

    if let Some(finished_at) = data.finished_at {
        let duration = finished_at - data.started_at;
        report.push_str(&format!("Duration:     {} seconds\n", duration));
    }

    report.push_str(&format!("Pages:        {}\n", data.total_pages));
    if let Some(stats) = &data.stats {
        report.push_str(&format!("Rendered:     {}\n", stats.pages_rendered));
        report.push_str(&format!(
            "Avg Response: {} ms\n",
            stats.avg_response_time_ms
        ));
    }
    if let Some(error) = &data.error_message {
        report.push_str(&format!("Error:        {}\n", error));
    }
    report.push('\n');

    // Summary
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("SUMMARY\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    report.push_str(&format!("Total Issues: {}\n", data.severity_counts.total()));
    if let Some(stats) = &data.stats {
        report.push_str(&format!(
            "              {} new, {} resolved since last run\n",
            stats.new_issues, stats.resolved_issues
        ));
    }
    report.push('\n');

    if data.severity_counts.critical > 0 {
        report.push_str(&format!(
            "  [CRITICAL] {}  (Immediate action required)\n",
            data.severity_counts.critical
        ));
    }
    if data.severity_counts.high > 0 {
        report.push_str(&format!(
            "  [HIGH]     {}  (High priority)\n",
            data.severity_counts.high
        ));
    }
    if data.severity_counts.medium > 0 {
        report.push_str(&format!(
            "  [MEDIUM]   {}  (Should be addressed)\n",
            data.severity_counts.medium
        ));
    }
    if data.severity_counts.low > 0 {
        report.push_str(&format!(
            "  [LOW]      {}  (Minor issues)\n",
            data.severity_counts.low
        ));
    }
    report.push('\n');

    // Detailed issues, already ordered by severity from the query
    if !data.issues.is_empty() {
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        report.push_str("ISSUES\n");
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

        for (idx, issue) in data.issues.iter().enumerate() {
            let marker = if issue.is_new { " (new)" } else { "" };
            report.push_str(&format!(
                "[{}] {}{}\n",
                idx + 1,
                format_issue_type(&issue.issue_type),
                marker
            ));
            report.push_str(&format!(
                "Severity:     {}\n",
                issue.severity.to_uppercase()
            ));
            report.push_str(&format!("URL:          {}\n", issue.page_url));

            if let serde_json::Value::Object(map) = &issue.details
                && !map.is_empty()
            {
                report.push_str("Details:\n");
                for (key, value) in map {
                    report.push_str(&format!("  {}: {}\n", key, format_detail(value)));
                }
            }

            report.push('\n');
        }
    }

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("                          End of Report\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("\nGenerated by Sitelint - single-origin SEO audit engine\n\n");

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Sitelint",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "run": {
                "id": data.run_id,
                "seed_url": data.seed_url,
                "status": data.status,
                "started_at": format_iso8601_timestamp(data.started_at),
                "finished_at": data.finished_at.map(format_iso8601_timestamp),
                "duration_seconds": data.finished_at.map(|end| end - data.started_at),
                "error_message": data.error_message
            },
            "summary": {
                "total_pages": data.total_pages,
                "total_issues": data.severity_counts.total(),
                "severity_breakdown": {
                    "critical": data.severity_counts.critical,
                    "high": data.severity_counts.high,
                    "medium": data.severity_counts.medium,
                    "low": data.severity_counts.low
                },
                "stats": data.stats
            },
            "issues": data.issues
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

// Helper functions
impl ReportData {
    fn status_display(&self) -> &str {
        match self.status.as_str() {
            "queued" => "Queued",
            "crawling" => "Crawling",
            "rendering" => "Rendering",
            "analyzing" => "Analyzing",
            "diffing" => "Diffing",
            "completed" => "Completed",
            "failed" => "Failed",
            _ => "Unknown",
        }
    }
}

fn format_issue_type(issue_type: &str) -> String {
    issue_type
        .replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_detail(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_iso8601_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.to_rfc3339()
}
