pub mod analyzer;
pub mod config;
pub mod data;
pub mod diff;
pub mod model;
pub mod report;
pub mod run;

pub use config::AuditConfig;
pub use data::Database;
pub use model::{Issue, IssueType, RunStats, RunStatus, Severity};
pub use run::{AuditError, execute_audit};
