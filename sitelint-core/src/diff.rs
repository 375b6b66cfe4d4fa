use crate::data::Database;
use crate::model::Issue;
use std::collections::{HashMap, HashSet};

/// Counts produced by classifying one run's issues against the
/// previous completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    pub new_count: usize,
    pub persistent_count: usize,
    pub resolved_count: usize,
}

/// Build the baseline index from a prior run:
/// `(page_url, issue_type) -> first_seen_run_id`.
pub fn prior_issue_index(
    db: &Database,
    prior_run_id: &str,
) -> rusqlite::Result<HashMap<(String, String), Option<String>>> {
    let rows = db.issue_index(prior_run_id)?;
    Ok(rows
        .into_iter()
        .map(|(page_url, issue_type, first_seen)| ((page_url, issue_type), first_seen))
        .collect())
}

/// Classify the current run's issues in place. An issue whose
/// `(page_url, issue_type)` key existed in the prior run keeps its
/// original `first_seen_run_id`; anything else is new as of this run.
/// Prior keys with no current counterpart are counted as resolved.
/// Pure: identical inputs always produce identical classification.
pub fn diff_issues(
    current: &mut [Issue],
    prior: &HashMap<(String, String), Option<String>>,
    prior_run_id: Option<&str>,
    current_run_id: &str,
) -> DiffOutcome {
    let mut outcome = DiffOutcome::default();
    let mut current_keys: HashSet<(String, String)> = HashSet::new();

    for issue in current.iter_mut() {
        let key = (
            issue.page_url.clone(),
            issue.issue_type.as_str().to_string(),
        );

        match prior.get(&key) {
            Some(first_seen) => {
                issue.is_new = false;
                // Carry the original sighting forward; a prior run
                // that predates diff tracking falls back to its own
                // id.
                issue.first_seen_run_id = first_seen
                    .clone()
                    .or_else(|| prior_run_id.map(String::from));
                outcome.persistent_count += 1;
            }
            None => {
                issue.is_new = true;
                issue.first_seen_run_id = Some(current_run_id.to_string());
                outcome.new_count += 1;
            }
        }

        current_keys.insert(key);
    }

    outcome.resolved_count = prior
        .keys()
        .filter(|key| !current_keys.contains(*key))
        .count();

    outcome
}
