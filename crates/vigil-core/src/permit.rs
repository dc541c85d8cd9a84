//! Time-windowed access permissions.
//!
//! An assignment links an employee to an environment with optional
//! validity bounds. Authorization is the logical OR over all matching,
//! currently-valid assignments.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A standing authorization window. Bounds are kept as the raw text the
/// upstream store holds; absence (or empty text) means no bound on that
/// side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub employee: String,
    pub environment_id: String,
    #[serde(default)]
    pub enter_until: Option<String>,
    #[serde(default)]
    pub exit_until: Option<String>,
}

/// Evaluates assignments against a wall-clock instant.
#[derive(Debug, Clone, Default)]
pub struct PermissionEvaluator {
    assignments: Vec<Assignment>,
}

impl PermissionEvaluator {
    pub fn new(assignments: Vec<Assignment>) -> Self {
        Self { assignments }
    }

    /// Replace the assignment snapshot (pull-based refresh).
    pub fn replace(&mut self, assignments: Vec<Assignment>) {
        self.assignments = assignments;
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Whether `employee` holds a currently-valid assignment for the
    /// environment. First accepted record wins.
    pub fn is_authorized(&self, employee: &str, environment_id: &str, now: NaiveDateTime) -> bool {
        self.assignments
            .iter()
            .filter(|a| a.employee == employee && a.environment_id == environment_id)
            .any(|a| valid_at(a, now))
    }

    /// Number of assignments currently valid for the environment,
    /// regardless of employee. Compared against the observed person
    /// count for overcrowding.
    pub fn count_authorized(&self, environment_id: &str, now: NaiveDateTime) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.environment_id == environment_id && valid_at(a, now))
            .count()
    }
}

fn valid_at(a: &Assignment, now: NaiveDateTime) -> bool {
    if let Some(start) = parse_bound(a.enter_until.as_deref()) {
        if now < start {
            return false;
        }
    }
    if let Some(end) = parse_bound(a.exit_until.as_deref()) {
        if now > end {
            return false;
        }
    }
    true
}

/// Parse one validity bound.
///
/// A bound that fails to parse is treated as absent, i.e. the record
/// stays valid on that side. Fail-open is inherited from the upstream
/// data model and intentional; see DESIGN.md before tightening.
fn parse_bound(raw: Option<&str>) -> Option<NaiveDateTime> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0).unwrap_or_default());
    }
    tracing::warn!(bound = text, "unparsable assignment bound; treating as unbounded");
    None
}

/// Load an assignment list from JSON, skipping malformed records. A
/// corrupt record never blocks loading the rest.
pub fn load_assignments(json: &str) -> Vec<Assignment> {
    let records: Vec<serde_json::Value> = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(error = %err, "assignment list unparsable; loading none");
            return Vec::new();
        }
    };
    let mut out = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        match serde_json::from_value(record) {
            Ok(a) => out.push(a),
            Err(err) => tracing::warn!(index = i, error = %err, "skipping malformed assignment"),
        }
    }
    out
}
