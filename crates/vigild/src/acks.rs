//! Acknowledged-warning store.
//!
//! A persisted set of violation identifiers the operator has already
//! handled, consulted before surfacing warnings so a dismissed
//! condition does not reappear verbatim. Every insertion is flushed
//! immediately; a dismissal must survive a restart.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use vigil_core::reconciler::Level;
use vigil_core::Violation;

use crate::sources::EventSink;

pub struct AckStore {
    path: PathBuf,
    set: BTreeSet<String>,
}

impl AckStore {
    /// Load the store from disk. A missing or corrupt file yields an
    /// empty set; startup is never blocked on this file.
    pub fn load(path: PathBuf) -> Self {
        let set = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<String>>(&text) {
                Ok(ids) => ids.into_iter().collect(),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err,
                        "acknowledgement store corrupt; starting empty");
                    BTreeSet::new()
                }
            },
            Err(_) => BTreeSet::new(),
        };
        Self { path, set }
    }

    pub fn is_acknowledged(&self, violation_id: &str) -> bool {
        self.set.contains(violation_id)
    }

    /// Mark a violation id as handled and flush to disk.
    pub fn acknowledge(&mut self, violation_id: &str) -> Result<()> {
        if self.set.insert(violation_id.to_string()) {
            self.flush()?;
        }
        Ok(())
    }

    /// Violations the operator has not yet handled.
    pub fn filter_unacknowledged<'a>(&self, violations: &'a [Violation]) -> Vec<&'a Violation> {
        violations
            .iter()
            .filter(|v| !self.is_acknowledged(&v.id()))
            .collect()
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        // BTreeSet keeps the persisted list sorted and diff-friendly.
        let ids: Vec<&String> = self.set.iter().collect();
        let text = serde_json::to_string_pretty(&ids)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

/// Event sink that writes unacknowledged violations to the operator
/// log and drops the ones already handled.
pub struct OperatorLog {
    acks: AckStore,
}

impl OperatorLog {
    pub fn new(acks: AckStore) -> Self {
        Self { acks }
    }
}

impl EventSink for OperatorLog {
    fn emit(&mut self, violations: &[Violation]) {
        for v in self.acks.filter_unacknowledged(violations) {
            match v.level() {
                Level::Warning => tracing::warn!(kind = %v.kind, "{}", v.message),
                Level::Info => tracing::info!(kind = %v.kind, "{}", v.message),
            }
        }
    }
}
