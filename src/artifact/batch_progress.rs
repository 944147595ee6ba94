//! `BatchProgress` (spec §3 "BatchProgress", §4.6.3 "Session lifecycle"):
//! a session-scoped record of one Orchestrator run, enabling crash
//! detection and resume.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgress {
    pub session_id: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub parallel: usize,
    pub queued_items: Vec<String>,
    pub current_item: Option<String>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    /// Per-item healing attempt counters (spec §4.6.4, SPEC_FULL §11).
    #[serde(default)]
    pub healing_attempts: HashMap<String, u32>,
}

impl BatchProgress {
    pub fn start(session_id: impl Into<String>, parallel: usize, queued_items: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            pid: std::process::id(),
            started_at: now,
            updated_at: now,
            parallel,
            queued_items,
            current_item: None,
            completed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            healing_attempts: HashMap::new(),
        }
    }

    pub fn mark_completed(&mut self, item_id: &str) {
        self.completed.push(item_id.to_string());
        if self.current_item.as_deref() == Some(item_id) {
            self.current_item = None;
        }
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, item_id: &str) {
        self.failed.push(item_id.to_string());
        if self.current_item.as_deref() == Some(item_id) {
            self.current_item = None;
        }
        self.updated_at = Utc::now();
    }

    pub fn mark_skipped(&mut self, item_id: &str) {
        self.skipped.push(item_id.to_string());
        self.updated_at = Utc::now();
    }

    pub fn record_healing_attempt(&mut self, item_id: &str) -> u32 {
        let count = self.healing_attempts.entry(item_id.to_string()).or_insert(0);
        *count += 1;
        self.updated_at = Utc::now();
        *count
    }

    pub fn healing_attempts_for(&self, item_id: &str) -> u32 {
        self.healing_attempts.get(item_id).copied().unwrap_or(0)
    }

    /// Whether the process that wrote this record is still alive, used on
    /// resume to detect stale sessions (spec §4.6.3).
    pub fn is_stale(&self) -> bool {
        !pid_is_alive(self.pid)
    }
}

#[cfg(unix)]
fn pid_is_alive(pid: u32) -> bool {
    // Signal 0 performs no action but still validates the pid's existence
    // and that we have permission to signal it.
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn pid_is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_completed_clears_current_item_and_appends() {
        let mut progress = BatchProgress::start("sess-1", 1, vec!["001-foo".into()]);
        progress.current_item = Some("001-foo".to_string());
        progress.mark_completed("001-foo");
        assert!(progress.current_item.is_none());
        assert_eq!(progress.completed, vec!["001-foo".to_string()]);
    }

    #[test]
    fn healing_attempts_increment_per_item() {
        let mut progress = BatchProgress::start("sess-1", 1, vec![]);
        assert_eq!(progress.record_healing_attempt("001-foo"), 1);
        assert_eq!(progress.record_healing_attempt("001-foo"), 2);
        assert_eq!(progress.healing_attempts_for("001-foo"), 2);
        assert_eq!(progress.healing_attempts_for("002-bar"), 0);
    }

    #[test]
    fn own_pid_is_considered_alive() {
        let progress = BatchProgress::start("sess-1", 1, vec![]);
        assert!(!progress.is_stale());
    }
}
