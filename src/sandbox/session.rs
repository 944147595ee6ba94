//! Sandbox session records (spec §3 "Session (sandbox)"). Grounded on
//! `autonomous/persistence.rs`'s write-temp-then-rename discipline,
//! scaled down to the sandbox's smaller per-run record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::WreckitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Running,
    Paused,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub vm_name: String,
    pub item_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub state: SessionState,
    pub checkpoint: Option<String>,
    pub error: Option<String>,
}

impl Session {
    pub fn start(session_id: String, vm_name: String, item_id: String) -> Self {
        Self {
            session_id,
            vm_name,
            item_id,
            start_time: Utc::now(),
            end_time: None,
            state: SessionState::Running,
            checkpoint: None,
            error: None,
        }
    }

    pub fn complete(&mut self) {
        self.state = SessionState::Completed;
        self.end_time = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = SessionState::Failed;
        self.end_time = Some(Utc::now());
        self.error = Some(error.into());
    }

    fn path(sessions_dir: &Path, session_id: &str) -> PathBuf {
        sessions_dir.join(format!("{session_id}.json"))
    }

    pub async fn persist(&self, sessions_dir: &Path) -> Result<(), WreckitError> {
        fs::create_dir_all(sessions_dir).await?;
        let path = Self::path(sessions_dir, &self.session_id);
        let tmp = path.with_extension("json.tmp");
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, serialized).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub async fn load(sessions_dir: &Path, session_id: &str) -> Result<Self, WreckitError> {
        let path = Self::path(sessions_dir, session_id);
        let data = fs::read(&path).await?;
        Ok(serde_json::from_slice(&data)?)
    }
}
