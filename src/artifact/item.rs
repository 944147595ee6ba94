//! The `Item` type (spec §3 "Item").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::state::ItemState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub section: String,
    pub state: ItemState,
    pub overview: String,

    #[serde(default)]
    pub problem_statement: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default)]
    pub technical_constraints: Vec<String>,
    #[serde(default)]
    pub scope_in: Vec<String>,
    #[serde(default)]
    pub scope_out: Vec<String>,
    #[serde(default)]
    pub priority_hint: Option<u8>,
    #[serde(default)]
    pub urgency_hint: Option<u8>,

    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub pr_url: Option<String>,
    #[serde(default)]
    pub pr_number: Option<u64>,
    #[serde(default)]
    pub rollback_sha: Option<String>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub checks_passed: Option<bool>,

    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub campaign: Option<String>,

    #[serde(default)]
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(id: impl Into<String>, title: impl Into<String>, section: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            section: section.into(),
            state: ItemState::Raw,
            overview: String::new(),
            problem_statement: None,
            motivation: None,
            success_criteria: Vec::new(),
            technical_constraints: Vec::new(),
            scope_in: Vec::new(),
            scope_out: Vec::new(),
            priority_hint: None,
            urgency_hint: None,
            branch: None,
            pr_url: None,
            pr_number: None,
            rollback_sha: None,
            merge_commit_sha: None,
            completed_at: None,
            merged_at: None,
            checks_passed: None,
            depends_on: Vec::new(),
            campaign: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Numeric prefix of the id, e.g. `36` for `036-create-wreckit-summarize`
    /// (spec §4.1 "ID resolution").
    pub fn numeric_prefix(&self) -> Option<u32> {
        self.id
            .split('-')
            .next()
            .and_then(|s| s.parse::<u32>().ok())
    }
}
