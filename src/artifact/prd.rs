//! The `Prd` (Product Requirements Document) type (spec §3 "PRD").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Pending,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStory {
    /// `US-###` or `US-{item}-{seq}` (spec §3 "PRD").
    pub id: String,
    pub title: String,
    pub acceptance_criteria: Vec<String>,
    /// `1..=4`.
    pub priority: u8,
    pub status: StoryStatus,
    #[serde(default)]
    pub notes: String,
    pub branch_name: String,
}

/// On-disk PRD JSON (spec §3 "PRD JSON": `{schema_version, id, branch_name,
/// user_stories[]}`). `id` and `branch_name` are optional on read so older
/// or hand-authored PRDs without them can still load; the Doctor's
/// `PRD_MISSING_ID`/`PRD_MISSING_BRANCH_NAME` fixes backfill them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prd {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub branch_name: Option<String>,
    pub item_id: String,
    pub user_stories: Vec<UserStory>,
}

fn default_schema_version() -> u32 {
    1
}

impl Prd {
    pub fn new(item_id: impl Into<String>) -> Self {
        let item_id = item_id.into();
        Self {
            schema_version: 1,
            id: Some(item_id.clone()),
            branch_name: Some(format!("wreckit/{item_id}")),
            item_id,
            user_stories: Vec::new(),
        }
    }

    pub fn has_stories(&self) -> bool {
        !self.user_stories.is_empty()
    }

    pub fn any_pending(&self) -> bool {
        self.user_stories
            .iter()
            .any(|s| s.status == StoryStatus::Pending)
    }

    /// Invariant for `state = done`: every story `status = done` (spec §3).
    pub fn all_done(&self) -> bool {
        self.has_stories()
            && self.user_stories.iter().all(|s| s.status == StoryStatus::Done)
    }

    pub fn to_validation_summary(&self) -> crate::workflow::state::PrdSummary {
        crate::workflow::state::PrdSummary {
            stories: self
                .user_stories
                .iter()
                .map(|s| crate::workflow::state::StorySummary {
                    id: s.id.clone(),
                    done: s.status == StoryStatus::Done,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(id: &str, status: StoryStatus) -> UserStory {
        UserStory {
            id: id.to_string(),
            title: "t".to_string(),
            acceptance_criteria: vec![],
            priority: 1,
            status,
            notes: String::new(),
            branch_name: "b".to_string(),
        }
    }

    #[test]
    fn all_done_is_false_when_empty() {
        let prd = Prd::new("001-foo");
        assert!(!prd.all_done());
    }

    #[test]
    fn all_done_requires_every_story_done() {
        let mut prd = Prd::new("001-foo");
        prd.user_stories.push(story("US-1", StoryStatus::Done));
        assert!(prd.all_done());
        prd.user_stories.push(story("US-2", StoryStatus::Pending));
        assert!(!prd.all_done());
        assert!(prd.any_pending());
    }

    #[test]
    fn validation_summary_mirrors_story_done_flags() {
        let mut prd = Prd::new("001-foo");
        prd.user_stories.push(story("US-1", StoryStatus::Done));
        prd.user_stories.push(story("US-2", StoryStatus::Pending));
        let summary = prd.to_validation_summary();
        assert!(summary.has_stories());
        assert!(summary.any_pending());
        assert!(!summary.all_done());
    }
}
