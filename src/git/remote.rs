//! PR driver trait + Octocrab-backed implementation (spec §4.2 "PR
//! creation/merge via remote driver"). Grounded on `github/pulls.rs`'s
//! create/get/merge calls and `http/client.rs`'s governor rate limiting
//! plus moka response cache, collapsed into one trait so the
//! Workflow/Git Integration layer can be driven against a mock in tests
//! (spec §9's direct-merge/PR-mode split).

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};

use crate::config::RateLimitConfig;
use crate::error::{GitErrorKind, WreckitError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrStatus {
    pub number: u64,
    pub state: String,
    pub merged: bool,
    pub mergeable: Option<bool>,
    pub head_sha: String,
}

/// Remote PR driver (spec §4.5.5 "the engine either opens a PR ... or
/// performs a direct merge"). This trait covers the PR-mode half; direct
/// merges stay local via `GitOperations::direct_merge`.
#[async_trait]
pub trait PrDriver: Send + Sync {
    async fn create_pr(
        &self,
        title: &str,
        head_branch: &str,
        base_branch: &str,
        body: &str,
    ) -> Result<PrStatus, WreckitError>;

    async fn get_pr_status(&self, pr_number: u64) -> Result<PrStatus, WreckitError>;

    async fn merge_pr(&self, pr_number: u64) -> Result<(), WreckitError>;
}

/// Octocrab-backed driver with GitHub-appropriate rate limiting and a
/// short-lived response cache, modeled on `http/client.rs`'s
/// `RateLimitedHttpClient`.
pub struct OctocrabPrDriver {
    octocrab: Octocrab,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    cache: Cache<String, PrStatus>,
    owner: String,
    repo: String,
}

impl OctocrabPrDriver {
    pub fn new(
        token: String,
        owner: String,
        repo: String,
        rate_limit: &RateLimitConfig,
    ) -> Result<Self, WreckitError> {
        let per_second = (rate_limit.requests_per_hour / 3600).max(1);
        let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(rate_limit.burst_capacity).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let octocrab = Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| WreckitError::GitError {
                kind: GitErrorKind::RemoteRefused,
                message: format!("failed to build GitHub client: {e}"),
            })?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(60))
            .build();

        Ok(Self {
            octocrab,
            rate_limiter,
            cache,
            owner,
            repo,
        })
    }

    async fn throttle(&self) {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;
    }
}

#[async_trait]
impl PrDriver for OctocrabPrDriver {
    async fn create_pr(
        &self,
        title: &str,
        head_branch: &str,
        base_branch: &str,
        body: &str,
    ) -> Result<PrStatus, WreckitError> {
        self.throttle().await;
        let pr = self
            .octocrab
            .pulls(&self.owner, &self.repo)
            .create(title, head_branch, base_branch)
            .body(body)
            .send()
            .await
            .map_err(|e| WreckitError::GitError {
                kind: GitErrorKind::RemoteRefused,
                message: format!("failed to create PR: {e}"),
            })?;

        let status = PrStatus {
            number: pr.number,
            state: format!("{:?}", pr.state).to_lowercase(),
            merged: pr.merged_at.is_some(),
            mergeable: pr.mergeable,
            head_sha: pr.head.sha.clone(),
        };
        self.cache.insert(status.number.to_string(), status.clone()).await;
        Ok(status)
    }

    async fn get_pr_status(&self, pr_number: u64) -> Result<PrStatus, WreckitError> {
        if let Some(cached) = self.cache.get(&pr_number.to_string()).await {
            return Ok(cached);
        }

        self.throttle().await;
        let pr = self
            .octocrab
            .pulls(&self.owner, &self.repo)
            .get(pr_number)
            .await
            .map_err(|e| WreckitError::GitError {
                kind: GitErrorKind::RemoteRefused,
                message: format!("failed to fetch PR #{pr_number}: {e}"),
            })?;

        let status = PrStatus {
            number: pr.number,
            state: format!("{:?}", pr.state).to_lowercase(),
            merged: pr.merged_at.is_some(),
            mergeable: pr.mergeable,
            head_sha: pr.head.sha.clone(),
        };
        self.cache.insert(pr_number.to_string(), status.clone()).await;
        Ok(status)
    }

    async fn merge_pr(&self, pr_number: u64) -> Result<(), WreckitError> {
        self.throttle().await;
        let result = self
            .octocrab
            .pulls(&self.owner, &self.repo)
            .merge(pr_number)
            .send()
            .await
            .map_err(|e| WreckitError::GitError {
                kind: GitErrorKind::RemoteRefused,
                message: format!("failed to merge PR #{pr_number}: {e}"),
            })?;

        if !result.merged {
            return Err(WreckitError::GitError {
                kind: GitErrorKind::RemoteRefused,
                message: result
                    .message
                    .unwrap_or_else(|| "merge was not performed".to_string()),
            });
        }
        self.cache.invalidate(&pr_number.to_string()).await;
        Ok(())
    }
}
