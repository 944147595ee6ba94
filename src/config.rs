//! Configuration loading (spec §6 "Environment", SPEC_FULL §10.3).
//!
//! Precedence, lowest to highest: built-in defaults, `.wreckit/config.json`,
//! `.wreckit/config.local.json`, process environment (`WRECKIT_` prefix),
//! then the special-cased GitHub token / agent-variant env passthrough.

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::agent::AgentConfig as RuntimeAgentConfig;
use crate::git::checks::PrChecksConfig;

/// Env var prefixes that are passed through verbatim to whichever agent
/// variant needs them (spec §6 "Environment").
pub const PASSTHROUGH_PREFIXES: &[&str] = &[
    "ANTHROPIC_",
    "CLAUDE_CODE_",
    "OPENAI_",
    "GOOGLE_",
    "ZAI_",
    "SPRITES_",
    "GITHUB_",
    "API_TIMEOUT",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WreckitConfig {
    pub github: GitHubConfig,
    pub observability: ObservabilityConfig,
    pub orchestrator: OrchestratorConfig,
    pub agent: AgentDefaults,
    pub sandbox: SandboxConfig,
    pub pr_checks: PrChecksConfig,
    pub doctor: DoctorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub owner: String,
    pub repo: String,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub requests_per_hour: u32,
    pub burst_capacity: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    pub tracing_enabled: bool,
    pub otlp_endpoint: Option<String>,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Number of worker tasks (spec §4.6.2). Default 1 = sequential.
    pub parallel: usize,
    pub auto_repair: AutoRepairMode,
    pub max_retries: u32,
    pub poll_backoff_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoRepairMode {
    True,
    False,
    SafeOnly,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentDefaults {
    pub default_kind: String,
    pub timeout_seconds: u64,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    pub max_iterations: u32,
    pub max_duration_seconds: u64,
    pub max_progress_steps: u32,
    pub max_budget_dollars: Option<f64>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_duration_seconds: 3600,
            max_progress_steps: 1000,
            max_budget_dollars: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SandboxConfig {
    pub cli_path: String,
    pub default_memory_mb: u64,
    pub default_cpus: u32,
    pub vm_op_timeout_seconds: u64,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DoctorConfig {
    pub orphaned_vm_age_minutes: u64,
}

impl Default for WreckitConfig {
    fn default() -> Self {
        Self {
            github: GitHubConfig {
                token: None,
                owner: String::new(),
                repo: String::new(),
                rate_limit: RateLimitConfig {
                    requests_per_hour: 5000,
                    burst_capacity: 100,
                },
            },
            observability: ObservabilityConfig {
                tracing_enabled: true,
                otlp_endpoint: None,
                log_level: "info".to_string(),
            },
            orchestrator: OrchestratorConfig {
                parallel: 1,
                auto_repair: AutoRepairMode::SafeOnly,
                max_retries: 2,
                poll_backoff_ms: 250,
            },
            agent: AgentDefaults {
                default_kind: "process".to_string(),
                timeout_seconds: 1800,
                limits: LimitsConfig::default(),
            },
            sandbox: SandboxConfig {
                cli_path: "sprite".to_string(),
                default_memory_mb: 2048,
                default_cpus: 2,
                vm_op_timeout_seconds: 300,
                exclude_patterns: vec![
                    ".git".into(),
                    "target".into(),
                    "node_modules".into(),
                    "*.log".into(),
                ],
            },
            pr_checks: PrChecksConfig::default(),
            doctor: DoctorConfig {
                orphaned_vm_age_minutes: 60,
            },
        }
    }
}

impl WreckitConfig {
    /// Load configuration from defaults, repo files, and environment, in
    /// that order of increasing precedence.
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new(".wreckit/config.json").exists() {
            builder = builder.add_source(File::with_name(".wreckit/config").required(false));
        }
        if Path::new(".wreckit/config.local.json").exists() {
            builder =
                builder.add_source(File::with_name(".wreckit/config.local").required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("WRECKIT")
                .separator("__")
                .try_parsing(true),
        );

        let built = builder.build()?;
        let mut cfg: WreckitConfig = built
            .try_deserialize()
            .unwrap_or_else(|_| WreckitConfig::default());

        if cfg.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                cfg.github.token = Some(token);
            } else if let Ok(token) = std::env::var("WRECKIT_GITHUB_TOKEN") {
                cfg.github.token = Some(token);
            }
        }

        Ok(cfg)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Environment variables that should be forwarded into an agent
    /// subprocess/SDK call, filtered to the passthrough prefixes.
    pub fn passthrough_env(&self) -> Vec<(String, String)> {
        std::env::vars()
            .filter(|(key, _)| PASSTHROUGH_PREFIXES.iter().any(|p| key.starts_with(p)))
            .collect()
    }

    pub fn default_agent_config(&self) -> RuntimeAgentConfig {
        RuntimeAgentConfig::default_for_kind(&self.agent.default_kind)
    }
}

/// Global configuration instance, mirroring the existing `CONFIG` static.
static CONFIG: std::sync::LazyLock<Result<WreckitConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = WreckitConfig::load_env_file();
        WreckitConfig::load()
    });

pub fn config() -> Result<&'static WreckitConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = WreckitConfig::default();
        assert_eq!(cfg.orchestrator.parallel, 1);
        assert_eq!(cfg.agent.limits.max_iterations, 100);
        assert_eq!(cfg.agent.limits.max_duration_seconds, 3600);
        assert_eq!(cfg.agent.limits.max_progress_steps, 1000);
    }

    #[test]
    fn passthrough_prefixes_cover_spec_list() {
        for expected in [
            "ANTHROPIC_",
            "CLAUDE_CODE_",
            "OPENAI_",
            "GOOGLE_",
            "ZAI_",
            "SPRITES_",
            "GITHUB_",
            "API_TIMEOUT",
        ] {
            assert!(PASSTHROUGH_PREFIXES.contains(&expected));
        }
    }
}
