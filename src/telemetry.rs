//! Tracing/logging init (SPEC_FULL §10.1). A `fmt` layer (JSON when not
//! attached to an interactive terminal, compact otherwise) plus an
//! `EnvFilter` seeded from `RUST_LOG`/`WRECKIT_LOG`, defaulting to `info`.

use anyhow::Result;
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

fn env_filter() -> EnvFilter {
    if let Ok(directive) = std::env::var("WRECKIT_LOG") {
        return EnvFilter::new(directive);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber. Safe to call once per process;
/// a second call is a no-op error the caller should log and ignore.
pub fn init_telemetry() -> Result<()> {
    let json_output = !std::io::stdout().is_terminal();

    let registry = tracing_subscriber::registry().with(env_filter());

    if json_output {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("telemetry already initialized: {e}"))?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()
            .map_err(|e| anyhow::anyhow!("telemetry already initialized: {e}"))?;
    }

    tracing::info!("wreckit telemetry initialized");
    Ok(())
}

/// A fresh correlation id, threaded through one orchestrator scheduling
/// pass or one standalone phase invocation.
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// A span carrying the fields every phase/scheduling/doctor event attaches
/// (spec data model: `item_id`, `phase`, `session_id`, `correlation_id`).
pub fn create_phase_span(
    phase: &str,
    item_id: Option<&str>,
    session_id: Option<&str>,
    correlation_id: Option<&str>,
) -> tracing::Span {
    tracing::info_span!(
        "phase_execution",
        phase = phase,
        item.id = item_id,
        session.id = session_id,
        correlation.id = correlation_id,
        otel.kind = "internal"
    )
}

pub fn shutdown_telemetry() {
    tracing::info!("wreckit telemetry shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_ids_are_unique() {
        assert_ne!(generate_correlation_id(), generate_correlation_id());
    }
}
