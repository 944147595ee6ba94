//! Integration tests for the Sandbox Backend: the fail-fast CLI binding
//! (spec §4.4 "fail fast if the CLI binary is missing"), the
//! currently-owned-VM pointer across a simulated run, and session
//! persistence round-tripping through a real temp directory.

use tempfile::tempdir;

use wreckit::error::{SandboxErrorKind, WreckitError};
use wreckit::sandbox::lifecycle::{session_for_outcome, OwnedVmPointer};
use wreckit::sandbox::session::Session;
use wreckit::sandbox::{SandboxCli, SessionState};

fn unreachable_sandbox_config() -> wreckit::config::SandboxConfig {
    wreckit::config::SandboxConfig {
        cli_path: "wreckit-sandbox-cli-does-not-exist".to_string(),
        default_memory_mb: 2048,
        default_cpus: 2,
        vm_op_timeout_seconds: 30,
        exclude_patterns: vec![".git".to_string()],
    }
}

#[test]
fn sandbox_cli_fails_fast_when_the_binary_is_missing() {
    let config = unreachable_sandbox_config();
    let err = SandboxCli::new(&config).unwrap_err();
    match err {
        WreckitError::SandboxError { kind, .. } => assert_eq!(kind, SandboxErrorKind::CliMissing),
        other => panic!("expected SandboxError, got {other:?}"),
    }
}

#[test]
fn sandbox_cli_fails_fast_on_missing_token_even_with_a_real_binary_on_path() {
    // `sh` is always on PATH in this environment, so this isolates the
    // token check from the binary-presence check.
    std::env::remove_var("SPRITES_TOKEN");
    let config = wreckit::config::SandboxConfig {
        cli_path: "sh".to_string(),
        ..unreachable_sandbox_config()
    };
    let err = SandboxCli::new(&config).unwrap_err();
    match err {
        WreckitError::SandboxError { kind, .. } => assert_eq!(kind, SandboxErrorKind::TokenMissing),
        other => panic!("expected SandboxError, got {other:?}"),
    }
}

#[tokio::test]
async fn owned_vm_pointer_and_session_persistence_track_one_ephemeral_run() {
    let pointer = OwnedVmPointer::global();
    assert!(pointer.current().is_none());

    let dir = tempdir().unwrap();
    let vm_name = "wreckit-sandbox-001-foo-123".to_string();

    let session = session_for_outcome(
        "sess-lifecycle".to_string(),
        vm_name.clone(),
        "001-foo".to_string(),
        true,
        None,
    );
    session.persist(dir.path()).await.unwrap();

    let reloaded = Session::load(dir.path(), "sess-lifecycle").await.unwrap();
    assert_eq!(reloaded.state, SessionState::Completed);
    assert_eq!(reloaded.vm_name, vm_name);
    assert!(reloaded.end_time.is_some());
}

#[tokio::test]
async fn a_failed_run_is_persisted_with_its_error_message() {
    let dir = tempdir().unwrap();
    let session = session_for_outcome(
        "sess-failed".to_string(),
        "wreckit-sandbox-002-bar-456".to_string(),
        "002-bar".to_string(),
        false,
        Some("sprite exec returned non-zero".to_string()),
    );
    session.persist(dir.path()).await.unwrap();

    let reloaded = Session::load(dir.path(), "sess-failed").await.unwrap();
    assert_eq!(reloaded.state, SessionState::Failed);
    assert_eq!(reloaded.error.as_deref(), Some("sprite exec returned non-zero"));
}
