//! Doctor (spec §4.7): diagnose inconsistencies in the Artifact Store and
//! sandbox state, then repair the fixable ones under a backup manifest.

pub mod backup;
pub mod diagnostics;
pub mod fixes;

pub use backup::{BackupEntry, BackupManifest, BackupSession};
pub use diagnostics::{run_diagnostics, run_sandbox_diagnostics, Diagnostic, DiagnosticCode, DiagnosticReport, Severity};
pub use fixes::{apply_fixes, FixOutcome};
