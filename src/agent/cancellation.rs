//! Process-global cancellation registry (spec §4.3.4, §9 "Cancellation
//! registry"). Every agent turn (and every sandbox VM it owns) registers a
//! handle here before producing side effects, and unregisters via a
//! scoped-release guard even on panic. Grounded on the
//! `ShutdownCoordinator` (`src/shutdown.rs`), generalized from a stub into a
//! real mutex-guarded set, and on `process_manager.rs`'s `kill_on_drop`
//! discipline for "release on drop, not just on the happy path".

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct CancellationHandle {
    cancelled: AtomicBool,
}

impl CancellationHandle {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

pub struct Registry {
    handles: Mutex<HashMap<u64, Arc<CancellationHandle>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn global() -> &'static Registry {
        static REGISTRY: OnceLock<Registry> = OnceLock::new();
        REGISTRY.get_or_init(Registry::new)
    }

    /// Register a new in-flight turn, returning a guard that unregisters on
    /// drop — including on panic unwind, which is the point of the pattern.
    pub fn register(&self) -> RegistrationGuard<'_> {
        let handle = Arc::new(CancellationHandle::default());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handles
            .lock()
            .expect("cancellation registry mutex poisoned")
            .insert(id, handle.clone());
        RegistrationGuard {
            registry: self,
            id,
            handle,
        }
    }

    /// Walk every registered handle and mark it cancelled (SIGINT path).
    pub fn cancel_all(&self) {
        let handles = self
            .handles
            .lock()
            .expect("cancellation registry mutex poisoned");
        info!(count = handles.len(), "cancelling all in-flight agent turns");
        for handle in handles.values() {
            handle.cancel();
        }
    }

    pub fn active_count(&self) -> usize {
        self.handles
            .lock()
            .expect("cancellation registry mutex poisoned")
            .len()
    }

    fn unregister(&self, id: u64) {
        self.handles
            .lock()
            .expect("cancellation registry mutex poisoned")
            .remove(&id);
    }
}

pub struct RegistrationGuard<'a> {
    registry: &'a Registry,
    id: u64,
    handle: Arc<CancellationHandle>,
}

impl RegistrationGuard<'_> {
    pub fn handle(&self) -> Arc<CancellationHandle> {
        self.handle.clone()
    }
}

impl Drop for RegistrationGuard<'_> {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

/// Wait for SIGINT, cancel every registered handle, then wait up to
/// `grace_seconds` for graceful shutdown before the caller force-terminates
/// (spec §4.3.4, §5 "Cancellation").
pub async fn handle_sigint(grace_seconds: u64) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut stream = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to install SIGINT handler: {e}");
                return;
            }
        };
        stream.recv().await;
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    let registry = Registry::global();
    registry.cancel_all();

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(grace_seconds);
    while tokio::time::Instant::now() < deadline && registry.active_count() > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_drop_removes_handle() {
        let registry = Registry::new();
        {
            let _guard = registry.register();
            assert_eq!(registry.active_count(), 1);
        }
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn cancel_all_marks_every_handle() {
        let registry = Registry::new();
        let guard_a = registry.register();
        let guard_b = registry.register();
        registry.cancel_all();
        assert!(guard_a.handle().is_cancelled());
        assert!(guard_b.handle().is_cancelled());
    }
}
