//! In-memory registry of running jobs.
//!
//! Maps job id to the cancellation handle of its runner. A plain mutex is
//! enough: every operation is a constant-time map mutation and the lock is
//! never held across an await point.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct RunnerRegistry {
    running: Mutex<HashMap<i64, CancellationToken>>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: i64, token: CancellationToken) {
        self.lock().insert(job_id, token);
    }

    pub fn unregister(&self, job_id: i64) {
        self.lock().remove(&job_id);
    }

    /// Cancel and deregister the runner for `job_id`.
    ///
    /// Returns whether a handle was present; a queued job not yet picked
    /// up by the poll loop has none, and that is fine.
    pub fn cancel(&self, job_id: i64) -> bool {
        match self.lock().remove(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Signal every active runner. Entries are left in place; runners
    /// deregister themselves as they wind down.
    pub fn cancel_all(&self) {
        for token in self.lock().values() {
            token.cancel();
        }
    }

    pub fn is_active(&self, job_id: i64) -> bool {
        self.lock().contains_key(&job_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, CancellationToken>> {
        self.running.lock().expect("runner registry lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_cancel() {
        let registry = RunnerRegistry::new();
        let token = CancellationToken::new();

        registry.register(7, token.clone());
        assert!(registry.is_active(7));

        assert!(registry.cancel(7));
        assert!(token.is_cancelled());
        assert!(!registry.is_active(7));
    }

    #[test]
    fn test_cancel_without_handle() {
        let registry = RunnerRegistry::new();
        assert!(!registry.cancel(42));
    }

    #[test]
    fn test_unregister_keeps_token_untouched() {
        let registry = RunnerRegistry::new();
        let token = CancellationToken::new();

        registry.register(1, token.clone());
        registry.unregister(1);

        assert!(!token.is_cancelled());
        assert!(!registry.is_active(1));
    }

    #[test]
    fn test_cancel_all_signals_every_runner() {
        let registry = RunnerRegistry::new();
        let first = CancellationToken::new();
        let second = CancellationToken::new();

        registry.register(1, first.clone());
        registry.register(2, second.clone());
        registry.cancel_all();

        assert!(first.is_cancelled());
        assert!(second.is_cancelled());
    }

    #[test]
    fn test_register_replaces_previous_handle() {
        // The poll loop is serial, so two live handles for one job never
        // coexist; a stale re-register must still leave one entry.
        let registry = RunnerRegistry::new();
        let stale = CancellationToken::new();
        let fresh = CancellationToken::new();

        registry.register(1, stale);
        registry.register(1, fresh.clone());

        assert!(registry.cancel(1));
        assert!(fresh.is_cancelled());
        assert!(!registry.is_active(1));
    }
}
