//! Registry of calls waiting for a worker reply.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

use crate::utils::{CompressorError, CompressorResult};
use crate::worker::TranscodeReply;

type Listener = oneshot::Sender<CompressorResult<TranscodeReply>>;

#[derive(Debug, Default)]
struct Registry {
    listeners: HashMap<String, Listener>,
    /// Set once the owning worker is gone; later registrations are rejected with it.
    closed: Option<CompressorError>,
}

/// One-shot listeners keyed by correlation id.
///
/// A listener fires at most once: resolving, failing or deregistering removes it,
/// so a late reply for an abandoned call finds nothing and is dropped.
#[derive(Debug, Clone, Default)]
pub struct PendingCalls {
    inner: Arc<Mutex<Registry>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for `id` and returns the receiving end.
    ///
    /// After [`fail_all`](Self::fail_all) the receiver resolves immediately with that error.
    pub async fn register(&self, id: &str) -> oneshot::Receiver<CompressorResult<TranscodeReply>> {
        let (tx, rx) = oneshot::channel();
        let mut registry = self.inner.lock().await;
        match &registry.closed {
            Some(error) => {
                let _ = tx.send(Err(error.clone()));
            }
            None => {
                registry.listeners.insert(id.to_string(), tx);
            }
        }
        rx
    }

    /// Removes the listener for `id`. Returns whether one was registered.
    pub async fn deregister(&self, id: &str) -> bool {
        self.inner.lock().await.listeners.remove(id).is_some()
    }

    /// Delivers `reply` to the listener registered under its id.
    ///
    /// Returns `false` when no call is waiting for it.
    pub async fn resolve(&self, reply: TranscodeReply) -> bool {
        let Some(id) = reply.id.as_deref() else {
            return false;
        };

        let listener = self.inner.lock().await.listeners.remove(id);
        match listener {
            // The receiver may have given up between removal and send
            Some(tx) => tx.send(Ok(reply)).is_ok(),
            None => false,
        }
    }

    /// Rejects every waiting call with `error` and closes the registry to new calls.
    /// Returns how many were rejected.
    pub async fn fail_all(&self, error: CompressorError) -> usize {
        let drained: Vec<_> = {
            let mut registry = self.inner.lock().await;
            if registry.closed.is_none() {
                registry.closed = Some(error.clone());
            }
            registry.listeners.drain().collect()
        };
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(error.clone()));
        }
        count
    }

    /// Whether the registry has been closed by [`fail_all`](Self::fail_all).
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed.is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.listeners.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_only_the_matching_call() {
        let pending = PendingCalls::new();
        let a = pending.register("a").await;
        let mut b = pending.register("b").await;

        assert!(pending.resolve(TranscodeReply::failure(Some("a".into()), "nope")).await);

        let reply = a.await.unwrap().unwrap();
        assert_eq!(reply.id.as_deref(), Some("a"));
        assert!(b.try_recv().is_err());
        assert_eq!(pending.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_and_uncorrelated_replies_are_dropped() {
        let pending = PendingCalls::new();
        let _a = pending.register("a").await;

        assert!(!pending.resolve(TranscodeReply::failure(Some("zzz".into()), "x")).await);
        assert!(!pending.resolve(TranscodeReply::failure(None, "diagnostic")).await);
        assert_eq!(pending.len().await, 1);
    }

    #[tokio::test]
    async fn deregistered_calls_ignore_late_replies() {
        let pending = PendingCalls::new();
        let _rx = pending.register("late").await;

        assert!(pending.deregister("late").await);
        assert!(!pending.deregister("late").await);
        assert!(!pending.resolve(TranscodeReply::failure(Some("late".into()), "x")).await);
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn fail_all_rejects_everyone() {
        let pending = PendingCalls::new();
        let a = pending.register("a").await;
        let b = pending.register("b").await;

        assert_eq!(pending.fail_all(CompressorError::crashed("gone")).await, 2);
        assert_eq!(a.await.unwrap(), Err(CompressorError::crashed("gone")));
        assert_eq!(b.await.unwrap(), Err(CompressorError::crashed("gone")));
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn closed_registry_rejects_late_registrations() {
        let pending = PendingCalls::new();
        assert!(!pending.is_closed().await);
        pending.fail_all(CompressorError::crashed("worker was disposed")).await;

        let late = pending.register("late").await;
        assert_eq!(late.await.unwrap(), Err(CompressorError::crashed("worker was disposed")));
        assert!(pending.is_closed().await);
        assert!(pending.is_empty().await);
    }
}
