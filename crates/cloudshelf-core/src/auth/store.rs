use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::backend::{MemoryBackend, TokenBackend};
use super::session::{SessionEvent, SessionState};

/// Buffer size for the session event channel.
/// Events are rare (login/logout); a slow subscriber only misses old ones.
const EVENT_CHANNEL_SIZE: usize = 16;

/// In-memory tier of the credential cache.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// Durable tier not consulted yet.
    Unknown,
    /// Known to hold no credential (cleared, or durable tier was empty).
    Absent,
    Present(String),
}

/// Single source of truth for the bearer credential.
///
/// Two tiers: an in-memory slot that is authoritative for the life of the
/// process, and a durable `TokenBackend` consulted lazily on first read.
/// Durable failures are logged and swallowed; the store then behaves as
/// memory-only.
///
/// Construct one per process and share it behind an `Arc`.
pub struct CredentialStore {
    slot: RwLock<Slot>,
    backend: Box<dyn TokenBackend>,
    events: broadcast::Sender<SessionEvent>,
}

impl CredentialStore {
    pub fn new(backend: impl TokenBackend + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            slot: RwLock::new(Slot::Unknown),
            backend: Box::new(backend),
            events,
        }
    }

    /// Store with a process-local durable tier.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Replace the current credential.
    ///
    /// The slot lock is held through the durable write, so readers block
    /// until the backend returns. Backends are small local stores (a file,
    /// the OS keyring); do not plug in one that can stall.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let mut slot = self.write_slot();
        *slot = Slot::Present(token.clone());
        // Concurrent writers reach both tiers in the same order.
        if let Err(e) = self.backend.save(&token) {
            warn!(error = %e, "Failed to persist token, keeping it in memory only");
        }
        debug!("Token stored");
    }

    /// Current credential, warming the in-memory tier from the durable one if
    /// this is the first read.
    pub fn get_token(&self) -> Option<String> {
        {
            let slot = self.read_slot();
            match &*slot {
                Slot::Present(token) => return Some(token.clone()),
                Slot::Absent => return None,
                Slot::Unknown => {}
            }
        }

        let mut slot = self.write_slot();
        // Another caller may have warmed or written the slot in between.
        if *slot == Slot::Unknown {
            *slot = match self.backend.load() {
                Ok(Some(token)) => {
                    debug!("Token loaded from durable store");
                    Slot::Present(token)
                }
                Ok(None) => Slot::Absent,
                Err(e) => {
                    warn!(error = %e, "Failed to read durable token store");
                    Slot::Absent
                }
            };
        }
        match &*slot {
            Slot::Present(token) => Some(token.clone()),
            _ => None,
        }
    }

    /// Forget the credential in both tiers. Clearing an absent token is a no-op.
    pub fn clear_token(&self) {
        let mut slot = self.write_slot();
        *slot = Slot::Absent;
        if let Err(e) = self.backend.delete() {
            warn!(error = %e, "Failed to remove token from durable store");
        }
        debug!("Token cleared");
    }

    /// Clear both tiers only if the current credential is `token`.
    ///
    /// Compare and clear happen under one write guard, so a credential stored
    /// concurrently by another caller is never wiped. Returns whether the
    /// store was cleared.
    pub fn clear_if(&self, token: &str) -> bool {
        let mut slot = self.write_slot();
        match &*slot {
            Slot::Present(current) if current == token => {}
            _ => return false,
        }
        *slot = Slot::Absent;
        if let Err(e) = self.backend.delete() {
            warn!(error = %e, "Failed to remove token from durable store");
        }
        debug!("Token cleared");
        true
    }

    pub fn state(&self) -> SessionState {
        if self.get_token().is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// Receive session transitions from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Broadcast a session transition. Having no subscribers is fine.
    pub fn notify(&self, event: SessionEvent) {
        debug!(?event, "Session event");
        let _ = self.events.send(event);
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.read_slot() {
            Slot::Unknown => "unknown",
            Slot::Absent => "absent",
            Slot::Present(_) => "present",
        };
        f.debug_struct("CredentialStore").field("token", &state).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::FileBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Side-store that fails every operation, like disabled browser storage.
    struct BrokenBackend;

    impl TokenBackend for BrokenBackend {
        fn load(&self) -> anyhow::Result<Option<String>> {
            Err(anyhow::anyhow!("storage disabled"))
        }
        fn save(&self, _token: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("quota exceeded"))
        }
        fn delete(&self) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("storage disabled"))
        }
    }

    #[derive(Default)]
    struct CountingBackend {
        inner: MemoryBackend,
        loads: AtomicUsize,
    }

    impl TokenBackend for CountingBackend {
        fn load(&self) -> anyhow::Result<Option<String>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load()
        }
        fn save(&self, token: &str) -> anyhow::Result<()> {
            self.inner.save(token)
        }
        fn delete(&self) -> anyhow::Result<()> {
            self.inner.delete()
        }
    }

    #[test]
    fn test_get_after_set_returns_token() {
        let store = CredentialStore::in_memory();
        store.set_token("x");
        assert_eq!(store.get_token().as_deref(), Some("x"));
        store.set_token("y");
        assert_eq!(store.get_token().as_deref(), Some("y"));
    }

    #[test]
    fn test_token_survives_reload() {
        let backend = Arc::new(MemoryBackend::new());
        CredentialStore::new(Arc::clone(&backend)).set_token("x");

        let reloaded = CredentialStore::new(Arc::clone(&backend));
        assert_eq!(reloaded.get_token().as_deref(), Some("x"));
    }

    #[test]
    fn test_token_survives_reload_from_file() {
        let dir = tempfile::tempdir().unwrap();
        CredentialStore::new(FileBackend::new(dir.path().to_path_buf())).set_token("x");

        let reloaded = CredentialStore::new(FileBackend::new(dir.path().to_path_buf()));
        assert_eq!(reloaded.get_token().as_deref(), Some("x"));
        assert_eq!(reloaded.state(), SessionState::Authenticated);
    }

    #[test]
    fn test_fresh_store_is_absent() {
        let store = CredentialStore::in_memory();
        assert_eq!(store.get_token(), None);
        assert_eq!(store.state(), SessionState::Anonymous);
    }

    #[test]
    fn test_clear_removes_token_from_both_tiers() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CredentialStore::new(Arc::clone(&backend));
        store.set_token("x");
        store.clear_token();
        assert_eq!(store.get_token(), None);
        assert_eq!(backend.load().unwrap(), None);

        let reloaded = CredentialStore::new(backend);
        assert_eq!(reloaded.get_token(), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = CredentialStore::in_memory();
        store.clear_token();
        store.clear_token();
        assert_eq!(store.get_token(), None);

        store.set_token("x");
        store.clear_token();
        store.clear_token();
        assert_eq!(store.get_token(), None);
    }

    #[test]
    fn test_durable_tier_only_read_once() {
        let backend = Arc::new(CountingBackend::default());
        backend.save("x").unwrap();
        let store = CredentialStore::new(Arc::clone(&backend));

        assert_eq!(store.get_token().as_deref(), Some("x"));
        assert_eq!(store.get_token().as_deref(), Some("x"));
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_memory_tier_wins_over_durable() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CredentialStore::new(Arc::clone(&backend));
        store.set_token("x");
        // Out-of-band write to the durable tier is not observed mid-session.
        backend.save("other").unwrap();
        assert_eq!(store.get_token().as_deref(), Some("x"));
    }

    #[test]
    fn test_broken_durable_tier_degrades_to_memory() {
        let store = CredentialStore::new(BrokenBackend);
        assert_eq!(store.get_token(), None);

        store.set_token("x");
        assert_eq!(store.get_token().as_deref(), Some("x"));

        store.clear_token();
        store.clear_token();
        assert_eq!(store.get_token(), None);
    }

    #[test]
    fn test_failed_durable_delete_does_not_resurrect_token() {
        struct StickyBackend(MemoryBackend);
        impl TokenBackend for StickyBackend {
            fn load(&self) -> anyhow::Result<Option<String>> {
                self.0.load()
            }
            fn save(&self, token: &str) -> anyhow::Result<()> {
                self.0.save(token)
            }
            fn delete(&self) -> anyhow::Result<()> {
                Err(anyhow::anyhow!("read-only"))
            }
        }

        let store = CredentialStore::new(StickyBackend(MemoryBackend::new()));
        store.set_token("x");
        store.clear_token();
        assert_eq!(store.get_token(), None);
    }

    #[test]
    fn test_clear_if_only_clears_matching_token() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CredentialStore::new(Arc::clone(&backend));
        store.set_token("new");

        assert!(!store.clear_if("old"));
        assert_eq!(store.get_token().as_deref(), Some("new"));
        assert_eq!(backend.load().unwrap().as_deref(), Some("new"));

        assert!(store.clear_if("new"));
        assert_eq!(store.get_token(), None);
        assert_eq!(backend.load().unwrap(), None);

        // Nothing left to compare against.
        assert!(!store.clear_if("new"));
    }

    #[test]
    fn test_readers_wait_for_durable_write() {
        use std::sync::Barrier;
        use std::thread;
        use std::time::Duration;

        /// Signals once `save` has started, then stalls before writing.
        struct SlowBackend {
            inner: MemoryBackend,
            started: Barrier,
        }

        impl TokenBackend for SlowBackend {
            fn load(&self) -> anyhow::Result<Option<String>> {
                self.inner.load()
            }
            fn save(&self, token: &str) -> anyhow::Result<()> {
                self.started.wait();
                thread::sleep(Duration::from_millis(50));
                self.inner.save(token)
            }
            fn delete(&self) -> anyhow::Result<()> {
                self.inner.delete()
            }
        }

        let backend = Arc::new(SlowBackend {
            inner: MemoryBackend::new(),
            started: Barrier::new(2),
        });
        let store = Arc::new(CredentialStore::new(Arc::clone(&backend)));
        // Warm the slot so the reader below never touches the backend.
        assert_eq!(store.get_token(), None);

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.set_token("x"))
        };
        backend.started.wait();

        // The writer holds the slot lock inside save; this read blocks until
        // both tiers hold the new token.
        assert_eq!(store.get_token().as_deref(), Some("x"));
        assert_eq!(backend.inner.load().unwrap().as_deref(), Some("x"));
        writer.join().unwrap();
    }

    #[test]
    fn test_notify_reaches_subscribers() {
        let store = CredentialStore::in_memory();
        // No subscribers yet: must not panic.
        store.notify(SessionEvent::LoggedOut);

        let mut rx = store.subscribe();
        store.notify(SessionEvent::SessionInvalid);
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::SessionInvalid);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let store = CredentialStore::in_memory();
        store.set_token("secret-token");
        let debug = format!("{:?}", store);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("present"));
    }
}
