//! Registry of completion events that were posted but not yet delivered.
//!
//! Each posted event carries an [`OwnerToken`]. Stopping a scheduler clears
//! every live token, so events still sitting in the event loop's queue are
//! recognised as stale and dropped instead of reaching into torn-down state.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

/// Identity of a posted completion event
pub type EventId = u64;

/// Back-reference from an event to its owning scheduler.
///
/// Clearing it is the only way an event is invalidated; the event's own
/// memory is never touched from another thread.
#[derive(Clone, Debug)]
pub struct OwnerToken {
    live: Arc<AtomicBool>,
}

impl OwnerToken {
    fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Detach the event from its owner. Idempotent.
    pub fn clear(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_cleared(&self) -> bool {
        !self.live.load(Ordering::Acquire)
    }
}

pub struct InvalidationRegistry {
    next_id: AtomicU64,
    tokens: Mutex<HashMap<EventId, OwnerToken>>,
}

impl InvalidationRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new event and return its id and owner token.
    pub fn register(&self) -> (EventId, OwnerToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = OwnerToken::new();
        self.tokens.lock().insert(id, token.clone());
        (id, token)
    }

    /// Remove an event on delivery.
    ///
    /// Returns `true` only if the event was still registered with its owner
    /// attached; a second claim of the same id always returns `false`.
    pub fn claim(&self, id: EventId) -> bool {
        match self.tokens.lock().remove(&id) {
            Some(token) => !token.is_cleared(),
            None => false,
        }
    }

    /// Clear the owner of every live event and forget them.
    ///
    /// Returns the number of events invalidated.
    pub fn invalidate_all(&self) -> usize {
        let drained: Vec<OwnerToken> = self.tokens.lock().drain().map(|(_, t)| t).collect();
        for token in &drained {
            token.clear();
        }
        drained.len()
    }

    /// Number of events posted but not yet delivered or invalidated
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}

impl Default for InvalidationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_claim() {
        let registry = InvalidationRegistry::new();
        let (id, token) = registry.register();
        assert_eq!(registry.len(), 1);
        assert!(!token.is_cleared());

        assert!(registry.claim(id));
        assert!(registry.is_empty());
        assert!(!registry.claim(id));
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = InvalidationRegistry::new();
        let (a, _) = registry.register();
        let (b, _) = registry.register();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalidate_all_clears_owners() {
        let registry = InvalidationRegistry::new();
        let (first, first_token) = registry.register();
        let (second, second_token) = registry.register();

        assert_eq!(registry.invalidate_all(), 2);
        assert!(registry.is_empty());
        assert!(first_token.is_cleared());
        assert!(second_token.is_cleared());

        assert!(!registry.claim(first));
        assert!(!registry.claim(second));
    }

    #[test]
    fn test_cleared_token_is_not_claimable() {
        let registry = InvalidationRegistry::new();
        let (id, token) = registry.register();
        token.clear();
        token.clear();
        assert!(!registry.claim(id));
    }

    #[test]
    fn test_invalidate_empty_registry() {
        let registry = InvalidationRegistry::default();
        assert_eq!(registry.invalidate_all(), 0);
    }
}
