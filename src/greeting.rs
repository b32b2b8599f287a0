//! One-time welcome message for first-time senders.
//!
//! Senders are remembered in an LRU bounded by capacity; entries also expire
//! after a TTL, after which the sender is greeted again. Nothing is persisted.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

/// Default welcome text.
pub const DEFAULT_WELCOME: &str =
    "👋 Welcome to the tool rental bot! Send /tool_rental to see what you can rent.";

/// Bounded, expiring set of senders already greeted.
pub struct KnownSenders {
    seen: LruCache<String, Instant>,
    ttl: Duration,
}

impl KnownSenders {
    /// Create a set holding at most `capacity` senders for `ttl` each.
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            seen: LruCache::new(capacity),
            ttl,
        }
    }

    /// Record contact from `sender` at `now`.
    ///
    /// Returns `true` when the sender is new or its entry has expired.
    pub fn observe(&mut self, sender: &str, now: Instant) -> bool {
        if let Some(first_seen) = self.seen.get(sender) {
            if now.saturating_duration_since(*first_seen) < self.ttl {
                return false;
            }
        }
        self.seen.put(sender.to_owned(), now);
        true
    }

    /// Number of remembered senders.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` if no sender is remembered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Hands out the welcome message once per sender.
pub struct Greeter {
    known: Mutex<KnownSenders>,
    message: String,
}

impl Greeter {
    /// Create a greeter with the given cache bounds and message.
    pub fn new(capacity: NonZeroUsize, ttl: Duration, message: impl Into<String>) -> Self {
        Self {
            known: Mutex::new(KnownSenders::new(capacity, ttl)),
            message: message.into(),
        }
    }

    /// Welcome text if `sender` has not been greeted recently.
    pub async fn welcome_for(&self, sender: &str) -> Option<String> {
        let mut known = self.known.lock().await;
        known
            .observe(sender, Instant::now())
            .then(|| self.message.clone())
    }
}
