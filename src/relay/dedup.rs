//! Idempotency window for broadcasts.
//!
//! The same logical broadcast can reach the relay through more than one
//! host entry point. Each event is reduced to an [`IdempotencyKey`]; a key
//! seen again inside the window is a duplicate.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use uuid::Uuid;

use crate::common::{BroadcastKind, RelayMessage};

/// Identity of a broadcast for deduplication purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdempotencyKey {
    kind: BroadcastKind,
    origin: Option<Uuid>,
    content_hash: u64,
    stamp: Option<u64>,
}

impl IdempotencyKey {
    pub fn new(message: &RelayMessage, stamp: Option<u64>) -> Self {
        let mut hasher = DefaultHasher::new();
        message.content.hash(&mut hasher);
        Self {
            kind: message.kind,
            origin: message.origin.as_ref().map(|o| o.uuid),
            content_hash: hasher.finish(),
            stamp,
        }
    }
}

/// Bounded, time-windowed set of recently relayed keys.
#[derive(Debug)]
pub struct Deduplicator {
    window: Duration,
    seen: Mutex<LruCache<IdempotencyKey, Instant>>,
}

impl Deduplicator {
    pub fn new(window: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            window,
            seen: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Record `key` and report whether it is new.
    ///
    /// Returns `false` when the same key was recorded less than one window ago.
    pub fn first_seen(&self, key: IdempotencyKey) -> bool {
        self.first_seen_at(key, Instant::now())
    }

    fn first_seen_at(&self, key: IdempotencyKey, now: Instant) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(at) = seen.get(&key) {
            if now.saturating_duration_since(*at) < self.window {
                return false;
            }
        }
        seen.put(key, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Identity;

    fn system(content: &str) -> RelayMessage {
        RelayMessage {
            kind: BroadcastKind::System,
            content: content.to_string(),
            origin: None,
        }
    }

    #[test]
    fn test_repeat_inside_window_is_duplicate() {
        let dedup = Deduplicator::new(Duration::from_millis(500), 16);
        let key = IdempotencyKey::new(&system("Server restarting"), Some(10));
        let now = Instant::now();

        assert!(dedup.first_seen_at(key, now));
        assert!(!dedup.first_seen_at(key, now + Duration::from_millis(100)));
    }

    #[test]
    fn test_repeat_after_window_is_new() {
        let dedup = Deduplicator::new(Duration::from_millis(500), 16);
        let key = IdempotencyKey::new(&system("tick"), None);
        let now = Instant::now();

        assert!(dedup.first_seen_at(key, now));
        assert!(dedup.first_seen_at(key, now + Duration::from_millis(600)));
    }

    #[test]
    fn test_key_distinguishes_stamp_and_origin() {
        let msg = system("hello");
        assert_ne!(
            IdempotencyKey::new(&msg, Some(1)),
            IdempotencyKey::new(&msg, Some(2))
        );

        let chat = RelayMessage {
            kind: BroadcastKind::Chat,
            content: "hello".to_string(),
            origin: Some(Identity::new(Uuid::new_v4(), "A")),
        };
        let other = RelayMessage {
            origin: Some(Identity::new(Uuid::new_v4(), "B")),
            ..chat.clone()
        };
        assert_ne!(IdempotencyKey::new(&chat, None), IdempotencyKey::new(&other, None));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let dedup = Deduplicator::new(Duration::from_secs(60), 2);
        let now = Instant::now();
        let a = IdempotencyKey::new(&system("a"), None);
        let b = IdempotencyKey::new(&system("b"), None);
        let c = IdempotencyKey::new(&system("c"), None);

        assert!(dedup.first_seen_at(a, now));
        assert!(dedup.first_seen_at(b, now));
        assert!(dedup.first_seen_at(c, now));
        assert!(dedup.first_seen_at(a, now));
    }
}
