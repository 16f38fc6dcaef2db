//! Normalized response cache keyed by query, grouped by entity tag.
//!
//! Reads register under the tags they provide; mutations mark every entry
//! under the tags they invalidate as stale. A stale entry is never returned
//! by [`ResponseCache::fresh`], so the next read for it goes to the network.

mod janitor;

pub use janitor::spawn_cache_janitor;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTag {
    Admins,
    Users,
    Categories,
    Products,
    Cart,
    Orders,
}

impl CacheTag {
    pub const ALL: [CacheTag; 6] = [
        CacheTag::Admins,
        CacheTag::Users,
        CacheTag::Categories,
        CacheTag::Products,
        CacheTag::Cart,
        CacheTag::Orders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admins => "admins",
            Self::Users => "users",
            Self::Categories => "categories",
            Self::Products => "products",
            Self::Cart => "cart",
            Self::Orders => "orders",
        }
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a read: method, path and query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Invalidated { tags: Vec<CacheTag>, keys: Vec<QueryKey> },
    Cleared,
}

/// Read-only view of an entry, for inspection and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntryInfo {
    pub tags: Vec<CacheTag>,
    pub stale: bool,
    pub subscribers: usize,
}

/// Tag generations observed when a read started. An entry stored with a
/// ticket whose generations have since moved is stored stale.
#[derive(Debug, Clone)]
pub struct ReadTicket {
    generations: Vec<(CacheTag, u64)>,
}

struct CacheEntry {
    tags: Vec<CacheTag>,
    payload: Value,
    stale: bool,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    by_tag: HashMap<CacheTag, HashSet<QueryKey>>,
    generations: HashMap<CacheTag, u64>,
    subscribers: HashMap<QueryKey, usize>,
    unused_since: HashMap<QueryKey, Instant>,
}

impl CacheState {
    fn generation(&self, tag: CacheTag) -> u64 {
        self.generations.get(&tag).copied().unwrap_or(0)
    }

    fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.subscribers.get(key).copied().unwrap_or(0)
    }

    fn remove(&mut self, key: &QueryKey) {
        if let Some(entry) = self.entries.remove(key) {
            for tag in entry.tags {
                if let Some(keys) = self.by_tag.get_mut(&tag) {
                    keys.remove(key);
                }
            }
        }
        self.unused_since.remove(key);
    }
}

pub struct ResponseCache {
    state: Mutex<CacheState>,
    events: broadcast::Sender<CacheEvent>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(CacheState::default()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Payload for `key` unless it is missing or stale.
    pub fn fresh(&self, key: &QueryKey) -> Option<Value> {
        let state = self.lock();
        state
            .entries
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.payload.clone())
    }

    pub fn begin_read(&self, tags: &[CacheTag]) -> ReadTicket {
        let state = self.lock();
        ReadTicket {
            generations: tags.iter().map(|t| (*t, state.generation(*t))).collect(),
        }
    }

    /// Stores a completed read. Returns `false` when one of its tags was
    /// invalidated while the read was in flight; the entry is then kept but
    /// already stale.
    pub fn store(&self, key: QueryKey, tags: &[CacheTag], payload: Value, ticket: &ReadTicket) -> bool {
        let mut state = self.lock();
        let current = ticket
            .generations
            .iter()
            .all(|(tag, generation)| state.generation(*tag) == *generation);

        state.remove(&key);
        for tag in tags {
            state.by_tag.entry(*tag).or_default().insert(key.clone());
        }
        if state.subscriber_count(&key) == 0 {
            state.unused_since.insert(key.clone(), Instant::now());
        }
        state.entries.insert(
            key,
            CacheEntry {
                tags: tags.to_vec(),
                payload,
                stale: !current,
            },
        );
        current
    }

    /// Marks every entry under `tags` stale. Returns the affected keys.
    pub fn invalidate(&self, tags: &[CacheTag]) -> Vec<QueryKey> {
        if tags.is_empty() {
            return Vec::new();
        }

        let mut keys = Vec::new();
        {
            let mut state = self.lock();
            for tag in tags {
                *state.generations.entry(*tag).or_insert(0) += 1;
                let tagged: Vec<QueryKey> = state
                    .by_tag
                    .get(tag)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default();
                for key in tagged {
                    if let Some(entry) = state.entries.get_mut(&key) {
                        entry.stale = true;
                    }
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
        }
        keys.sort();

        debug!(tags = ?tags, invalidated = keys.len(), "cache tags invalidated");
        let _ = self.events.send(CacheEvent::Invalidated {
            tags: tags.to_vec(),
            keys: keys.clone(),
        });
        keys
    }

    pub fn clear(&self) {
        {
            let mut state = self.lock();
            state.entries.clear();
            state.by_tag.clear();
            state.unused_since.clear();
            for tag in CacheTag::ALL {
                *state.generations.entry(tag).or_insert(0) += 1;
            }
        }
        debug!("cache cleared");
        let _ = self.events.send(CacheEvent::Cleared);
    }

    /// Registers interest in `key`. The entry is exempt from expiry while at
    /// least one subscription is alive.
    pub fn subscribe(self: &Arc<Self>, key: QueryKey) -> QuerySubscription {
        {
            let mut state = self.lock();
            *state.subscribers.entry(key.clone()).or_insert(0) += 1;
            state.unused_since.remove(&key);
        }
        QuerySubscription {
            cache: Arc::clone(self),
            key,
            events: self.events.subscribe(),
        }
    }

    fn release(&self, key: &QueryKey) {
        let mut state = self.lock();
        let remaining = match state.subscribers.get_mut(key) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            state.subscribers.remove(key);
            if state.entries.contains_key(key) {
                state.unused_since.insert(key.clone(), Instant::now());
            }
        }
    }

    /// Drops entries that have had no subscribers for at least `keep_for`.
    pub fn prune_unused(&self, keep_for: Duration, now: Instant) -> usize {
        let mut state = self.lock();
        let expired: Vec<QueryKey> = state
            .unused_since
            .iter()
            .filter(|(_, since)| now.saturating_duration_since(**since) >= keep_for)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }

    pub fn entry_info(&self, key: &QueryKey) -> Option<CacheEntryInfo> {
        let state = self.lock();
        state.entries.get(key).map(|entry| CacheEntryInfo {
            tags: entry.tags.clone(),
            stale: entry.stale,
            subscribers: state.subscriber_count(key),
        })
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Live interest in one query. Dropping it releases the subscriber slot.
pub struct QuerySubscription {
    cache: Arc<ResponseCache>,
    key: QueryKey,
    events: broadcast::Receiver<CacheEvent>,
}

impl QuerySubscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Resolves once this query's entry has been invalidated or the cache
    /// was cleared. Returns `false` if the cache went away.
    pub async fn invalidated(&mut self) -> bool {
        loop {
            match self.events.recv().await {
                Ok(CacheEvent::Invalidated { keys, .. }) if keys.contains(&self.key) => return true,
                Ok(CacheEvent::Cleared) => return true,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => return true,
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(s: &str) -> QueryKey {
        QueryKey::new(s)
    }

    #[test]
    fn invalidation_marks_only_tagged_entries_stale() {
        let cache = ResponseCache::new();
        let t = cache.begin_read(&[CacheTag::Products]);
        cache.store(key("GET /products"), &[CacheTag::Products], json!([1]), &t);
        let t = cache.begin_read(&[CacheTag::Cart]);
        cache.store(key("GET /cart"), &[CacheTag::Cart], json!({"items": []}), &t);

        let affected = cache.invalidate(&[CacheTag::Products]);
        assert_eq!(affected, vec![key("GET /products")]);
        assert_eq!(cache.fresh(&key("GET /products")), None);
        assert_eq!(cache.fresh(&key("GET /cart")), Some(json!({"items": []})));
    }

    #[test]
    fn read_started_before_invalidation_is_stored_stale() {
        let cache = ResponseCache::new();
        let ticket = cache.begin_read(&[CacheTag::Orders]);
        cache.invalidate(&[CacheTag::Orders]);

        let current = cache.store(key("GET /orders"), &[CacheTag::Orders], json!([]), &ticket);
        assert!(!current);
        assert!(cache.entry_info(&key("GET /orders")).unwrap().stale);
        assert_eq!(cache.fresh(&key("GET /orders")), None);
    }

    #[test]
    fn subscribed_entries_survive_pruning() {
        let cache = Arc::new(ResponseCache::new());
        let t = cache.begin_read(&[CacheTag::Categories]);
        cache.store(key("GET /categories"), &[CacheTag::Categories], json!([]), &t);
        let t = cache.begin_read(&[CacheTag::Products]);
        cache.store(key("GET /products"), &[CacheTag::Products], json!([]), &t);

        let sub = cache.subscribe(key("GET /categories"));
        assert_eq!(cache.entry_info(sub.key()).unwrap().subscribers, 1);

        let later = Instant::now() + Duration::from_secs(120);
        assert_eq!(cache.prune_unused(Duration::from_secs(60), later), 1);
        assert!(cache.entry_info(&key("GET /categories")).is_some());
        assert!(cache.entry_info(&key("GET /products")).is_none());

        drop(sub);
        let much_later = Instant::now() + Duration::from_secs(240);
        assert_eq!(cache.prune_unused(Duration::from_secs(60), much_later), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn subscription_wakes_on_invalidation_of_its_key() {
        let cache = Arc::new(ResponseCache::new());
        let t = cache.begin_read(&[CacheTag::Cart]);
        cache.store(key("GET /cart"), &[CacheTag::Cart], json!({}), &t);
        let mut sub = cache.subscribe(key("GET /cart"));

        cache.invalidate(&[CacheTag::Products]);
        cache.invalidate(&[CacheTag::Cart]);
        assert!(sub.invalidated().await);
    }
}
