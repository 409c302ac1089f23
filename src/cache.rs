use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Default TTL for entries stored without an explicit one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);
/// How often the background sweeper removes expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(120);

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// In-process key/value cache with per-entry TTL.
///
/// Purely an accelerator: the store of record stays authoritative, so a
/// poisoned lock or an expired entry degrades to a miss, never an error.
/// Eviction is time-based only; there is no size bound.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Get a live value. Expired entries are dropped on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().ok()?;
        let expired = match entries.get(key) {
            Some(entry) => {
                if entry.expires_at > Instant::now() {
                    debug!(key, "cache hit");
                    return Some(entry.value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            entries.remove(key);
            debug!(key, "cache expired");
        } else {
            debug!(key, "cache miss");
        }
        None
    }

    /// Store a value with the cache's default TTL.
    pub fn set(&self, key: &str, value: V) -> bool {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        debug!(key, ttl_secs = ttl.as_secs(), "cache set");
        true
    }

    /// Remove a key, returning how many entries were removed (0 or 1).
    pub fn del(&self, key: &str) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let removed = usize::from(entries.remove(key).is_some());
        debug!(key, removed, "cache delete");
        removed
    }

    /// True when the key holds a live (non-expired) entry.
    pub fn has(&self, key: &str) -> bool {
        let Ok(entries) = self.entries.lock() else {
            return false;
        };
        entries
            .get(key)
            .map(|e| e.expires_at > Instant::now())
            .unwrap_or(false)
    }

    /// All keys with live entries.
    pub fn keys(&self) -> Vec<String> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        let now = Instant::now();
        entries
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn flush_all(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
            info!("cache flushed");
        }
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "cache sweep");
        }
        removed
    }
}

/// Spawn the periodic expiry sweep. Runs independently of request
/// handling and only deletes expired entries.
pub fn spawn_sweeper<V>(cache: Arc<TtlCache<V>>, interval: Duration) -> tokio::task::JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            cache.sweep_expired();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TtlCache<String> {
        TtlCache::new(Duration::from_secs(300))
    }

    #[test]
    fn set_and_get_roundtrip() {
        let cache = cache();
        assert!(cache.get("user:1").is_none());
        assert!(cache.set("user:1", "alice".into()));
        assert_eq!(cache.get("user:1").as_deref(), Some("alice"));
    }

    #[test]
    fn set_overwrites_previous_value() {
        let cache = cache();
        cache.set("k", "old".into());
        cache.set("k", "new".into());
        assert_eq!(cache.get("k").as_deref(), Some("new"));
    }

    #[test]
    fn expired_entry_reads_as_miss() {
        let cache = cache();
        cache.set_with_ttl("k", "v".into(), Duration::from_millis(10));
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("k").is_none());
        assert!(!cache.has("k"));
    }

    #[test]
    fn del_reports_removed_count() {
        let cache = cache();
        cache.set("k", "v".into());
        assert_eq!(cache.del("k"), 1);
        assert_eq!(cache.del("k"), 0);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn keys_skips_expired_entries() {
        let cache = cache();
        cache.set("live", "v".into());
        cache.set_with_ttl("dead", "v".into(), Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));
        let keys = cache.keys();
        assert_eq!(keys, vec!["live".to_string()]);
    }

    #[test]
    fn flush_all_clears_everything() {
        let cache = cache();
        cache.set("a", "1".into());
        cache.set("b", "2".into());
        cache.flush_all();
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let cache = cache();
        cache.set("live", "v".into());
        cache.set_with_ttl("dead", "v".into(), Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.sweep_expired(), 1);
        assert!(cache.has("live"));
        assert_eq!(cache.sweep_expired(), 0);
    }
}
