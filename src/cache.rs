//! Resolution result cache with TTL-based freshness.
use crate::services::ResolutionCache;
use crate::types::{EntityType, ResolvedEntity};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Cache key: `"<TYPE>::<lower(trim(text))>"`. Pure in its inputs, so two
/// mentions differing only in case or outer whitespace share one entry.
pub fn cache_key(text: &str, entity_type: EntityType) -> String {
    format!("{}::{}", entity_type.as_str(), text.trim().to_lowercase())
}

struct Entry {
    value: ResolvedEntity,
    stored_at: DateTime<Utc>,
}

/// In-process [`ResolutionCache`] with per-entry TTL and lazy eviction:
/// stale entries are dropped on access.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResolutionCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<ResolvedEntity> {
        let expired = {
            let entries = self.entries.read().expect("cache lock poisoned");
            match entries.get(key) {
                Some(entry) if Utc::now() - entry.stored_at < self.ttl => {
                    return Some(entry.value.clone());
                }
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.entries
                .write()
                .expect("cache lock poisoned")
                .remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: ResolvedEntity) {
        self.entries.write().expect("cache lock poisoned").insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Utc::now(),
            },
        );
    }

    async fn invalidate(&self, key: &str) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .remove(key);
    }
}
