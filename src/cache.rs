use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::models::DirectoryRecord;

struct CachedRecord {
    record: DirectoryRecord,
    inserted_at: Instant,
}

#[derive(Default)]
struct Entries {
    records: HashMap<String, CachedRecord>,
    // Bumped by every invalidate/clear. Lookups that started under an older
    // generation must not write back.
    generation: u64,
}

/// RoleCache
///
/// Short-lived cache of the directory record the gate resolved for an email, so that
/// consecutive page loads do not each pay a directory round-trip.
///
/// Keys are lower-cased emails. Entries expire after `ttl`; expired entries are dropped
/// when read and swept on every insert. Any change to a user's role or approval must
/// call [`RoleCache::invalidate`]. A zero `ttl` turns the cache off.
///
/// Callers filling the cache from a lookup should take [`RoleCache::generation`] before
/// the lookup and store through [`RoleCache::insert_if_unchanged`], so a record read
/// before an invalidation is never put back after it.
pub struct RoleCache {
    ttl: Duration,
    entries: RwLock<Entries>,
}

impl RoleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn get(&self, email: &str) -> Option<DirectoryRecord> {
        if !self.is_enabled() {
            return None;
        }
        let key = cache_key(email);

        {
            let entries = self.entries.read().await;
            match entries.records.get(&key) {
                Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                    return Some(entry.record.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it, unless a fresh insert raced in meanwhile.
        let mut entries = self.entries.write().await;
        if entries
            .records
            .get(&key)
            .is_some_and(|entry| entry.inserted_at.elapsed() >= self.ttl)
        {
            entries.records.remove(&key);
        }
        None
    }

    /// Current invalidation generation.
    pub async fn generation(&self) -> u64 {
        self.entries.read().await.generation
    }

    pub async fn insert(&self, email: &str, record: DirectoryRecord) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.entries.write().await;
        self.store(&mut entries, email, record);
    }

    /// Stores `record` only if nothing was invalidated since `generation` was read.
    /// Returns whether the record was stored.
    pub async fn insert_if_unchanged(
        &self,
        email: &str,
        record: DirectoryRecord,
        generation: u64,
    ) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let mut entries = self.entries.write().await;
        if entries.generation != generation {
            tracing::debug!("discarding stale directory record for {}", email);
            return false;
        }
        self.store(&mut entries, email, record);
        true
    }

    /// Returns whether an entry was present.
    pub async fn invalidate(&self, email: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.generation = entries.generation.wrapping_add(1);
        let removed = entries.records.remove(&cache_key(email)).is_some();
        if removed {
            tracing::debug!("role cache invalidated for {}", email);
        }
        removed
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.generation = entries.generation.wrapping_add(1);
        entries.records.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn store(&self, entries: &mut Entries, email: &str, record: DirectoryRecord) {
        let ttl = self.ttl;
        entries
            .records
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        entries.records.insert(
            cache_key(email),
            CachedRecord {
                record,
                inserted_at: Instant::now(),
            },
        );
    }
}

fn cache_key(email: &str) -> String {
    email.trim().to_lowercase()
}
