//! Per-owner cache of the serialized "my trips" listing.
//!
//! Every lookup reports a generation. `invalidate` moves it forward, and a
//! `put` made with the generation observed before the store was queried is
//! dropped if a mutation invalidated the key in between. That keeps a slow
//! listing from re-caching rows older than a concurrent write.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;
use tokio::sync::RwLock;

const LISTING_PREFIX: &str = "my_trip";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    owner_id: i64,
}

impl ListingKey {
    pub fn for_owner(owner_id: i64) -> Self {
        Self { owner_id }
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LISTING_PREFIX}:{}", self.owner_id)
    }
}

/// A serialized listing together with the page size it was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedListing {
    pub page_size: u32,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlot {
    pub listing: Option<CachedListing>,
    pub generation: u64,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ListCache: Send + Sync {
    async fn get(&self, key: &ListingKey) -> Result<CacheSlot, CacheError>;

    /// Returns `false` when the entry was discarded because the key was
    /// invalidated after `generation` was read.
    async fn put(
        &self,
        key: &ListingKey,
        generation: u64,
        listing: CachedListing,
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    async fn invalidate(&self, key: &ListingKey) -> Result<(), CacheError>;
}

pub type SharedListCache = Arc<dyn ListCache>;

struct Slot {
    generation: u64,
    listing: CachedListing,
    expires_at: Instant,
}

/// Only live entries are kept. `epoch` counts every invalidation, and a key
/// without a slot reports it as its generation, so dropping a slot never lets
/// a stale `put` through.
#[derive(Default)]
struct Slots {
    epoch: u64,
    entries: HashMap<ListingKey, Slot>,
}

#[derive(Clone, Default)]
pub struct MemoryListCache {
    slots: Arc<RwLock<Slots>>,
}

impl MemoryListCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.slots.read().await.entries.len()
    }
}

#[async_trait]
impl ListCache for MemoryListCache {
    async fn get(&self, key: &ListingKey) -> Result<CacheSlot, CacheError> {
        let now = Instant::now();
        let slots = self.slots.read().await;
        let Some(slot) = slots.entries.get(key) else {
            return Ok(CacheSlot {
                listing: None,
                generation: slots.epoch,
            });
        };
        Ok(CacheSlot {
            listing: (slot.expires_at > now).then(|| slot.listing.clone()),
            generation: slot.generation,
        })
    }

    async fn put(
        &self,
        key: &ListingKey,
        generation: u64,
        listing: CachedListing,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut slots = self.slots.write().await;

        // A present slot proves the key was not invalidated since it was written.
        let current = slots
            .entries
            .get(key)
            .map_or(slots.epoch, |slot| slot.generation);
        if current != generation {
            return Ok(false);
        }

        slots.entries.retain(|_, slot| slot.expires_at > now);
        slots.entries.insert(
            key.clone(),
            Slot {
                generation,
                listing,
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn invalidate(&self, key: &ListingKey) -> Result<(), CacheError> {
        let mut slots = self.slots.write().await;
        slots.entries.remove(key);
        slots.epoch += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn listing(body: &'static str) -> CachedListing {
        CachedListing {
            page_size: 1000,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn key_is_scoped_per_owner() {
        assert_eq!(ListingKey::for_owner(7).to_string(), "my_trip:7");
        assert_ne!(ListingKey::for_owner(7), ListingKey::for_owner(8));
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = MemoryListCache::new();
        let key = ListingKey::for_owner(7);

        let slot = cache.get(&key).await.unwrap();
        assert!(slot.listing.is_none());

        assert!(cache
            .put(&key, slot.generation, listing("[1]"), HOUR)
            .await
            .unwrap());
        let slot = cache.get(&key).await.unwrap();
        assert_eq!(slot.listing, Some(listing("[1]")));
    }

    #[tokio::test]
    async fn owners_do_not_share_entries() {
        let cache = MemoryListCache::new();
        let mine = ListingKey::for_owner(7);
        cache.put(&mine, 0, listing("[1]"), HOUR).await.unwrap();

        let theirs = cache.get(&ListingKey::for_owner(8)).await.unwrap();
        assert!(theirs.listing.is_none());

        cache.invalidate(&ListingKey::for_owner(8)).await.unwrap();
        assert!(cache.get(&mine).await.unwrap().listing.is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = MemoryListCache::new();
        let key = ListingKey::for_owner(7);
        cache
            .put(&key, 0, listing("[1]"), Duration::ZERO)
            .await
            .unwrap();
        assert!(cache.get(&key).await.unwrap().listing.is_none());
    }

    #[tokio::test]
    async fn invalidate_drops_entry() {
        let cache = MemoryListCache::new();
        let key = ListingKey::for_owner(7);
        cache.put(&key, 0, listing("[1]"), HOUR).await.unwrap();
        cache.invalidate(&key).await.unwrap();

        let slot = cache.get(&key).await.unwrap();
        assert!(slot.listing.is_none());
        assert_eq!(slot.generation, 1);
    }

    #[tokio::test]
    async fn stale_put_after_invalidate_is_discarded() {
        let cache = MemoryListCache::new();
        let key = ListingKey::for_owner(7);

        // A listing reads the generation, then a write lands before it stores.
        let observed = cache.get(&key).await.unwrap().generation;
        cache.invalidate(&key).await.unwrap();

        let stored = cache
            .put(&key, observed, listing("[stale]"), HOUR)
            .await
            .unwrap();
        assert!(!stored);
        assert!(cache.get(&key).await.unwrap().listing.is_none());
    }

    #[tokio::test]
    async fn invalidated_and_expired_slots_are_dropped() {
        let cache = MemoryListCache::new();
        for owner in 1..=3 {
            cache
                .put(&ListingKey::for_owner(owner), 0, listing("[1]"), HOUR)
                .await
                .unwrap();
        }
        assert_eq!(cache.len().await, 3);

        cache.invalidate(&ListingKey::for_owner(1)).await.unwrap();
        cache.invalidate(&ListingKey::for_owner(2)).await.unwrap();
        assert_eq!(cache.len().await, 1);

        let key = ListingKey::for_owner(4);
        let generation = cache.get(&key).await.unwrap().generation;
        cache
            .put(&key, generation, listing("[4]"), Duration::ZERO)
            .await
            .unwrap();
        let key = ListingKey::for_owner(5);
        let generation = cache.get(&key).await.unwrap().generation;
        cache.put(&key, generation, listing("[5]"), HOUR).await.unwrap();

        // Owner 4 expired on arrival and is purged by the next write.
        assert_eq!(cache.len().await, 2);
        assert!(cache
            .get(&ListingKey::for_owner(3))
            .await
            .unwrap()
            .listing
            .is_some());
    }

    #[tokio::test]
    async fn stale_put_is_discarded_after_slot_was_dropped() {
        let cache = MemoryListCache::new();
        let key = ListingKey::for_owner(7);
        cache.put(&key, 0, listing("[old]"), HOUR).await.unwrap();

        let observed = cache.get(&key).await.unwrap().generation;
        cache.invalidate(&key).await.unwrap();
        assert_eq!(cache.len().await, 0);

        let stored = cache
            .put(&key, observed, listing("[stale]"), HOUR)
            .await
            .unwrap();
        assert!(!stored);
        assert!(cache.get(&key).await.unwrap().listing.is_none());
    }
}
