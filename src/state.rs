use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    cache::{MemoryListCache, SharedListCache},
    config::AppConfig,
    db::DbPool,
    services::trip_store::TripStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub trips: TripStore,
    pub cache: SharedListCache,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        Self::with_cache(config, db, Arc::new(MemoryListCache::new()))
    }

    pub fn with_cache(config: AppConfig, db: DbPool, cache: SharedListCache) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        let trips = TripStore::new(db.clone());
        Self {
            config,
            db,
            trips,
            cache,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
