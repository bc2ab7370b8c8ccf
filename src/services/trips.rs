//! The five trip operations.
//!
//! Each one takes the caller explicitly and runs the same pipeline: validate
//! the payload, resolve the trip and check ownership, touch the store, then
//! drop the caller's cached listing. Cache trouble is logged and otherwise
//! ignored; the store is the source of truth.

use axum::body::Bytes;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    auth::AuthenticatedUser,
    cache::{CacheSlot, CachedListing, ListingKey},
    error::AppError,
    models::trip::Trip,
    ownership::{check_owner, Access},
    response::{Envelope, ListMeta},
    state::AppState,
    validation::validate_trip,
};

pub const LISTED: &str = "List trip by updated time";
pub const CREATED: &str = "Trip success created";
pub const SHOWN: &str = "Detail data trip";
pub const UPDATED: &str = "Trip success updated";
pub const DELETED: &str = "Trip success deleted";

pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(u32);

impl PageSize {
    /// Anything that is not a positive integer falls back to the default.
    pub fn from_query(raw: Option<&str>) -> Self {
        let size = raw
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|value| *value > 0)
            .map(|value| value.min(i64::from(MAX_PAGE_SIZE)) as u32)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self(size)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Returns the serialized listing envelope, from cache when possible.
pub async fn list_trips(
    state: &AppState,
    caller: &AuthenticatedUser,
    page_size: PageSize,
) -> Result<Bytes, AppError> {
    let key = ListingKey::for_owner(caller.id);
    let generation = match state.cache.get(&key).await {
        Ok(CacheSlot {
            listing: Some(listing),
            ..
        }) if listing.page_size == page_size.get() => {
            debug!(%key, "listing cache hit");
            return Ok(listing.body);
        }
        Ok(slot) => {
            debug!(%key, "listing cache miss");
            Some(slot.generation)
        }
        Err(err) => {
            warn!(%key, "listing cache unavailable, reading store directly: {err}");
            None
        }
    };

    let trips = state.trips.list_for_owner(caller.id, page_size.get()).await?;
    let total = state.trips.count_for_owner(caller.id).await?;
    let envelope = Envelope::listing(
        LISTED,
        trips,
        ListMeta {
            per_page: page_size.get(),
            total,
        },
    );
    let body =
        Bytes::from(serde_json::to_vec(&envelope).map_err(|err| AppError::Other(err.into()))?);

    if let Some(generation) = generation {
        let listing = CachedListing {
            page_size: page_size.get(),
            body: body.clone(),
        };
        match state
            .cache
            .put(&key, generation, listing, state.config.list_cache_ttl)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(%key, "listing changed while it was built, not caching"),
            Err(err) => warn!(%key, "could not cache listing: {err}"),
        }
    }

    Ok(body)
}

pub async fn create_trip(
    state: &AppState,
    caller: &AuthenticatedUser,
    payload: &Map<String, Value>,
) -> Result<Trip, AppError> {
    let input = validate_trip(payload).map_err(AppError::Validation)?;
    let trip = state.trips.create(caller.id, &input).await?;
    info!(trip_id = trip.id, user_id = caller.id, "trip created");
    invalidate_listing(state, caller.id).await;
    Ok(trip)
}

pub async fn show_trip(
    state: &AppState,
    caller: &AuthenticatedUser,
    raw_id: &str,
) -> Result<Trip, AppError> {
    load_owned(state, caller, raw_id).await
}

pub async fn update_trip(
    state: &AppState,
    caller: &AuthenticatedUser,
    raw_id: &str,
    payload: &Map<String, Value>,
) -> Result<Trip, AppError> {
    let input = validate_trip(payload).map_err(AppError::Validation)?;
    let existing = load_owned(state, caller, raw_id).await?;
    let trip = state
        .trips
        .update(existing.id, &input)
        .await?
        .ok_or_else(|| AppError::TripNotFound(raw_id.to_string()))?;
    info!(trip_id = trip.id, user_id = caller.id, "trip updated");
    invalidate_listing(state, caller.id).await;
    Ok(trip)
}

pub async fn delete_trip(
    state: &AppState,
    caller: &AuthenticatedUser,
    raw_id: &str,
) -> Result<(), AppError> {
    let existing = load_owned(state, caller, raw_id).await?;
    if !state.trips.delete(existing.id).await? {
        return Err(AppError::TripNotFound(raw_id.to_string()));
    }
    info!(trip_id = existing.id, user_id = caller.id, "trip deleted");
    invalidate_listing(state, caller.id).await;
    Ok(())
}

/// Resolves a trip id and applies the ownership guard. A missing trip and a
/// trip owned by someone else are reported differently.
async fn load_owned(
    state: &AppState,
    caller: &AuthenticatedUser,
    raw_id: &str,
) -> Result<Trip, AppError> {
    let found = match raw_id.parse::<i64>() {
        Ok(id) => state.trips.find(id).await?,
        Err(_) => None,
    };
    let trip = found.ok_or_else(|| AppError::TripNotFound(raw_id.to_string()))?;

    match check_owner(&trip, caller) {
        Access::Allowed => Ok(trip),
        Access::Denied => {
            info!(trip_id = trip.id, user_id = caller.id, "denied access to trip");
            Err(AppError::NotAllowed)
        }
    }
}

async fn invalidate_listing(state: &AppState, owner_id: i64) {
    let key = ListingKey::for_owner(owner_id);
    if let Err(err) = state.cache.invalidate(&key).await {
        warn!(%key, "could not invalidate listing: {err}");
    }
}
