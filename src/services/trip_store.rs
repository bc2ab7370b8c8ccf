use chrono::Utc;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{Trip, TripInput},
};

const TRIP_COLUMNS: &str = "id, user_id, title, origin, destination, type, description, \
                            start_date, end_date, created_at, updated_at";

#[derive(Clone)]
pub struct TripStore {
    db: DbPool,
}

impl TripStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, owner_id: i64, input: &TripInput) -> Result<Trip, AppError> {
        let now = Utc::now();
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "INSERT INTO trips (user_id, title, origin, destination, type, description, \
             start_date, end_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {TRIP_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(&input.title)
        .bind(&input.origin)
        .bind(&input.destination)
        .bind(input.trip_type)
        .bind(&input.description)
        .bind(&input.start_date)
        .bind(&input.end_date)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(trip)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Trip>, AppError> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(trip)
    }

    /// Rewrites every editable column. `user_id` and `created_at` are left alone.
    /// `None` if the row disappeared since it was looked up.
    pub async fn update(&self, id: i64, input: &TripInput) -> Result<Option<Trip>, AppError> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "UPDATE trips SET title = ?, origin = ?, destination = ?, type = ?, \
             description = ?, start_date = ?, end_date = ?, updated_at = ? \
             WHERE id = ? RETURNING {TRIP_COLUMNS}"
        ))
        .bind(&input.title)
        .bind(&input.origin)
        .bind(&input.destination)
        .bind(input.trip_type)
        .bind(&input.description)
        .bind(&input.start_date)
        .bind(&input.end_date)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(trip)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM trips WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Newest first by `updated_at`, at most `limit` rows.
    pub async fn list_for_owner(&self, owner_id: i64, limit: u32) -> Result<Vec<Trip>, AppError> {
        let trips = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE user_id = ? \
             ORDER BY updated_at DESC, id DESC LIMIT ?"
        ))
        .bind(owner_id)
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;
        Ok(trips)
    }

    pub async fn count_for_owner(&self, owner_id: i64) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trips WHERE user_id = ?")
            .bind(owner_id)
            .fetch_one(&self.db)
            .await?;
        Ok(total)
    }
}
