use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TripType {
    Economy,
    Regular,
    Premium,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::Economy => "economy",
            TripType::Regular => "regular",
            TripType::Premium => "premium",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "economy" => Some(TripType::Economy),
            "regular" => Some(TripType::Regular),
            "premium" => Some(TripType::Premium),
            _ => None,
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub origin: String,
    pub destination: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub trip_type: TripType,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated set of client-editable trip fields. The owner is never part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripInput {
    pub title: String,
    pub origin: String,
    pub destination: String,
    pub trip_type: TripType,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
}
