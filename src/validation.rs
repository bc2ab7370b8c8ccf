//! Field-level checks applied to trip payloads before anything is written.
//!
//! Input strings are trimmed first, so whitespace-only values count as missing.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::trip::{TripInput, TripType};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 1000;

/// Field name to the list of human readable violations for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Reads one field as text. `Ok(None)` means missing, `Err(())` means the
/// value exists but cannot be treated as a string.
fn text_field(payload: &Map<String, Value>, field: &str) -> Result<Option<String>, ()> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(_) => Err(()),
    }
}

fn required(payload: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match text_field(payload, field) {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            errors.add(field, format!("The {field} field is required."));
            None
        }
        Err(()) => {
            errors.add(field, format!("The {field} must be a string."));
            None
        }
    }
}

/// Checks a raw JSON object against the trip schema.
///
/// Unknown keys are ignored, which is how a client-supplied `user_id` gets
/// dropped on the floor.
pub fn validate_trip(payload: &Map<String, Value>) -> Result<TripInput, FieldErrors> {
    let mut errors = FieldErrors::default();

    let title = required(payload, "title", &mut errors).filter(|title| {
        let len = title.chars().count();
        let fits = (TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len);
        if !fits {
            errors.add(
                "title",
                format!(
                    "The title must be between {TITLE_MIN_CHARS} and {TITLE_MAX_CHARS} characters."
                ),
            );
        }
        fits
    });
    let origin = required(payload, "origin", &mut errors);
    let destination = required(payload, "destination", &mut errors);
    let trip_type = required(payload, "type", &mut errors).and_then(|raw| {
        let parsed = TripType::parse(&raw);
        if parsed.is_none() {
            errors.add("type", "The selected type is invalid.");
        }
        parsed
    });
    let description = required(payload, "description", &mut errors);
    let start_date = required(payload, "start_date", &mut errors);
    let end_date = required(payload, "end_date", &mut errors);

    match (
        title,
        origin,
        destination,
        trip_type,
        description,
        start_date,
        end_date,
    ) {
        (
            Some(title),
            Some(origin),
            Some(destination),
            Some(trip_type),
            Some(description),
            Some(start_date),
            Some(end_date),
        ) if errors.is_empty() => Ok(TripInput {
            title,
            origin,
            destination,
            trip_type,
            description,
            start_date,
            end_date,
        }),
        _ => Err(errors),
    }
}
