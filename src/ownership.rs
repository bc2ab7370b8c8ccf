use crate::{auth::AuthenticatedUser, models::trip::Trip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

/// Only the owner may see or touch a trip.
pub fn check_owner(trip: &Trip, caller: &AuthenticatedUser) -> Access {
    if trip.user_id == caller.id {
        Access::Allowed
    } else {
        Access::Denied
    }
}
