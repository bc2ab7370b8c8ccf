pub mod trip_store;
pub mod trips;
