pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod ownership;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;
