//! SQLite persistence for capsules, fragments, analyses and deliveries.

pub mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
