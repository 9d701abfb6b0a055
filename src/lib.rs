//! Activity recording, keyword classification and usage analytics over a
//! single SQLite table, served as a small HTTP API.

pub mod analytics;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod request_id;
pub mod routes;
pub mod store;

#[cfg(test)]
mod tests;

pub use routes::{router, AppState};
