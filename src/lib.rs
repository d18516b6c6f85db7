//! # Green-form order fetch library
//!
//! Fetches verification documents for many orders at once against an
//! authenticated order service, keeping one bearer token alive across the
//! batch.
//!
//! Modules:
//! - `auth`: token model and the single-flight token lifecycle
//! - `store`: token persistence (memory, JSON file)
//! - `remote`: login and order-lookup RPCs over HTTP
//! - `orders`: identifier parsing, order records, per-item outcomes
//! - `fetch`: bounded fan-out, auth-failure retry pass, aggregation, progress
//! - `config`: YAML service configuration
//! - `server`: HTTP surface for lookups, progress and metrics

pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod helpers;
pub mod observability;
pub mod orders;
pub mod remote;
pub mod server;
pub mod store;
pub mod utils;

#[cfg(test)]
pub mod tests;
