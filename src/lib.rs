//! Tire-change booking service: aggregates appointment availability across
//! third-party workshop APIs and forwards bookings to them.
//!
//! The binary in `main.rs` wires these modules together; integration tests
//! in `tests/` drive the router directly.

pub mod api;
pub mod availability;
pub mod booking;
pub mod cli;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod sanitize;
pub mod store;
pub mod upstream;

use availability::Aggregator;
use booking::BookingDispatcher;
use registry::Registry;
use store::sqlite::SqliteStore;

/// Shared application state passed to handlers.
pub struct AppState {
    pub db: SqliteStore,
    pub registry: Registry,
    pub aggregator: Aggregator,
    pub dispatcher: BookingDispatcher,
    pub config: config::Config,
}

impl AppState {
    pub fn new(db: SqliteStore, config: config::Config) -> anyhow::Result<Self> {
        Ok(Self {
            registry: Registry::new(&config),
            aggregator: Aggregator::from_config(&config)?,
            dispatcher: BookingDispatcher::from_config(&config)?,
            db,
            config,
        })
    }
}
