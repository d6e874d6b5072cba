use std::time::Duration;

use serde::Deserialize;

/// Process-wide settings, loaded once at startup and injected into the
/// registry, the workshop client and the HTTP layer.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Timeout applied to every outbound workshop call (availability and booking).
    pub workshop_timeout_secs: u64,
    /// Upper bound on availability fetches running at the same time.
    pub fetch_concurrency: usize,
    /// Length of the default search window offered by `/workshops/filters`.
    pub search_period_days: i64,
    /// Allowed vehicle-type tags. Matched case-insensitively.
    pub vehicle_types: Vec<String>,
    /// Allowed HTTP methods for workshop booking endpoints. Matched exactly.
    pub booking_http_methods: Vec<String>,
    /// When set, `//localhost` in workshop URLs is rewritten to `//<alias>`.
    /// Used when the service runs in a container and the workshop APIs on the host.
    pub localhost_alias: Option<String>,
    pub dashboard_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            database_url: "sqlite://tirebook.db".into(),
            workshop_timeout_secs: 10,
            fetch_concurrency: 8,
            search_period_days: 7,
            vehicle_types: vec!["Car".into(), "Truck".into()],
            booking_http_methods: vec!["POST".into(), "PUT".into()],
            localhost_alias: None,
            dashboard_origin: "http://localhost:8080".into(),
        }
    }
}

impl Config {
    pub fn workshop_timeout(&self) -> Duration {
        Duration::from_secs(self.workshop_timeout_secs)
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_vars(|key| std::env::var(key).ok())
}

/// Build a [`Config`] from an arbitrary variable source. Unparsable numbers
/// fall back to their defaults; empty allowed-value lists are rejected.
pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
    let defaults = Config::default();

    let vehicle_types = get("TIREBOOK_VEHICLE_TYPES")
        .map(|v| split_list(&v))
        .unwrap_or(defaults.vehicle_types);
    if vehicle_types.is_empty() {
        anyhow::bail!("TIREBOOK_VEHICLE_TYPES must list at least one vehicle type");
    }

    let booking_http_methods = get("TIREBOOK_BOOKING_METHODS")
        .map(|v| split_list(&v).into_iter().map(|m| m.to_uppercase()).collect::<Vec<_>>())
        .unwrap_or(defaults.booking_http_methods);
    if booking_http_methods.is_empty() {
        anyhow::bail!("TIREBOOK_BOOKING_METHODS must list at least one HTTP method");
    }

    Ok(Config {
        port: get("TIREBOOK_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port),
        database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
        workshop_timeout_secs: get("WORKSHOP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .unwrap_or(defaults.workshop_timeout_secs),
        fetch_concurrency: get("WORKSHOP_FETCH_CONCURRENCY")
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.fetch_concurrency),
        search_period_days: get("TIREBOOK_SEARCH_PERIOD_DAYS")
            .and_then(|v| v.parse().ok())
            .filter(|days: &i64| *days >= 0)
            .unwrap_or(defaults.search_period_days),
        vehicle_types,
        booking_http_methods,
        localhost_alias: get("TIREBOOK_LOCALHOST_ALIAS")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
        dashboard_origin: get("DASHBOARD_ORIGIN").unwrap_or(defaults.dashboard_origin),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
