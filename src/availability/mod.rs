//! Availability aggregation across all configured workshops.
//!
//! Workshops are filtered before any network traffic, fetched concurrently,
//! normalized per response format, then merged into one list sorted by
//! `(slot_datetime, id_workshop)`. A failing workshop only loses its own slots.

pub mod normalize;

use std::collections::HashSet;
use std::time::Instant;

use chrono::{Days, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;

use crate::config::Config;
use crate::metrics::{self, FetchOutcome};
use crate::models::slot::TimeSlot;
use crate::models::workshop::Workshop;
use crate::upstream::{FetchError, WorkshopClient};

/// Caller-supplied search parameters, as received on `/availability`.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    /// Comma-separated vehicle types; any overlap with a workshop's tags matches.
    pub vehicle_types: Option<String>,
    /// Comma-separated city names.
    pub cities: Option<String>,
    /// Exact workshop name, compared case-insensitively.
    pub workshop_name: Option<String>,
}

/// Workshop-level filters, normalized once per request.
#[derive(Debug, Default)]
struct WorkshopFilter {
    vehicle_types: Option<HashSet<String>>,
    cities: Option<HashSet<String>>,
    workshop_name: Option<String>,
}

impl WorkshopFilter {
    fn from_query(query: &AvailabilityQuery) -> Self {
        Self {
            vehicle_types: query.vehicle_types.as_deref().and_then(lowercase_set),
            cities: query.cities.as_deref().and_then(lowercase_set),
            workshop_name: query
                .workshop_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_lowercase),
        }
    }

    fn matches(&self, workshop: &Workshop) -> bool {
        if let Some(name) = &self.workshop_name {
            if workshop.name.to_lowercase() != *name {
                return false;
            }
        }
        if let Some(wanted) = &self.vehicle_types {
            if !workshop.vehicle_type_tags().any(|t| wanted.contains(&t)) {
                return false;
            }
        }
        if let Some(cities) = &self.cities {
            if !cities.contains(&workshop.city.trim().to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// `None` when the list holds nothing but separators, so `cities=` does not
/// filter everything out.
fn lowercase_set(raw: &str) -> Option<HashSet<String>> {
    let set: HashSet<String> = raw
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    (!set.is_empty()).then_some(set)
}

/// Fill `{date_from}` / `{date_to}` in an availability URL template.
pub fn availability_url(template: &str, date_from: NaiveDate, date_to: NaiveDate) -> String {
    template
        .replace("{date_from}", &date_from.format("%Y-%m-%d").to_string())
        .replace("{date_to}", &date_to.format("%Y-%m-%d").to_string())
}

#[derive(Clone)]
pub struct Aggregator {
    client: WorkshopClient,
    concurrency: usize,
}

impl Aggregator {
    pub fn new(client: WorkshopClient, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Ok(Self::new(WorkshopClient::from_config(config)?, config.fetch_concurrency))
    }

    /// Collect bookable slots from `workshops` (expected to be the active ones).
    pub async fn fetch(&self, workshops: Vec<Workshop>, query: &AvailabilityQuery) -> Vec<TimeSlot> {
        let filter = WorkshopFilter::from_query(query);
        let candidates: Vec<Workshop> = workshops
            .into_iter()
            .filter(|w| w.is_active && filter.matches(w))
            .collect();

        tracing::debug!(
            candidates = candidates.len(),
            date_from = %query.date_from,
            date_to = %query.date_to,
            "fetching workshop availability"
        );

        // Widen by a day on both ends: some workshop APIs treat the bounds as exclusive.
        let request_from = query.date_from.checked_sub_days(Days::new(1)).unwrap_or(query.date_from);
        let request_to = query.date_to.checked_add_days(Days::new(1)).unwrap_or(query.date_to);

        let per_workshop: Vec<Vec<TimeSlot>> = stream::iter(candidates)
            .map(|workshop| async move {
                let url = availability_url(&workshop.url_available_times, request_from, request_to);
                self.fetch_one(&workshop, &url).await
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let now = Utc::now().fixed_offset();
        let mut slots: Vec<TimeSlot> = per_workshop.into_iter().flatten().collect();
        normalize::retain_bookable(&mut slots, query.date_from, query.date_to, now);
        slots.sort_by(|a, b| {
            a.slot_datetime
                .cmp(&b.slot_datetime)
                .then(a.id_workshop.cmp(&b.id_workshop))
        });
        slots
    }

    /// Fetch and normalize a single workshop. Every failure is logged and
    /// turns into an empty list.
    async fn fetch_one(&self, workshop: &Workshop, url: &str) -> Vec<TimeSlot> {
        let started = Instant::now();
        let body = match self.client.fetch_text(url).await {
            Ok(body) => body,
            Err(e) => {
                let outcome = match e {
                    FetchError::Status(_) => FetchOutcome::HttpError,
                    FetchError::Transport(_) => FetchOutcome::TransportError,
                };
                metrics::record_fetch(outcome, started.elapsed().as_secs_f64());
                tracing::warn!(
                    workshop_id = workshop.id_workshop,
                    workshop = %workshop.name,
                    url,
                    "error fetching slots: {}",
                    e
                );
                return Vec::new();
            }
        };

        match normalize::parse_slots(workshop, &body) {
            Ok(slots) => {
                metrics::record_fetch(FetchOutcome::Ok, started.elapsed().as_secs_f64());
                slots
            }
            Err(e) => {
                metrics::record_fetch(FetchOutcome::ParseError, started.elapsed().as_secs_f64());
                tracing::warn!(
                    workshop_id = workshop.id_workshop,
                    workshop = %workshop.name,
                    response_type = %workshop.response_type,
                    "error collecting time slots: {}",
                    e
                );
                Vec::new()
            }
        }
    }
}
