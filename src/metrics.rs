//! Prometheus metrics for workshop traffic.
//!
//! Exposed at `/metrics` for scraping. Labels are kept to small closed sets
//! (outcome, status) so workshop churn does not grow cardinality.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_counter_vec, register_histogram_vec, CounterVec, Encoder,
    HistogramVec, TextEncoder,
};

static WORKSHOP_FETCHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!(
            "tirebook_workshop_fetches_total",
            "Availability fetches by outcome"
        ),
        &["outcome"]
    )
    .expect("failed to register tirebook_workshop_fetches_total")
});

static WORKSHOP_FETCH_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "tirebook_workshop_fetch_duration_seconds",
            "Latency of availability fetches in seconds",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
        ),
        &["outcome"]
    )
    .expect("failed to register tirebook_workshop_fetch_duration_seconds")
});

static BOOKINGS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!("tirebook_bookings_total", "Booking attempts by outcome status code"),
        &["status_code"]
    )
    .expect("failed to register tirebook_bookings_total")
});

/// Outcome label for one availability fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Ok,
    HttpError,
    TransportError,
    ParseError,
}

impl FetchOutcome {
    fn label(self) -> &'static str {
        match self {
            FetchOutcome::Ok => "ok",
            FetchOutcome::HttpError => "http_error",
            FetchOutcome::TransportError => "transport_error",
            FetchOutcome::ParseError => "parse_error",
        }
    }
}

pub fn record_fetch(outcome: FetchOutcome, elapsed_secs: f64) {
    WORKSHOP_FETCHES_TOTAL
        .with_label_values(&[outcome.label()])
        .inc();
    WORKSHOP_FETCH_DURATION_SECONDS
        .with_label_values(&[outcome.label()])
        .observe(elapsed_secs);
}

pub fn record_booking(status_code: u16) {
    BOOKINGS_TOTAL
        .with_label_values(&[&status_code.to_string()])
        .inc();
}

/// Encode all registered metrics as Prometheus text format.
/// Called by the `/metrics` HTTP handler.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_fetches_show_up_in_output() {
        record_fetch(FetchOutcome::ParseError, 0.2);
        record_booking(422);

        let output = encode_metrics();
        assert!(output.contains("tirebook_workshop_fetches_total"));
        assert!(output.contains(r#"outcome="parse_error""#));
        assert!(output.contains(r#"status_code="422""#));
    }
}
