//! Booking dispatch: validate the caller's phone number, send the
//! workshop-specific booking request, and map the workshop's answer onto a
//! caller-facing [`BookingOutcome`].

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::metrics;
use crate::models::workshop::Workshop;
use crate::upstream::WorkshopClient;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]+$").expect("phone regex is valid"));

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingOutcome {
    pub status_code: u16,
    pub message: String,
}

impl BookingOutcome {
    fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("invalid phone number format")]
    Format,

    #[error("phone number length must be between 7 and 15 digits")]
    Length,
}

/// Validate a phone number and return it with spaces and hyphens removed.
pub fn validate_phone(raw: &str) -> Result<String, PhoneError> {
    let cleaned: String = raw.chars().filter(|c| *c != ' ' && *c != '-').collect();
    if !PHONE_RE.is_match(&cleaned) {
        return Err(PhoneError::Format);
    }
    let digits = cleaned.trim_start_matches('+').len();
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        return Err(PhoneError::Length);
    }
    Ok(cleaned)
}

#[derive(Clone)]
pub struct BookingDispatcher {
    client: WorkshopClient,
}

impl BookingDispatcher {
    pub fn new(client: WorkshopClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Ok(Self::new(WorkshopClient::from_config(config)?))
    }

    /// Book `slot_id` at `workshop`. `None` stands for a workshop that is
    /// unknown or inactive. Never fails; every problem becomes an outcome.
    pub async fn book(&self, workshop: Option<&Workshop>, slot_id: &str, phone: &str) -> BookingOutcome {
        let outcome = self.dispatch(workshop, slot_id, phone).await;
        metrics::record_booking(outcome.status_code);
        outcome
    }

    async fn dispatch(&self, workshop: Option<&Workshop>, slot_id: &str, phone: &str) -> BookingOutcome {
        let Some(workshop) = workshop.filter(|w| w.is_active) else {
            return BookingOutcome::new(400, "invalid workshop id");
        };
        if let Err(e) = validate_phone(phone) {
            return BookingOutcome::new(400, e.to_string());
        }

        let Ok(method) = Method::from_bytes(workshop.booking_http_method.as_bytes()) else {
            tracing::error!(
                workshop_id = workshop.id_workshop,
                method = %workshop.booking_http_method,
                "workshop has an unusable booking method"
            );
            return BookingOutcome::new(500, "unexpected booking error");
        };
        let url = workshop
            .url_booking
            .replace("{id}", &urlencoding::encode(slot_id));
        let body = workshop.booking_body.replace("{contact_info}", phone);

        tracing::info!(
            workshop_id = workshop.id_workshop,
            slot_id,
            %method,
            "sending booking request"
        );

        match self.client.send(method, &url, body).await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                match status {
                    200 => BookingOutcome::new(200, "booking successful"),
                    422 => BookingOutcome::new(422, "slot already booked"),
                    other => {
                        tracing::warn!(workshop_id = workshop.id_workshop, status = other, "booking rejected");
                        BookingOutcome::new(other, "booking error")
                    }
                }
            }
            Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                tracing::warn!(workshop_id = workshop.id_workshop, url = %url, "booking request failed: {}", e);
                BookingOutcome::new(500, "failed to reach booking service")
            }
            Err(e) => {
                tracing::error!(workshop_id = workshop.id_workshop, url = %url, "unexpected booking error: {}", e);
                BookingOutcome::new(500, "unexpected booking error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workshop::ResponseFormat;
    use std::time::Duration;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher() -> BookingDispatcher {
        BookingDispatcher::new(WorkshopClient::new(Duration::from_secs(2), None).unwrap())
    }

    fn workshop(base: &str, http_method: &str) -> Workshop {
        Workshop {
            id_workshop: 1,
            is_active: true,
            name: "Manchester Tyres".into(),
            city: "Manchester".into(),
            address: "14 Bury Rd".into(),
            vehicle_types: "Car,Truck".into(),
            url_available_times: format!("{base}/times/{{date_from}}/{{date_to}}"),
            response_type: ResponseFormat::JsonId,
            url_booking: format!("{base}/tire-change-times/{{id}}/booking"),
            booking_http_method: http_method.into(),
            booking_body: r#"{"contactInformation": "{contact_info}"}"#.into(),
        }
    }

    #[test]
    fn test_phone_validation() {
        assert_eq!(validate_phone("+372 5555-1234").unwrap(), "+37255551234");
        assert_eq!(validate_phone("1234567").unwrap(), "1234567");
        assert_eq!(validate_phone("+123456789012345").unwrap(), "+123456789012345");

        assert_eq!(validate_phone("123456"), Err(PhoneError::Length));
        assert_eq!(validate_phone("+123456"), Err(PhoneError::Length));
        assert_eq!(validate_phone("1234567890123456"), Err(PhoneError::Length));
        assert_eq!(validate_phone("12345abc"), Err(PhoneError::Format));
        assert_eq!(validate_phone("++1234567"), Err(PhoneError::Format));
        assert_eq!(validate_phone("123+4567"), Err(PhoneError::Format));
        assert_eq!(validate_phone(""), Err(PhoneError::Format));
    }

    #[tokio::test]
    async fn test_successful_booking_substitutes_templates() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/tire-change-times/abc-123/booking"))
            .and(body_string(r#"{"contactInformation": "+372 5555 1234"}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ws = workshop(&server.uri(), "PUT");
        let outcome = dispatcher().book(Some(&ws), "abc-123", "+372 5555 1234").await;

        assert_eq!(outcome, BookingOutcome::new(200, "booking successful"));
    }

    #[tokio::test]
    async fn test_slot_id_is_encoded_as_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tire-change-times/a%2Fb%3Fc%23d/booking"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ws = workshop(&server.uri(), "POST");
        let outcome = dispatcher().book(Some(&ws), "a/b?c#d", "5551234567").await;

        assert_eq!(outcome, BookingOutcome::new(200, "booking successful"));
    }

    #[tokio::test]
    async fn test_workshop_statuses_are_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tire-change-times/taken/booking"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tire-change-times/broken/booking"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let ws = workshop(&server.uri(), "POST");
        let d = dispatcher();

        assert_eq!(
            d.book(Some(&ws), "taken", "5551234567").await,
            BookingOutcome::new(422, "slot already booked")
        );
        assert_eq!(
            d.book(Some(&ws), "broken", "5551234567").await,
            BookingOutcome::new(503, "booking error")
        );
    }

    #[tokio::test]
    async fn test_missing_or_inactive_workshop_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut ws = workshop(&server.uri(), "POST");
        ws.is_active = false;
        let d = dispatcher();

        assert_eq!(
            d.book(None, "1", "5551234567").await,
            BookingOutcome::new(400, "invalid workshop id")
        );
        assert_eq!(
            d.book(Some(&ws), "1", "5551234567").await,
            BookingOutcome::new(400, "invalid workshop id")
        );
    }

    #[tokio::test]
    async fn test_bad_phone_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let ws = workshop(&server.uri(), "POST");
        let d = dispatcher();

        assert_eq!(
            d.book(Some(&ws), "1", "call me maybe").await,
            BookingOutcome::new(400, "invalid phone number format")
        );
        assert_eq!(
            d.book(Some(&ws), "1", "12-34").await,
            BookingOutcome::new(400, "phone number length must be between 7 and 15 digits")
        );
    }

    #[tokio::test]
    async fn test_unreachable_workshop() {
        // nothing listens on port 1
        let ws = workshop("http://127.0.0.1:1", "POST");
        let outcome = dispatcher().book(Some(&ws), "1", "5551234567").await;

        assert_eq!(outcome, BookingOutcome::new(500, "failed to reach booking service"));
    }

    #[tokio::test]
    async fn test_unusable_method_is_unexpected_error() {
        let ws = workshop("http://127.0.0.1:1", "NOT A METHOD");
        let outcome = dispatcher().book(Some(&ws), "1", "5551234567").await;

        assert_eq!(outcome, BookingOutcome::new(500, "unexpected booking error"));
    }
}
