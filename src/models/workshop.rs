use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Wire encoding a workshop uses for its availability endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseFormat {
    /// JSON array of `{id, time, available?}` objects.
    #[serde(rename = "JSON_id")]
    JsonId,
    /// XML document with `availableTime` elements carrying `uuid` and `time`.
    #[serde(rename = "XML_uuid")]
    XmlUuid,
}

impl ResponseFormat {
    pub const ALL: [ResponseFormat; 2] = [ResponseFormat::JsonId, ResponseFormat::XmlUuid];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::JsonId => "JSON_id",
            ResponseFormat::XmlUuid => "XML_uuid",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid response type: {0}")]
pub struct UnknownResponseFormat(pub String);

impl FromStr for ResponseFormat {
    type Err = UnknownResponseFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResponseFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownResponseFormat(s.to_string()))
    }
}

impl TryFrom<String> for ResponseFormat {
    type Error = UnknownResponseFormat;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A configured third-party workshop, one row of the `workshops` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workshop {
    pub id_workshop: i64,
    pub is_active: bool,
    pub name: String,
    pub city: String,
    pub address: String,
    /// Comma-separated vehicle-type tags, e.g. `Car,Truck`.
    pub vehicle_types: String,
    /// Availability URL template with `{date_from}` and `{date_to}` placeholders.
    pub url_available_times: String,
    #[sqlx(try_from = "String")]
    pub response_type: ResponseFormat,
    /// Booking URL template with an `{id}` placeholder.
    pub url_booking: String,
    pub booking_http_method: String,
    /// Booking body template with a `{contact_info}` placeholder. Stored verbatim.
    pub booking_body: String,
}

impl Workshop {
    /// Lower-cased, trimmed vehicle-type tags.
    pub fn vehicle_type_tags(&self) -> impl Iterator<Item = String> + '_ {
        self.vehicle_types
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
    }
}

/// Workshop fields as supplied by a caller. `create` requires every field,
/// `update` applies only the ones present.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkshopFields {
    pub name: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub vehicle_types: Option<String>,
    pub url_available_times: Option<String>,
    pub response_type: Option<String>,
    pub url_booking: Option<String>,
    pub booking_http_method: Option<String>,
    pub booking_body: Option<String>,
}

/// Values the booking UI needs to populate its search and edit forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterValues {
    pub default_date_from: NaiveDate,
    pub default_date_to: NaiveDate,
    pub vehicle_types: Vec<String>,
    pub cities: Vec<String>,
    pub workshop_names: Vec<String>,
    pub booking_http_methods: Vec<String>,
    pub response_types: Vec<ResponseFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_format_tags() {
        assert_eq!("JSON_id".parse::<ResponseFormat>().unwrap(), ResponseFormat::JsonId);
        assert_eq!("XML_uuid".parse::<ResponseFormat>().unwrap(), ResponseFormat::XmlUuid);
        assert!("json_id".parse::<ResponseFormat>().is_err());
        assert_eq!(
            serde_json::to_value(ResponseFormat::XmlUuid).unwrap(),
            serde_json::json!("XML_uuid")
        );
    }

    #[test]
    fn test_vehicle_type_tags_are_normalized() {
        let workshop = Workshop {
            id_workshop: 1,
            is_active: true,
            name: "Manchester".into(),
            city: "Manchester".into(),
            address: "14 Bury New Rd".into(),
            vehicle_types: "Car, TRUCK,".into(),
            url_available_times: "http://localhost/{date_from}/{date_to}".into(),
            response_type: ResponseFormat::JsonId,
            url_booking: "http://localhost/{id}".into(),
            booking_http_method: "POST".into(),
            booking_body: "{contact_info}".into(),
        };
        let tags: Vec<String> = workshop.vehicle_type_tags().collect();
        assert_eq!(tags, vec!["car", "truck"]);
    }
}
