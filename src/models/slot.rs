use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One bookable appointment time offered by a workshop.
///
/// Built fresh from a single workshop response on every availability request
/// and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id_workshop: i64,
    /// Numeric id or UUID, depending on the workshop's response format.
    pub id_slot: String,
    pub slot_datetime: DateTime<FixedOffset>,
}
