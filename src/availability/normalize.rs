//! Turns a workshop's raw availability body into canonical [`TimeSlot`]s.
//!
//! Dispatch is on the workshop's [`ResponseFormat`]. Document-level failures
//! are returned as [`NormalizeError`] so the aggregator can log and skip the
//! workshop; individual bad XML entries are dropped silently.

use chrono::{DateTime, FixedOffset, NaiveDate};
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;
use thiserror::Error;

use crate::models::slot::TimeSlot;
use crate::models::workshop::{ResponseFormat, Workshop};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("invalid timestamp: {0}")]
    Timestamp(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SlotId {
    Text(String),
    Number(serde_json::Number),
}

impl SlotId {
    fn into_string(self) -> String {
        match self {
            SlotId::Text(s) => s,
            SlotId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonSlot {
    id: SlotId,
    time: String,
    #[serde(default = "default_available")]
    available: bool,
}

fn default_available() -> bool {
    true
}

/// Parse a workshop body according to its response format.
pub fn parse_slots(workshop: &Workshop, body: &str) -> Result<Vec<TimeSlot>, NormalizeError> {
    match workshop.response_type {
        ResponseFormat::JsonId => parse_json(workshop.id_workshop, body),
        ResponseFormat::XmlUuid => parse_xml(workshop.id_workshop, body),
    }
}

fn parse_json(id_workshop: i64, body: &str) -> Result<Vec<TimeSlot>, NormalizeError> {
    let items: Vec<JsonSlot> = serde_json::from_str(body)?;
    items
        .into_iter()
        .filter(|item| item.available)
        .map(|item| {
            Ok(TimeSlot {
                id_workshop,
                id_slot: item.id.into_string(),
                slot_datetime: parse_timestamp(&item.time)?,
            })
        })
        .collect()
}

/// An `availableTime` element still being read.
struct OpenEntry {
    level: usize,
    uuid: Option<String>,
    time: Option<String>,
}

/// A `uuid` or `time` child whose text is being collected.
struct OpenField {
    level: usize,
    is_uuid: bool,
    text: String,
}

fn xml_error(reader: &Reader<&[u8]>, source: impl Into<quick_xml::Error>) -> NormalizeError {
    NormalizeError::Xml {
        position: reader.error_position(),
        source: source.into(),
    }
}

fn parse_xml(id_workshop: i64, body: &str) -> Result<Vec<TimeSlot>, NormalizeError> {
    let mut reader = Reader::from_str(body);

    let mut slots = Vec::new();
    let mut open: Vec<OpenEntry> = Vec::new();
    let mut field: Option<OpenField> = None;
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| xml_error(&reader, e))?;
        match event {
            Event::Start(e) => {
                let is_direct_child = field.is_none()
                    && open.last().is_some_and(|entry| entry.level == depth);
                depth += 1;
                match e.local_name().as_ref() {
                    b"availableTime" => open.push(OpenEntry {
                        level: depth,
                        uuid: None,
                        time: None,
                    }),
                    name @ (b"uuid" | b"time") if is_direct_child => {
                        field = Some(OpenField {
                            level: depth,
                            is_uuid: name == b"uuid",
                            text: String::new(),
                        });
                    }
                    _ => (),
                }
            }
            Event::Text(e) => {
                if let Some(f) = field.as_mut().filter(|f| f.level == depth) {
                    f.text.push_str(&e.decode().map_err(|err| xml_error(&reader, err))?);
                }
            }
            Event::CData(e) => {
                if let Some(f) = field.as_mut().filter(|f| f.level == depth) {
                    f.text.push_str(&e.decode().map_err(|err| xml_error(&reader, err))?);
                }
            }
            Event::GeneralRef(e) => {
                if let Some(f) = field.as_mut().filter(|f| f.level == depth) {
                    match e.resolve_char_ref().map_err(|err| xml_error(&reader, err))? {
                        Some(ch) => f.text.push(ch),
                        None => {
                            let entity = format!("&{};", e.decode().map_err(|err| xml_error(&reader, err))?);
                            // unknown named entities are kept as written
                            let resolved = unescape(&entity).map(|c| c.into_owned()).unwrap_or(entity);
                            f.text.push_str(&resolved);
                        }
                    }
                }
            }
            Event::End(_) => {
                if field.as_ref().is_some_and(|f| f.level == depth) {
                    if let (Some(f), Some(entry)) = (field.take(), open.last_mut()) {
                        let text = f.text.trim();
                        let target = if f.is_uuid { &mut entry.uuid } else { &mut entry.time };
                        if target.is_none() && !text.is_empty() {
                            *target = Some(text.to_string());
                        }
                    }
                } else if open.last().is_some_and(|entry| entry.level == depth) {
                    if let Some(entry) = open.pop() {
                        if let Some(slot) = finish_entry(id_workshop, entry) {
                            slots.push(slot);
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => (),
        }
    }

    Ok(slots)
}

fn finish_entry(id_workshop: i64, entry: OpenEntry) -> Option<TimeSlot> {
    let (uuid, time) = (entry.uuid?, entry.time?);
    match parse_timestamp(&time) {
        Ok(slot_datetime) => Some(TimeSlot {
            id_workshop,
            id_slot: uuid,
            slot_datetime,
        }),
        Err(e) => {
            tracing::debug!(workshop_id = id_workshop, uuid = %uuid, "skipping XML slot: {}", e);
            None
        }
    }
}

/// Parse an ISO-8601 timestamp carrying an explicit offset. A trailing `Z`
/// is read as `+00:00`.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, NormalizeError> {
    let raw = raw.trim();
    let normalized = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(rest) => format!("{rest}+00:00"),
        None => raw.to_string(),
    };

    DateTime::parse_from_rfc3339(&normalized)
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z"))
        .map_err(|_| NormalizeError::Timestamp(raw.to_string()))
}

/// Keep slots dated within `[date_from, date_to]` (by the date in the slot's
/// own offset) and strictly after `now`.
pub fn retain_bookable(
    slots: &mut Vec<TimeSlot>,
    date_from: NaiveDate,
    date_to: NaiveDate,
    now: DateTime<FixedOffset>,
) {
    slots.retain(|slot| {
        let date = slot.slot_datetime.date_naive();
        date_from <= date && date <= date_to && slot.slot_datetime > now
    });
}
