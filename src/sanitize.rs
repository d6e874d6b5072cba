//! Markup escaping for free-text workshop fields.
//!
//! Workshop names, cities and URLs are rendered by the booking dashboard, so
//! anything that could open a tag or break out of an attribute is escaped
//! before it is stored. Ampersands are left alone: URL templates legitimately
//! carry query strings such as `?from={date_from}&to={date_to}`.

use crate::models::workshop::WorkshopFields;

/// Escape `<`, `>`, `"` and `'` as HTML entities.
pub fn escape_markup(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).replace("&amp;", "&")
}

/// Escape every present field except `booking_body`, which is a template for
/// the downstream API and may contain markup on purpose.
pub fn sanitize_fields(fields: WorkshopFields) -> WorkshopFields {
    let esc = |v: Option<String>| v.map(|s| escape_markup(&s));
    WorkshopFields {
        name: esc(fields.name),
        city: esc(fields.city),
        address: esc(fields.address),
        vehicle_types: esc(fields.vehicle_types),
        url_available_times: esc(fields.url_available_times),
        response_type: esc(fields.response_type),
        url_booking: esc(fields.url_booking),
        booking_http_method: esc(fields.booking_http_method),
        booking_body: fields.booking_body,
    }
}
