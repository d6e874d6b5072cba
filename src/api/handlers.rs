use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityQuery;
use crate::booking::{self, BookingOutcome};
use crate::errors::AppError;
use crate::models::slot::TimeSlot;
use crate::models::workshop::{FilterValues, Workshop, WorkshopFields};
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct BookingParams {
    pub id_workshop: i64,
    pub customer_phone: String,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub is_active: bool,
}

// ── Availability & booking ───────────────────────────────────

/// GET /availability: merged, sorted slots across matching active workshops
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    let Query(query) = query?;
    if query.date_to < query.date_from {
        return Err(AppError::Validation(
            "date_to must not be before date_from".into(),
        ));
    }

    // Read the registry up front; the unit of work is closed before any workshop is called.
    let mut uow = state.db.begin().await?;
    let workshops = state.registry.list(&mut uow, true).await?;
    uow.commit().await?;

    let slots = state.aggregator.fetch(workshops, &query).await;
    Ok(Json(slots))
}

/// POST /bookings/:id_slot: book a slot at a workshop
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Path(id_slot): Path<String>,
    params: Result<Query<BookingParams>, QueryRejection>,
) -> Result<Json<BookingOutcome>, AppError> {
    let Query(params) = params?;
    booking::validate_phone(&params.customer_phone)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut uow = state.db.begin().await?;
    let workshop = state.registry.find_active(&mut uow, params.id_workshop).await?;
    uow.commit().await?;

    let outcome = state
        .dispatcher
        .book(workshop.as_ref(), &id_slot, &params.customer_phone)
        .await;
    Ok(Json(outcome))
}

// ── Workshop registry ────────────────────────────────────────

/// GET /workshops: every stored workshop, active or not
pub async fn list_workshops(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Workshop>>, AppError> {
    let mut uow = state.db.begin().await?;
    let workshops = state.registry.list(&mut uow, false).await?;
    uow.commit().await?;
    Ok(Json(workshops))
}

/// GET /workshops/filters
pub async fn get_filter_values(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FilterValues>, AppError> {
    let mut uow = state.db.begin().await?;
    let values = state.registry.filter_values(&mut uow).await?;
    uow.commit().await?;
    Ok(Json(values))
}

/// POST /workshops
pub async fn create_workshop(
    State(state): State<Arc<AppState>>,
    fields: Result<Json<WorkshopFields>, JsonRejection>,
) -> Result<Json<Workshop>, AppError> {
    let Json(fields) = fields?;
    let mut uow = state.db.begin().await?;
    let workshop = state.registry.create(&mut uow, fields).await?;
    uow.commit().await?;
    Ok(Json(workshop))
}

/// PUT /workshops/:id: partial update
pub async fn update_workshop(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    fields: Result<Json<WorkshopFields>, JsonRejection>,
) -> Result<Json<Workshop>, AppError> {
    let Path(id) = id?;
    let Json(fields) = fields?;
    let mut uow = state.db.begin().await?;
    let workshop = state.registry.update(&mut uow, id, fields).await?;
    uow.commit().await?;
    Ok(Json(workshop))
}

/// POST /workshops/:id/toggle-active
pub async fn toggle_workshop(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ToggleResponse>, AppError> {
    let Path(id) = id?;
    let mut uow = state.db.begin().await?;
    let is_active = state.registry.toggle_active(&mut uow, id).await?;
    uow.commit().await?;
    Ok(Json(ToggleResponse {
        success: true,
        is_active,
    }))
}

// ── Operational ──────────────────────────────────────────────

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::encode_metrics(),
    )
}
