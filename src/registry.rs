//! Workshop configuration registry: validation, sanitization and persistence
//! of workshop records. Every operation runs inside a caller-owned
//! [`UnitOfWork`].

use std::collections::BTreeSet;

use chrono::{Days, Local};

use crate::config::Config;
use crate::errors::AppError;
use crate::models::workshop::{FilterValues, ResponseFormat, Workshop, WorkshopFields};
use crate::sanitize::sanitize_fields;
use crate::store::sqlite::{self, NewWorkshop, UnitOfWork};

#[derive(Debug, Clone)]
pub struct Registry {
    vehicle_types: Vec<String>,
    booking_http_methods: Vec<String>,
    search_period_days: u64,
}

impl Registry {
    pub fn new(config: &Config) -> Self {
        Self {
            vehicle_types: config.vehicle_types.clone(),
            booking_http_methods: config.booking_http_methods.clone(),
            search_period_days: config.search_period_days.max(0) as u64,
        }
    }

    pub async fn list(&self, uow: &mut UnitOfWork, active_only: bool) -> Result<Vec<Workshop>, AppError> {
        Ok(sqlite::list_workshops(&mut **uow, active_only).await?)
    }

    pub async fn get(&self, uow: &mut UnitOfWork, id: i64) -> Result<Workshop, AppError> {
        sqlite::get_workshop(&mut **uow, id)
            .await?
            .ok_or(AppError::NotFound(id))
    }

    /// Lookup used for booking. Unknown and inactive ids both yield `None`.
    pub async fn find_active(&self, uow: &mut UnitOfWork, id: i64) -> Result<Option<Workshop>, AppError> {
        Ok(sqlite::get_workshop(&mut **uow, id)
            .await?
            .filter(|w| w.is_active))
    }

    pub async fn create(&self, uow: &mut UnitOfWork, fields: WorkshopFields) -> Result<Workshop, AppError> {
        let fields = self.prepare(fields)?;

        let response_type = require(fields.response_type, "response_type")?;
        let new = NewWorkshop {
            name: require(fields.name, "name")?,
            city: require(fields.city, "city")?,
            address: require(fields.address, "address")?,
            vehicle_types: require(fields.vehicle_types, "vehicle_types")?,
            url_available_times: require(fields.url_available_times, "url_available_times")?,
            response_type: parse_response_type(&response_type)?,
            url_booking: require(fields.url_booking, "url_booking")?,
            booking_http_method: require(fields.booking_http_method, "booking_http_method")?,
            booking_body: require(fields.booking_body, "booking_body")?,
        };

        let workshop = sqlite::insert_workshop(&mut **uow, &new).await?;
        tracing::info!(
            workshop_id = workshop.id_workshop,
            name = %workshop.name,
            "workshop created"
        );
        Ok(workshop)
    }

    pub async fn update(
        &self,
        uow: &mut UnitOfWork,
        id: i64,
        fields: WorkshopFields,
    ) -> Result<Workshop, AppError> {
        let fields = self.prepare(fields)?;
        let mut workshop = self.get(uow, id).await?;

        if let Some(v) = fields.name {
            workshop.name = v;
        }
        if let Some(v) = fields.city {
            workshop.city = v;
        }
        if let Some(v) = fields.address {
            workshop.address = v;
        }
        if let Some(v) = fields.vehicle_types {
            workshop.vehicle_types = v;
        }
        if let Some(v) = fields.url_available_times {
            workshop.url_available_times = v;
        }
        if let Some(v) = fields.response_type {
            workshop.response_type = parse_response_type(&v)?;
        }
        if let Some(v) = fields.url_booking {
            workshop.url_booking = v;
        }
        if let Some(v) = fields.booking_http_method {
            workshop.booking_http_method = v;
        }
        if let Some(v) = fields.booking_body {
            workshop.booking_body = v;
        }

        let updated = sqlite::update_workshop(&mut **uow, &workshop)
            .await?
            .ok_or(AppError::NotFound(id))?;
        tracing::info!(workshop_id = id, "workshop updated");
        Ok(updated)
    }

    /// Flip the active flag and return its new value.
    pub async fn toggle_active(&self, uow: &mut UnitOfWork, id: i64) -> Result<bool, AppError> {
        let is_active = sqlite::toggle_workshop(&mut **uow, id)
            .await?
            .ok_or(AppError::NotFound(id))?;
        tracing::info!(workshop_id = id, is_active, "workshop active flag toggled");
        Ok(is_active)
    }

    pub async fn filter_values(&self, uow: &mut UnitOfWork) -> Result<FilterValues, AppError> {
        let workshops = self.list(uow, false).await?;
        let cities: BTreeSet<String> = workshops.iter().map(|w| w.city.clone()).collect();
        let names: BTreeSet<String> = workshops.iter().map(|w| w.name.clone()).collect();

        let today = Local::now().date_naive();
        let default_date_to = today
            .checked_add_days(Days::new(self.search_period_days))
            .unwrap_or(today);

        Ok(FilterValues {
            default_date_from: today,
            default_date_to,
            vehicle_types: self.vehicle_types.clone(),
            cities: cities.into_iter().collect(),
            workshop_names: names.into_iter().collect(),
            booking_http_methods: self.booking_http_methods.clone(),
            response_types: ResponseFormat::ALL.to_vec(),
        })
    }

    /// Trim every field, check enumerations, then escape markup.
    fn prepare(&self, fields: WorkshopFields) -> Result<WorkshopFields, AppError> {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        let fields = WorkshopFields {
            name: trim(fields.name),
            city: trim(fields.city),
            address: trim(fields.address),
            vehicle_types: trim(fields.vehicle_types),
            url_available_times: trim(fields.url_available_times),
            response_type: trim(fields.response_type),
            url_booking: trim(fields.url_booking),
            booking_http_method: trim(fields.booking_http_method),
            booking_body: trim(fields.booking_body),
        };

        if let Some(vehicle_types) = &fields.vehicle_types {
            self.check_vehicle_types(vehicle_types)?;
        }
        if let Some(method) = &fields.booking_http_method {
            if !self.booking_http_methods.iter().any(|m| m == method) {
                return Err(AppError::Validation(format!(
                    "invalid booking HTTP method: {method}"
                )));
            }
        }
        if let Some(response_type) = &fields.response_type {
            parse_response_type(response_type)?;
        }

        Ok(sanitize_fields(fields))
    }

    fn check_vehicle_types(&self, raw: &str) -> Result<(), AppError> {
        let invalid: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .filter(|t| !self.vehicle_types.iter().any(|a| a.eq_ignore_ascii_case(t)))
            .collect();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "invalid vehicle types: {}",
                invalid.join(",")
            )))
        }
    }
}

fn require(value: Option<String>, field: &str) -> Result<String, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("missing field: {field}")))
}

fn parse_response_type(raw: &str) -> Result<ResponseFormat, AppError> {
    raw.parse::<ResponseFormat>()
        .map_err(|e| AppError::Validation(e.to_string()))
}
