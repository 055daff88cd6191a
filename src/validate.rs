//! Explicit request validation, replacing annotation-driven checks: each
//! request struct validates itself and reports every failing field at once.

use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::*;
use crate::model::{StayRange, UserRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn require_text(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: &str,
    max_len: usize,
) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    } else if value.len() > max_len {
        errors.push(FieldError::new(field, format!("longer than {max_len} bytes")));
    }
}

// ── Booking ──────────────────────────────────────────────

/// A raw booking request as it arrives from the outside: everything
/// optional, nothing trusted.
#[derive(Debug, Clone, Default)]
pub struct BookingRequest {
    pub room_id: Option<Ulid>,
    pub user_id: Option<Ulid>,
    pub arrival: Option<NaiveDate>,
    pub departure: Option<NaiveDate>,
}

/// A booking request that passed field validation.
#[derive(Debug, Clone, Copy)]
pub struct BookingParams {
    pub room_id: Ulid,
    pub user_id: Ulid,
    pub stay: StayRange,
}

impl BookingRequest {
    /// Presence checks only; the future-date and range rules live with the
    /// engine's date validation so they share one definition of "today".
    pub fn validate(&self) -> Result<BookingParams, Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.arrival.is_none() {
            errors.push(FieldError::new("arrival_date", "arrival date is required"));
        }
        if self.departure.is_none() {
            errors.push(FieldError::new("departure_date", "departure date is required"));
        }
        if self.room_id.is_none() {
            errors.push(FieldError::new("room_id", "room id is required"));
        }
        if self.user_id.is_none() {
            errors.push(FieldError::new("user_id", "user id is required"));
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(BookingParams {
            room_id: self.room_id.unwrap(),
            user_id: self.user_id.unwrap(),
            stay: StayRange::new(self.arrival.unwrap(), self.departure.unwrap()),
        })
    }
}

// ── Hotel ────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct UpsertHotel {
    pub name: Option<String>,
    pub title: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub distance_from_center: Option<f64>,
}

impl UpsertHotel {
    /// `creating` requires every field; updates may leave fields unset and
    /// keep the current value.
    pub fn validate(&self, creating: bool) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_text(&mut errors, creating, "name", &self.name, MAX_NAME_LEN);
        check_text(&mut errors, creating, "title", &self.title, MAX_TEXT_LEN);
        check_text(&mut errors, creating, "city", &self.city, MAX_NAME_LEN);
        check_text(&mut errors, creating, "address", &self.address, MAX_TEXT_LEN);
        if let Some(d) = self.distance_from_center
            && !(d >= 0.0) {
                errors.push(FieldError::new(
                    "distance_from_center",
                    "must be a non-negative number",
                ));
            }
        if creating && self.distance_from_center.is_none() {
            errors.push(FieldError::new("distance_from_center", "is required"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

// ── Room ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct UpsertRoom {
    pub hotel_id: Option<Ulid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub number: Option<u32>,
    pub price: Option<f64>,
    pub capacity: Option<u8>,
}

impl UpsertRoom {
    pub fn validate(&self, creating: bool) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_text(&mut errors, creating, "name", &self.name, MAX_NAME_LEN);
        check_text(
            &mut errors,
            creating,
            "description",
            &self.description,
            MAX_TEXT_LEN,
        );
        if creating && self.hotel_id.is_none() {
            errors.push(FieldError::new("hotel_id", "hotel id is required"));
        }
        if creating && self.number.is_none() {
            errors.push(FieldError::new("number", "is required"));
        }
        match self.price {
            Some(p) if !(p > 0.0) => {
                errors.push(FieldError::new("price", "must be a positive number"))
            }
            None if creating => errors.push(FieldError::new("price", "is required")),
            _ => {}
        }
        match self.capacity {
            Some(0) => errors.push(FieldError::new("capacity", "must be at least 1")),
            None if creating => errors.push(FieldError::new("capacity", "is required")),
            _ => {}
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

// ── User ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct UpsertUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl UpsertUser {
    pub fn validate(&self, creating: bool) -> Result<Option<UserRole>, Vec<FieldError>> {
        let mut errors = Vec::new();
        check_text(&mut errors, creating, "name", &self.name, MAX_NAME_LEN);
        check_text(&mut errors, creating, "password", &self.password, MAX_NAME_LEN);
        match &self.email {
            Some(e) => {
                require_text(&mut errors, "email", e, MAX_NAME_LEN);
                if !e.contains('@') {
                    errors.push(FieldError::new("email", "must be an email address"));
                }
            }
            None if creating => errors.push(FieldError::new("email", "is required")),
            None => {}
        }
        let role = match &self.role {
            Some(r) => match UserRole::parse(r) {
                Some(role) => Some(role),
                None => {
                    errors.push(FieldError::new("role", format!("unknown role: {r}")));
                    None
                }
            },
            None if creating => {
                errors.push(FieldError::new("role", "is required"));
                None
            }
            None => None,
        };
        if errors.is_empty() { Ok(role) } else { Err(errors) }
    }
}

fn check_text(
    errors: &mut Vec<FieldError>,
    creating: bool,
    field: &'static str,
    value: &Option<String>,
    max_len: usize,
) {
    match value {
        Some(v) => require_text(errors, field, v, max_len),
        None if creating => errors.push(FieldError::new(field, "is required")),
        None => {}
    }
}
