use chrono::NaiveDate;
use ulid::Ulid;

use crate::validate::FieldError;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    NotFound(Ulid),
    /// A user with the same name and/or email already exists.
    DuplicateUser { name: String, email: String },
    /// Hotel still has rooms; delete them first.
    HasRooms(Ulid),
    /// User still has bookings; their rooms hold committed dates.
    HasBookings(Ulid),
    /// Arrival after departure.
    InvalidDateRange {
        arrival: NaiveDate,
        departure: NaiveDate,
    },
    /// A stay date that is not strictly in the future.
    PastDate(NaiveDate),
    /// The requested stay intersects the room's blocked dates.
    DateConflict { room_id: Ulid, date: NaiveDate },
    /// Field-level request validation failures.
    Invalid(Vec<FieldError>),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::DuplicateUser { name, email } => {
                write!(f, "user with name {name} and/or email {email} already registered")
            }
            EngineError::HasRooms(id) => write!(f, "cannot delete hotel {id}: has rooms"),
            EngineError::HasBookings(id) => write!(f, "cannot delete user {id}: has bookings"),
            EngineError::InvalidDateRange { arrival, departure } => {
                write!(f, "arrival {arrival} is after departure {departure}")
            }
            EngineError::PastDate(date) => write!(f, "{date} is not a future date"),
            EngineError::DateConflict { room_id, date } => {
                write!(f, "room {room_id} is already booked on {date}")
            }
            EngineError::Invalid(errors) => {
                write!(f, "invalid request:")?;
                for e in errors {
                    write!(f, " [{}: {}]", e.field, e.message)?;
                }
                Ok(())
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
