use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Inclusive calendar-day range `[arrival, departure]` — the unit a stay is
/// requested in. A same-day stay (`arrival == departure`) covers one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
}

impl StayRange {
    pub fn new(arrival: NaiveDate, departure: NaiveDate) -> Self {
        Self { arrival, departure }
    }

    /// Number of calendar days covered, endpoints included.
    pub fn nights(&self) -> i64 {
        (self.departure - self.arrival).num_days() + 1
    }

    pub fn is_inverted(&self) -> bool {
        self.arrival > self.departure
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.arrival <= date && date <= self.departure
    }

    /// Every day of the stay, in order. Empty for inverted ranges.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        self.arrival
            .iter_days()
            .take_while(move |d| *d <= self.departure)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: Ulid,
    pub name: String,
    pub title: String,
    pub city: String,
    pub address: String,
    pub distance_from_center: f64,
    pub rating: f64,
    pub rating_count: u32,
}

/// A room row. References its hotel by id only — no back-pointers; joins go
/// through the engine's `rooms_by_hotel` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Ulid,
    pub hotel_id: Ulid,
    pub name: String,
    pub description: String,
    pub number: u32,
    pub price: f64,
    pub capacity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Guest,
    Admin,
}

impl UserRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GUEST" => Some(Self::Guest),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Ulid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// One reservation. Immutable once created — there is no reschedule or
/// cancel; the row only disappears when its room is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub room_id: Ulid,
    pub user_id: Ulid,
    pub stay: StayRange,
}

/// Per-room mutable state: the row itself plus the room's blocked-date set
/// and booking rows. The only shared mutable data in the system; always
/// accessed through the engine's per-room lock.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room: Room,
    /// One entry per calendar day already committed to some booking.
    pub blocked: BTreeSet<NaiveDate>,
    pub bookings: Vec<Booking>,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            blocked: BTreeSet::new(),
            bookings: Vec::new(),
        }
    }

    /// Record a booking and block every day it covers. Caller has already
    /// run the conflict check for this stay.
    pub fn apply_booking(&mut self, booking: Booking) {
        for day in booking.stay.days() {
            self.blocked.insert(day);
        }
        self.bookings.push(booking);
    }

    /// Invariant check: the blocked set is exactly the union of the day
    /// sequences of this room's bookings.
    pub fn blocked_is_consistent(&self) -> bool {
        let expected: BTreeSet<NaiveDate> =
            self.bookings.iter().flat_map(|b| b.stay.days()).collect();
        expected == self.blocked
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
///
/// `BookingCreated` does not carry the per-day blocked rows: they are a pure
/// function of the stay range and are recomputed on replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    HotelCreated { hotel: Hotel },
    HotelUpdated { hotel: Hotel },
    HotelDeleted { id: Ulid },
    RoomCreated { room: Room },
    RoomUpdated { room: Room },
    RoomDeleted { id: Ulid },
    UserRegistered { user: User },
    UserUpdated { user: User },
    UserDeleted { id: Ulid },
    BookingCreated {
        id: Ulid,
        room_id: Ulid,
        user_id: Ulid,
        stay: StayRange,
    },
}
