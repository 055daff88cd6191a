use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::is_available;
use super::conflict::{today, validate_future, validate_range};
use super::{Engine, EngineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    fn validate(&self) -> Result<(), EngineError> {
        if self.size == 0 || self.size > MAX_PAGE_SIZE {
            return Err(EngineError::LimitExceeded("page size out of range"));
        }
        Ok(())
    }

    fn slice<T>(&self, mut rows: Vec<T>) -> Vec<T> {
        let start = self.number.saturating_mul(self.size);
        if start >= rows.len() {
            return Vec::new();
        }
        rows.drain(..start);
        rows.truncate(self.size);
        rows
    }
}

#[derive(Debug, Clone, Default)]
pub struct HotelFilter {
    pub id: Option<Ulid>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub max_distance: Option<f64>,
    pub min_rating: Option<f64>,
    pub page: Page,
}

#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub id: Option<Ulid>,
    pub name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub guests: Option<u8>,
    pub hotel_id: Option<Ulid>,
    /// With `departure`, restricts to rooms free for the whole stay.
    pub arrival: Option<NaiveDate>,
    pub departure: Option<NaiveDate>,
    pub page: Page,
}

fn text_matches(needle: &Option<String>, hay: &str) -> bool {
    match needle {
        Some(n) => hay.to_lowercase().contains(&n.to_lowercase()),
        None => true,
    }
}

impl Engine {
    // ── Hotels ───────────────────────────────────────────

    pub fn get_hotel(&self, id: Ulid) -> Result<Hotel, EngineError> {
        self.hotels
            .get(&id)
            .map(|h| h.value().clone())
            .ok_or(EngineError::NotFound(id))
    }

    pub fn list_hotels(&self, filter: &HotelFilter) -> Result<Vec<Hotel>, EngineError> {
        filter.page.validate()?;
        let mut rows: Vec<Hotel> = self
            .hotels
            .iter()
            .filter(|h| {
                filter.id.is_none_or(|id| id == h.id)
                    && text_matches(&filter.name, &h.name)
                    && text_matches(&filter.title, &h.title)
                    && text_matches(&filter.city, &h.city)
                    && text_matches(&filter.address, &h.address)
                    && filter.max_distance.is_none_or(|d| h.distance_from_center <= d)
                    && filter.min_rating.is_none_or(|r| h.rating >= r)
            })
            .map(|h| h.value().clone())
            .collect();
        // ULIDs order by creation time, which gives paging a stable order.
        rows.sort_by_key(|h| h.id);
        Ok(filter.page.slice(rows))
    }

    // ── Rooms ────────────────────────────────────────────

    pub async fn get_room(&self, id: Ulid) -> Result<Room, EngineError> {
        let rs = self.get_room_state(&id).ok_or(EngineError::NotFound(id))?;
        let guard = rs.read().await;
        Ok(guard.room.clone())
    }

    pub async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>, EngineError> {
        self.list_rooms_as_of(filter, today()).await
    }

    /// Room search. When a date pair is present it is validated with the
    /// same rules as booking creation, then used as an availability
    /// constraint.
    pub async fn list_rooms_as_of(
        &self,
        filter: &RoomFilter,
        today: NaiveDate,
    ) -> Result<Vec<Room>, EngineError> {
        filter.page.validate()?;
        let stay = match (filter.arrival, filter.departure) {
            (Some(arrival), Some(departure)) => {
                let stay = StayRange::new(arrival, departure);
                validate_range(&stay)?;
                validate_future(&stay, today)?;
                Some(stay)
            }
            _ => None,
        };

        let candidates: Vec<_> = match filter.hotel_id {
            // Join through the hotel index rather than scanning the table.
            Some(hid) => self
                .rooms_by_hotel
                .get(&hid)
                .map(|ids| ids.clone())
                .unwrap_or_default()
                .iter()
                .filter_map(|id| self.get_room_state(id))
                .collect(),
            None => self.rooms.iter().map(|e| e.value().clone()).collect(),
        };

        let mut rows = Vec::new();
        for rs in candidates {
            let guard = rs.read().await;
            let room = &guard.room;
            let keep = filter.id.is_none_or(|id| id == room.id)
                && text_matches(&filter.name, &room.name)
                && filter.min_price.is_none_or(|p| room.price >= p)
                && filter.max_price.is_none_or(|p| room.price <= p)
                && filter.guests.is_none_or(|g| room.capacity >= g)
                && stay
                    .as_ref()
                    .is_none_or(|s| is_available(&guard.blocked, s));
            if keep {
                rows.push(room.clone());
            }
        }
        rows.sort_by_key(|r| r.id);
        Ok(filter.page.slice(rows))
    }

    /// The room's committed blocked dates, ascending.
    pub async fn blocked_dates(&self, room_id: Ulid) -> Result<Vec<NaiveDate>, EngineError> {
        let rs = self
            .get_room_state(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let guard = rs.read().await;
        Ok(guard.blocked.iter().copied().collect())
    }

    // ── Users ────────────────────────────────────────────

    pub fn get_user(&self, id: Ulid) -> Result<User, EngineError> {
        self.users
            .get(&id)
            .map(|u| u.value().clone())
            .ok_or(EngineError::NotFound(id))
    }

    pub fn find_user_by_name(&self, name: &str) -> Option<User> {
        self.users.iter().find(|u| u.name == name).map(|u| u.value().clone())
    }

    pub fn list_users(&self, page: &Page) -> Result<Vec<User>, EngineError> {
        page.validate()?;
        let mut rows: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        rows.sort_by_key(|u| u.id);
        Ok(page.slice(rows))
    }

    // ── Bookings ─────────────────────────────────────────

    pub async fn get_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let room_id = self
            .booking_to_room
            .get(&id)
            .map(|e| *e.value())
            .ok_or(EngineError::NotFound(id))?;
        let rs = self
            .get_room_state(&room_id)
            .ok_or(EngineError::NotFound(id))?;
        let guard = rs.read().await;
        guard
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    pub async fn list_bookings(&self, page: &Page) -> Result<Vec<Booking>, EngineError> {
        page.validate()?;
        let states: Vec<_> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut rows = Vec::new();
        for rs in states {
            let guard = rs.read().await;
            rows.extend(guard.bookings.iter().cloned());
        }
        rows.sort_by_key(|b| b.id);
        Ok(page.slice(rows))
    }

    /// Table sizes, for startup logging and gauges.
    pub fn table_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.hotels.len(),
            self.rooms.len(),
            self.users.len(),
            self.booking_to_room.len(),
        )
    }
}
