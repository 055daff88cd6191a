use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{RwLock, oneshot};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;
use crate::validate::{BookingRequest, UpsertHotel, UpsertRoom, UpsertUser};

use super::availability::check_and_expand;
use super::conflict::{today, validate_future, validate_range};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    // ── Hotels ───────────────────────────────────────────

    pub async fn create_hotel(&self, upsert: UpsertHotel) -> Result<Hotel, EngineError> {
        upsert.validate(true).map_err(EngineError::Invalid)?;
        if self.hotels.len() >= MAX_HOTELS {
            return Err(EngineError::LimitExceeded("too many hotels"));
        }
        let hotel = Hotel {
            id: Ulid::new(),
            name: upsert.name.unwrap(),
            title: upsert.title.unwrap(),
            city: upsert.city.unwrap(),
            address: upsert.address.unwrap(),
            distance_from_center: upsert.distance_from_center.unwrap(),
            rating: 0.0,
            rating_count: 0,
        };
        let event = Event::HotelCreated {
            hotel: hotel.clone(),
        };
        self.wal_append(&event).await?;
        self.hotels.insert(hotel.id, hotel.clone());
        Ok(hotel)
    }

    /// Partial update: unset fields keep their current value.
    pub async fn update_hotel(&self, id: Ulid, upsert: UpsertHotel) -> Result<Hotel, EngineError> {
        upsert.validate(false).map_err(EngineError::Invalid)?;
        let mut hotel = self
            .hotels
            .get(&id)
            .map(|h| h.value().clone())
            .ok_or(EngineError::NotFound(id))?;
        if let Some(name) = upsert.name {
            hotel.name = name;
        }
        if let Some(title) = upsert.title {
            hotel.title = title;
        }
        if let Some(city) = upsert.city {
            hotel.city = city;
        }
        if let Some(address) = upsert.address {
            hotel.address = address;
        }
        if let Some(distance) = upsert.distance_from_center {
            hotel.distance_from_center = distance;
        }
        let event = Event::HotelUpdated {
            hotel: hotel.clone(),
        };
        self.wal_append(&event).await?;
        self.hotels.insert(id, hotel.clone());
        Ok(hotel)
    }

    pub async fn delete_hotel(&self, id: Ulid) -> Result<(), EngineError> {
        if !self.hotels.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        if let Some(rooms) = self.rooms_by_hotel.get(&id)
            && !rooms.is_empty()
        {
            return Err(EngineError::HasRooms(id));
        }
        let event = Event::HotelDeleted { id };
        self.wal_append(&event).await?;
        self.hotels.remove(&id);
        self.rooms_by_hotel.remove(&id);
        Ok(())
    }

    // ── Rooms ────────────────────────────────────────────

    pub async fn create_room(&self, upsert: UpsertRoom) -> Result<Room, EngineError> {
        upsert.validate(true).map_err(EngineError::Invalid)?;
        if self.rooms.len() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        let hotel_id = upsert.hotel_id.unwrap();
        if !self.hotels.contains_key(&hotel_id) {
            return Err(EngineError::NotFound(hotel_id));
        }
        if let Some(siblings) = self.rooms_by_hotel.get(&hotel_id)
            && siblings.len() >= MAX_ROOMS_PER_HOTEL
        {
            return Err(EngineError::LimitExceeded("too many rooms in hotel"));
        }
        let room = Room {
            id: Ulid::new(),
            hotel_id,
            name: upsert.name.unwrap(),
            description: upsert.description.unwrap(),
            number: upsert.number.unwrap(),
            price: upsert.price.unwrap(),
            capacity: upsert.capacity.unwrap(),
        };
        let event = Event::RoomCreated { room: room.clone() };
        self.wal_append(&event).await?;
        self.rooms_by_hotel
            .entry(hotel_id)
            .or_default()
            .push(room.id);
        self.rooms
            .insert(room.id, Arc::new(RwLock::new(RoomState::new(room.clone()))));
        Ok(room)
    }

    /// Partial update; moving the room to another hotel re-joins the hotel
    /// index.
    pub async fn update_room(&self, id: Ulid, upsert: UpsertRoom) -> Result<Room, EngineError> {
        upsert.validate(false).map_err(EngineError::Invalid)?;
        if let Some(hotel_id) = upsert.hotel_id
            && !self.hotels.contains_key(&hotel_id)
        {
            return Err(EngineError::NotFound(hotel_id));
        }
        let rs = self.get_room_state(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = rs.write().await;

        let mut room = guard.room.clone();
        if let Some(hotel_id) = upsert.hotel_id {
            room.hotel_id = hotel_id;
        }
        if let Some(name) = upsert.name {
            room.name = name;
        }
        if let Some(description) = upsert.description {
            room.description = description;
        }
        if let Some(number) = upsert.number {
            room.number = number;
        }
        if let Some(price) = upsert.price {
            room.price = price;
        }
        if let Some(capacity) = upsert.capacity {
            room.capacity = capacity;
        }
        let event = Event::RoomUpdated { room: room.clone() };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(room)
    }

    /// Delete a room and, with it, all of its bookings and blocked dates.
    pub async fn delete_room(&self, id: Ulid) -> Result<(), EngineError> {
        if !self.rooms.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        let event = Event::RoomDeleted { id };
        self.wal_append(&event).await?;
        if let Some((_, rs)) = self.rooms.remove(&id) {
            // Removed from the table first, so the read below only waits
            // out writers that already held the room.
            let guard = rs.read().await;
            self.unindex_room(&guard);
        }
        Ok(())
    }

    // ── Users ────────────────────────────────────────────

    pub async fn register_user(&self, upsert: UpsertUser) -> Result<User, EngineError> {
        let role = upsert.validate(true).map_err(EngineError::Invalid)?.unwrap();
        if self.users.len() >= MAX_USERS {
            return Err(EngineError::LimitExceeded("too many users"));
        }
        let name = upsert.name.unwrap();
        let email = upsert.email.unwrap();
        if self
            .users
            .iter()
            .any(|u| u.name == name || u.email == email)
        {
            return Err(EngineError::DuplicateUser { name, email });
        }
        let user = User {
            id: Ulid::new(),
            name,
            email,
            password: upsert.password.unwrap(),
            role,
        };
        let event = Event::UserRegistered { user: user.clone() };
        self.wal_append(&event).await?;
        self.users.insert(user.id, user.clone());
        self.notify.publish(&event);
        Ok(user)
    }

    pub async fn update_user(&self, id: Ulid, upsert: UpsertUser) -> Result<User, EngineError> {
        let role = upsert.validate(false).map_err(EngineError::Invalid)?;
        let mut user = self
            .users
            .get(&id)
            .map(|u| u.value().clone())
            .ok_or(EngineError::NotFound(id))?;
        if let Some(name) = upsert.name {
            user.name = name;
        }
        if let Some(email) = upsert.email {
            user.email = email;
        }
        if let Some(password) = upsert.password {
            user.password = password;
        }
        if let Some(role) = role {
            user.role = role;
        }
        if self
            .users
            .iter()
            .any(|u| u.id != id && (u.name == user.name || u.email == user.email))
        {
            return Err(EngineError::DuplicateUser {
                name: user.name,
                email: user.email,
            });
        }
        let event = Event::UserUpdated { user: user.clone() };
        self.wal_append(&event).await?;
        self.users.insert(id, user.clone());
        Ok(user)
    }

    /// Refused while the user has bookings: their rooms hold committed
    /// dates that must not silently lose their reservation row.
    pub async fn delete_user(&self, id: Ulid) -> Result<(), EngineError> {
        if !self.users.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        if let Some(bookings) = self.bookings_by_user.get(&id)
            && !bookings.is_empty()
        {
            return Err(EngineError::HasBookings(id));
        }
        let event = Event::UserDeleted { id };
        self.wal_append(&event).await?;
        self.users.remove(&id);
        self.bookings_by_user.remove(&id);
        Ok(())
    }

    // ── Bookings ─────────────────────────────────────────

    /// Create a booking as of the real current date.
    pub async fn create_booking(&self, request: BookingRequest) -> Result<Booking, EngineError> {
        self.create_booking_as_of(request, today()).await
    }

    /// The core operation. The room's blocked-date read, the conflict
    /// check, and the write of the booking plus its blocked dates all
    /// happen under one per-room write lock with the WAL append in the
    /// middle — the whole sequence commits or none of it does.
    pub async fn create_booking_as_of(
        &self,
        request: BookingRequest,
        today: NaiveDate,
    ) -> Result<Booking, EngineError> {
        let result = self.try_create_booking(request, today).await;
        match &result {
            Ok(booking) => {
                metrics::counter!(observability::BOOKINGS_TOTAL).increment(1);
                tracing::info!(
                    "booked room {} for user {} [{} .. {}]",
                    booking.room_id,
                    booking.user_id,
                    booking.stay.arrival,
                    booking.stay.departure
                );
            }
            Err(e) => {
                metrics::counter!(
                    observability::BOOKING_REJECTIONS_TOTAL,
                    "reason" => observability::error_label(e)
                )
                .increment(1);
                tracing::debug!("booking rejected: {e}");
            }
        }
        result
    }

    async fn try_create_booking(
        &self,
        request: BookingRequest,
        today: NaiveDate,
    ) -> Result<Booking, EngineError> {
        let params = request.validate().map_err(EngineError::Invalid)?;
        validate_future(&params.stay, today)?;

        if !self.users.contains_key(&params.user_id) {
            return Err(EngineError::NotFound(params.user_id));
        }
        // Unknown room fails here; availability is never consulted for it.
        let rs = self
            .get_room_state(&params.room_id)
            .ok_or(EngineError::NotFound(params.room_id))?;
        let mut guard = rs.write().await;

        validate_range(&params.stay)?;
        if guard.blocked.len() + params.stay.nights() as usize > MAX_BLOCKED_DATES_PER_ROOM {
            return Err(EngineError::LimitExceeded("too many blocked dates on room"));
        }
        check_and_expand(params.room_id, &guard.blocked, &params.stay)?;

        let booking = Booking {
            id: Ulid::new(),
            room_id: params.room_id,
            user_id: params.user_id,
            stay: params.stay,
        };
        let event = Event::BookingCreated {
            id: booking.id,
            room_id: booking.room_id,
            user_id: booking.user_id,
            stay: booking.stay,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(booking)
    }

    // ── WAL maintenance ──────────────────────────────────

    /// Compact the WAL down to the events needed to recreate current
    /// state: users and hotels first, then rooms, then their bookings, so
    /// replay never sees a dangling reference.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();
        for user in self.users.iter() {
            events.push(Event::UserRegistered {
                user: user.value().clone(),
            });
        }
        for hotel in self.hotels.iter() {
            events.push(Event::HotelCreated {
                hotel: hotel.value().clone(),
            });
        }
        let room_ids: Vec<Ulid> = self.rooms.iter().map(|e| *e.key()).collect();
        for id in room_ids {
            let Some(rs) = self.get_room_state(&id) else {
                continue;
            };
            let guard = rs.read().await;
            events.push(Event::RoomCreated {
                room: guard.room.clone(),
            });
            for booking in &guard.bookings {
                events.push(Event::BookingCreated {
                    id: booking.id,
                    room_id: booking.room_id,
                    user_id: booking.user_id,
                    stay: booking.stay,
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_records_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::RecordsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
