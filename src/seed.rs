//! Demo-data initializer: a handful of users, hotels, rooms, and one
//! future booking per room so availability has something to push against.

use chrono::{Days, NaiveDate};
use tracing::info;

use crate::engine::{Engine, EngineError};
use crate::validate::{BookingRequest, UpsertHotel, UpsertRoom, UpsertUser};

const COUNT_USERS: usize = 5;
const COUNT_HOTELS: usize = 5;
const COUNT_ROOMS_PER_HOTEL: usize = 7;
const SEED_STAY_NIGHTS: u64 = 4;

pub async fn seed_demo_data(engine: &Engine, today: NaiveDate) -> Result<(), EngineError> {
    let (hotels, ..) = engine.table_counts();
    if hotels > 0 {
        info!("store already has rows, skipping seed");
        return Ok(());
    }

    let mut user_ids = Vec::with_capacity(COUNT_USERS);
    for i in 1..=COUNT_USERS {
        let user = engine
            .register_user(UpsertUser {
                name: Some(format!("User_{i}")),
                email: Some(format!("mail_{i}@example.com")),
                password: Some("111".into()),
                role: Some(if i % 2 == 0 { "GUEST" } else { "ADMIN" }.into()),
            })
            .await?;
        user_ids.push(user.id);
    }

    for i in 1..=COUNT_HOTELS {
        let hotel = engine
            .create_hotel(UpsertHotel {
                name: Some(format!("Hotel_{i}")),
                title: Some(format!("Title Hotel {i}")),
                city: Some(if i % 2 == 0 { "City_1" } else { "City_2" }.into()),
                address: Some(format!("Address_{i}")),
                distance_from_center: Some(0.5 + i as f64 * 0.9),
            })
            .await?;

        for j in 1..=COUNT_ROOMS_PER_HOTEL {
            let room = engine
                .create_room(UpsertRoom {
                    hotel_id: Some(hotel.id),
                    name: Some(format!("RoomName_{i}{j}")),
                    description: Some(format!("RoomDescription_{i}{j}")),
                    number: Some(j as u32),
                    price: Some(1000.0 + (i * j * 137 % 4000) as f64),
                    capacity: Some((j % 5 + 1) as u8),
                })
                .await?;

            // Staggered stays so each room starts with a different run of
            // blocked dates.
            let arrival = today + Days::new(1 + j as u64);
            let departure = arrival + Days::new(SEED_STAY_NIGHTS - 1);
            engine
                .create_booking_as_of(
                    BookingRequest {
                        room_id: Some(room.id),
                        user_id: Some(user_ids[(i - 1) % COUNT_USERS]),
                        arrival: Some(arrival),
                        departure: Some(departure),
                    },
                    today,
                )
                .await?;
        }
    }

    let (hotels, rooms, users, bookings) = engine.table_counts();
    info!("seeded demo data: {hotels} hotels, {rooms} rooms, {users} users, {bookings} bookings");
    Ok(())
}
