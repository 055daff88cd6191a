//! Hard caps, all in one place.

/// Max length for entity names (hotel, room, user).
pub const MAX_NAME_LEN: usize = 160;

/// Max length for free-text fields (hotel title, room description, address).
pub const MAX_TEXT_LEN: usize = 2000;

/// Max nights per stay. The day expansion materializes one blocked-date row
/// per night, so an unbounded range would blow up memory and the WAL.
pub const MAX_STAY_NIGHTS: i64 = 365;

/// Max blocked dates held by a single room.
pub const MAX_BLOCKED_DATES_PER_ROOM: usize = 20_000;

pub const MAX_HOTELS: usize = 100_000;
pub const MAX_ROOMS: usize = 1_000_000;
pub const MAX_USERS: usize = 1_000_000;
pub const MAX_ROOMS_PER_HOTEL: usize = 10_000;

/// Stays may not reach past this year; keeps date arithmetic well away from
/// the chrono representable range.
pub const MAX_VALID_YEAR: i32 = 2200;

pub const MAX_PAGE_SIZE: usize = 200;
pub const DEFAULT_PAGE_SIZE: usize = 20;
