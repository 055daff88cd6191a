mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;

pub use availability::{check_and_expand, expand_dates, first_conflict, is_available};
pub use error::EngineError;
pub use queries::{HotelFilter, Page, RoomFilter};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    RecordsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single sync for the whole batch.
/// 5. Respond to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush the batch before the non-append command.
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<PendingAppend>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(start.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[PendingAppend]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always sync — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let sync_err = wal.sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = sync_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::RecordsSinceCompact { response } => {
            let _ = response.send(wal.records_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

// ── Engine ───────────────────────────────────────────────

/// The arena store: every table keyed by id, relations as explicit
/// foreign-key fields plus the secondary indexes below. Rooms get a lock
/// each because booking creation must read-check-write their state as one
/// unit; hotels and users are plain rows.
pub struct Engine {
    pub(super) hotels: DashMap<Ulid, Hotel>,
    pub(super) users: DashMap<Ulid, User>,
    pub(super) rooms: DashMap<Ulid, SharedRoomState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    /// Booking id → room id, for point lookups of immutable bookings.
    pub(super) booking_to_room: DashMap<Ulid, Ulid>,
    /// User id → booking ids; guards user deletion.
    pub(super) bookings_by_user: DashMap<Ulid, Vec<Ulid>>,
    /// Hotel id → room ids, the join index for search and cascade checks.
    pub(super) rooms_by_hotel: DashMap<Ulid, Vec<Ulid>>,
}

impl Engine {
    pub fn new(wal_path: PathBuf, notify: Arc<NotifyHub>) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            hotels: DashMap::new(),
            users: DashMap::new(),
            rooms: DashMap::new(),
            wal_tx,
            notify,
            booking_to_room: DashMap::new(),
            bookings_by_user: DashMap::new(),
            rooms_by_hotel: DashMap::new(),
        };

        // Replay. We are the sole owner of every room Arc here, so
        // try_write always succeeds instantly; never block_on a lock in
        // what may be an async context.
        for event in &events {
            engine.replay_event(event);
        }

        Ok(engine)
    }

    fn replay_event(&self, event: &Event) {
        match event {
            Event::HotelCreated { hotel } | Event::HotelUpdated { hotel } => {
                self.hotels.insert(hotel.id, hotel.clone());
            }
            Event::HotelDeleted { id } => {
                self.hotels.remove(id);
            }
            Event::RoomCreated { room } => {
                self.rooms_by_hotel
                    .entry(room.hotel_id)
                    .or_default()
                    .push(room.id);
                self.rooms
                    .insert(room.id, Arc::new(RwLock::new(RoomState::new(room.clone()))));
            }
            Event::RoomUpdated { room } => {
                if let Some(entry) = self.rooms.get(&room.id) {
                    let rs = entry.value().clone();
                    let mut guard = rs.try_write().expect("replay: uncontended write");
                    self.apply_room_row(&mut guard, room);
                }
            }
            Event::RoomDeleted { id } => {
                if let Some((_, rs)) = self.rooms.remove(id) {
                    let guard = rs.try_read().expect("replay: uncontended read");
                    self.unindex_room(&guard);
                }
            }
            Event::UserRegistered { user } | Event::UserUpdated { user } => {
                self.users.insert(user.id, user.clone());
            }
            Event::UserDeleted { id } => {
                self.users.remove(id);
            }
            Event::BookingCreated { room_id, .. } => {
                if let Some(entry) = self.rooms.get(room_id) {
                    let rs = entry.value().clone();
                    let mut guard = rs.try_write().expect("replay: uncontended write");
                    self.apply_to_room(&mut guard, event);
                }
            }
        }
    }

    /// Apply a room-scoped event to a locked room state, maintaining the
    /// booking indexes. Caller holds the write lock.
    pub(super) fn apply_to_room(&self, rs: &mut RoomState, event: &Event) {
        match event {
            Event::BookingCreated {
                id,
                room_id,
                user_id,
                stay,
            } => {
                rs.apply_booking(Booking {
                    id: *id,
                    room_id: *room_id,
                    user_id: *user_id,
                    stay: *stay,
                });
                self.booking_to_room.insert(*id, *room_id);
                self.bookings_by_user.entry(*user_id).or_default().push(*id);
            }
            Event::RoomUpdated { room } => self.apply_room_row(rs, room),
            _ => unreachable!("not a room-scoped event"),
        }
    }

    /// Overwrite a room row in place, moving the hotel index entry if the
    /// room changed hotels.
    fn apply_room_row(&self, rs: &mut RoomState, room: &Room) {
        if rs.room.hotel_id != room.hotel_id {
            if let Some(mut old) = self.rooms_by_hotel.get_mut(&rs.room.hotel_id) {
                old.retain(|r| r != &room.id);
            }
            self.rooms_by_hotel
                .entry(room.hotel_id)
                .or_default()
                .push(room.id);
        }
        rs.room = room.clone();
    }

    /// Drop a removed room's entries from the hotel and booking indexes
    /// (the cascade half of room deletion).
    pub(super) fn unindex_room(&self, rs: &RoomState) {
        if let Some(mut siblings) = self.rooms_by_hotel.get_mut(&rs.room.hotel_id) {
            siblings.retain(|r| r != &rs.room.id);
        }
        for booking in &rs.bookings {
            self.booking_to_room.remove(&booking.id);
            if let Some(mut user_bookings) = self.bookings_by_user.get_mut(&booking.user_id) {
                user_bookings.retain(|b| b != &booking.id);
            }
        }
    }

    /// Write an event to the WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_room_state(&self, id: &Ulid) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    /// WAL-append + apply + notify in one call — the commit point for
    /// room-scoped events. Nothing is applied unless the append succeeded,
    /// and the notification only fires after the apply.
    pub(super) async fn persist_and_apply(
        &self,
        rs: &mut RoomState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.apply_to_room(rs, event);
        self.notify.publish(event);
        Ok(())
    }
}
