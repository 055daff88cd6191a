//! Analytics collaborator: collects post-commit notifications into a
//! document store and exports them as CSV on demand. Strictly downstream of
//! the engine — nothing here can fail a booking.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::notify::{NotifyHub, RoomBookedEvent, UserRegisteredEvent};
use crate::observability;

/// One collected document, as it lands in the events journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StatsRecord {
    RoomBooked(RoomBookedEvent),
    UserRegistered(UserRegisteredEvent),
}

/// In-memory event collections plus an optional JSON-lines journal on disk
/// (the document-store side of the house).
pub struct StatsStore {
    room_booked: Mutex<Vec<RoomBookedEvent>>,
    user_registered: Mutex<Vec<UserRegisteredEvent>>,
    journal: Option<Mutex<BufWriter<File>>>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self {
            room_booked: Mutex::new(Vec::new()),
            user_registered: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    /// Also append every collected record to `<dir>/events.jsonl`.
    pub fn with_journal(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("events.jsonl"))?;
        Ok(Self {
            journal: Some(Mutex::new(BufWriter::new(file))),
            ..Self::new()
        })
    }

    pub fn add(&self, record: StatsRecord) {
        metrics::counter!(observability::STATS_EVENTS_TOTAL).increment(1);
        if let Some(journal) = &self.journal {
            let mut writer = journal.lock().unwrap();
            match serde_json::to_string(&record) {
                Ok(line) => {
                    if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
                        warn!("events journal write failed: {e}");
                    }
                }
                Err(e) => warn!("events journal encode failed: {e}"),
            }
        }
        match record {
            StatsRecord::RoomBooked(e) => self.room_booked.lock().unwrap().push(e),
            StatsRecord::UserRegistered(e) => self.user_registered.lock().unwrap().push(e),
        }
    }

    pub fn counts(&self) -> (usize, usize) {
        (
            self.room_booked.lock().unwrap().len(),
            self.user_registered.lock().unwrap().len(),
        )
    }

    /// Write the collected events to CSV files under `dir`, creating it if
    /// needed. Returns the two file paths.
    pub fn export_csv(&self, dir: &Path) -> io::Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(dir)?;

        let booked_path = dir.join("room_booked_events.csv");
        let mut w = BufWriter::new(File::create(&booked_path)?);
        writeln!(w, "userId;checkInDate;checkOutDate")?;
        for e in self.room_booked.lock().unwrap().iter() {
            writeln!(w, "{};{};{}", e.user_id, e.check_in_date, e.check_out_date)?;
        }
        w.flush()?;

        let registered_path = dir.join("user_registered_events.csv");
        let mut w = BufWriter::new(File::create(&registered_path)?);
        writeln!(w, "userId")?;
        for e in self.user_registered.lock().unwrap().iter() {
            writeln!(w, "{}", e.user_id)?;
        }
        w.flush()?;

        info!("exported statistics to {}", dir.display());
        Ok((booked_path, registered_path))
    }
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task draining both notify topics into the store. Lagging
/// behind a burst drops the overwritten messages and keeps going.
pub async fn run_collector(stats: Arc<StatsStore>, hub: Arc<NotifyHub>) {
    let mut booked_rx = hub.subscribe_room_booked();
    let mut registered_rx = hub.subscribe_user_registered();
    loop {
        tokio::select! {
            msg = booked_rx.recv() => match msg {
                Ok(e) => stats.add(StatsRecord::RoomBooked(e)),
                Err(RecvError::Lagged(n)) => {
                    metrics::counter!(observability::STATS_LAGGED_TOTAL).increment(n);
                    warn!("stats collector lagged, dropped {n} booking events");
                }
                Err(RecvError::Closed) => break,
            },
            msg = registered_rx.recv() => match msg {
                Ok(e) => stats.add(StatsRecord::UserRegistered(e)),
                Err(RecvError::Lagged(n)) => {
                    metrics::counter!(observability::STATS_LAGGED_TOTAL).increment(n);
                    warn!("stats collector lagged, dropped {n} registration events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}
