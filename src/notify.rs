use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use ulid::Ulid;

use chrono::NaiveDate;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Published once a booking has committed. Field names follow the exported
/// analytics documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBookedEvent {
    pub user_id: Ulid,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegisteredEvent {
    pub user_id: Ulid,
}

/// Broadcast hub for post-commit domain notifications — one topic per
/// event family. Publishing is fire-and-forget: no subscribers, no work,
/// and a send can never fail the committed operation.
pub struct NotifyHub {
    room_booked: broadcast::Sender<RoomBookedEvent>,
    user_registered: broadcast::Sender<UserRegisteredEvent>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            room_booked: broadcast::channel(CHANNEL_CAPACITY).0,
            user_registered: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe_room_booked(&self) -> broadcast::Receiver<RoomBookedEvent> {
        self.room_booked.subscribe()
    }

    pub fn subscribe_user_registered(&self) -> broadcast::Receiver<UserRegisteredEvent> {
        self.user_registered.subscribe()
    }

    /// Publish the notification a committed event implies, if any. Only
    /// booking creation and user registration are externally visible.
    pub fn publish(&self, event: &Event) {
        match event {
            Event::BookingCreated { user_id, stay, .. } => {
                let _ = self.room_booked.send(RoomBookedEvent {
                    user_id: *user_id,
                    check_in_date: stay.arrival,
                    check_out_date: stay.departure,
                });
            }
            Event::UserRegistered { user } => {
                let _ = self
                    .user_registered
                    .send(UserRegisteredEvent { user_id: user.id });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StayRange, User, UserRole};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn booking_event_reaches_subscriber() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe_room_booked();

        let uid = Ulid::new();
        hub.publish(&Event::BookingCreated {
            id: Ulid::new(),
            room_id: Ulid::new(),
            user_id: uid,
            stay: StayRange::new(d(2030, 6, 1), d(2030, 6, 3)),
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(
            received,
            RoomBookedEvent {
                user_id: uid,
                check_in_date: d(2030, 6, 1),
                check_out_date: d(2030, 6, 3),
            }
        );
    }

    #[tokio::test]
    async fn registration_event_reaches_subscriber() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe_user_registered();

        let user = User {
            id: Ulid::new(),
            name: "alice".into(),
            email: "alice@example.com".into(),
            password: "secret".into(),
            role: UserRole::Guest,
        };
        hub.publish(&Event::UserRegistered { user: user.clone() });

        assert_eq!(rx.recv().await.unwrap().user_id, user.id);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        hub.publish(&Event::BookingCreated {
            id: Ulid::new(),
            room_id: Ulid::new(),
            user_id: Ulid::new(),
            stay: StayRange::new(d(2030, 6, 1), d(2030, 6, 1)),
        });
    }

    #[tokio::test]
    async fn non_published_events_are_silent() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe_room_booked();
        hub.publish(&Event::HotelDeleted { id: Ulid::new() });
        assert!(rx.try_recv().is_err());
    }
}
