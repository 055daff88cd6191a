use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};
use ulid::Ulid;

use stayd::engine::{Engine, EngineError, RoomFilter};
use stayd::notify::NotifyHub;
use stayd::validate::{BookingRequest, UpsertHotel, UpsertRoom, UpsertUser};

const ROOMS: usize = 10;
const TASKS: usize = 32;
const ATTEMPTS_PER_TASK: usize = 200;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

async fn setup(engine: &Engine) -> (Vec<Ulid>, Ulid) {
    let hotel = engine
        .create_hotel(UpsertHotel {
            name: Some("Hotel_1".into()),
            title: Some("Stress Hotel".into()),
            city: Some("City_1".into()),
            address: Some("Address_1".into()),
            distance_from_center: Some(1.0),
        })
        .await
        .unwrap();

    let mut rooms = Vec::with_capacity(ROOMS);
    for i in 0..ROOMS {
        let room = engine
            .create_room(UpsertRoom {
                hotel_id: Some(hotel.id),
                name: Some(format!("RoomName_{i}")),
                description: Some(format!("RoomDescription_{i}")),
                number: Some(i as u32),
                price: Some(1000.0 + i as f64 * 100.0),
                capacity: Some(2),
            })
            .await
            .unwrap();
        rooms.push(room.id);
    }

    let user = engine
        .register_user(UpsertUser {
            name: Some("User_1".into()),
            email: Some("mail_1@example.com".into()),
            password: Some("111".into()),
            role: Some("GUEST".into()),
        })
        .await
        .unwrap();

    println!("  created {} rooms", rooms.len());
    (rooms, user.id)
}

#[tokio::main]
async fn main() {
    let dir = std::env::temp_dir().join(format!("stayd_bench_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();

    println!("stayd stress bench");
    let engine = Arc::new(Engine::new(dir.join("stayd.wal"), Arc::new(NotifyHub::new())).unwrap());
    let (rooms, user_id) = setup(&engine).await;
    let rooms = Arc::new(rooms);

    // Contended booking writes: every task hammers the same small room
    // pool with short stays spread over two years.
    let started = Instant::now();
    let mut handles = Vec::new();
    for t in 0..TASKS {
        let engine = engine.clone();
        let rooms = rooms.clone();
        handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(ATTEMPTS_PER_TASK);
            let mut committed = 0usize;
            let mut conflicts = 0usize;
            for a in 0..ATTEMPTS_PER_TASK {
                let n = t * ATTEMPTS_PER_TASK + a;
                let room = rooms[n % rooms.len()];
                let arrival = today + Days::new(1 + (n * 7 % 730) as u64);
                let departure = arrival + Days::new((n % 5) as u64);
                let request = BookingRequest {
                    room_id: Some(room),
                    user_id: Some(user_id),
                    arrival: Some(arrival),
                    departure: Some(departure),
                };
                let start = Instant::now();
                match engine.create_booking_as_of(request, today).await {
                    Ok(_) => committed += 1,
                    Err(EngineError::DateConflict { .. }) => conflicts += 1,
                    Err(e) => panic!("unexpected booking error: {e}"),
                }
                latencies.push(start.elapsed());
            }
            (latencies, committed, conflicts)
        }));
    }

    let mut latencies = Vec::new();
    let mut committed = 0;
    let mut conflicts = 0;
    for handle in handles {
        let (l, ok, conflict) = handle.await.unwrap();
        latencies.extend(l);
        committed += ok;
        conflicts += conflict;
    }
    let elapsed = started.elapsed();

    let attempts = TASKS * ATTEMPTS_PER_TASK;
    println!(
        "  {attempts} attempts in {:.2}s ({:.0}/s): {committed} committed, {conflicts} conflicts",
        elapsed.as_secs_f64(),
        attempts as f64 / elapsed.as_secs_f64(),
    );
    print_latency("create_booking", &mut latencies);

    // Read path: date-constrained room search over the loaded store.
    let mut search_latencies = Vec::with_capacity(500);
    for n in 0..500 {
        let arrival = today + Days::new(1 + (n * 3 % 730) as u64);
        let filter = RoomFilter {
            arrival: Some(arrival),
            departure: Some(arrival + Days::new(2)),
            ..Default::default()
        };
        let start = Instant::now();
        engine.list_rooms_as_of(&filter, today).await.unwrap();
        search_latencies.push(start.elapsed());
    }
    print_latency("list_rooms(dates)", &mut search_latencies);

    let _ = std::fs::remove_dir_all(&dir);
}
