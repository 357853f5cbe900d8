use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use lanecontrol::catalog::InMemoryCatalog;
use lanecontrol::engine::Engine;
use lanecontrol::model::{Alley, Lane, OpeningHours};
use lanecontrol::service::{ReservationService, ServiceError};
use lanecontrol::slot::FixedClock;

const LANES: i64 = 10;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
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
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// The `n`th whole-hour slot after the epoch: `[HH:00, HH:59)`.
fn nth_slot(n: i64) -> (NaiveDateTime, NaiveDateTime) {
    let begin = epoch() + TimeDelta::hours(n);
    (begin, begin + TimeDelta::minutes(59))
}

fn setup(name: &str) -> Arc<ReservationService> {
    let dir = std::env::temp_dir().join("lanecontrol_bench");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);

    let catalog = InMemoryCatalog::new();
    catalog.insert_alley(Alley {
        id: 1,
        name: "Bench Bowl".into(),
        city: "Nowhere".into(),
        address: "1 Bench Road".into(),
        opening_hours: OpeningHours::daily(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
        ),
    });
    for id in 1..=LANES {
        catalog.insert_lane(Lane {
            id,
            number: id as u32,
            alley_id: 1,
        });
    }

    let engine = Arc::new(Engine::new(path).unwrap());
    Arc::new(ReservationService::new(
        engine,
        Arc::new(catalog),
        Arc::new(FixedClock(epoch())),
    ))
}

async fn phase1_sequential(service: &ReservationService) {
    let n = 2_000;
    let mut latencies = Vec::with_capacity(n as usize);
    let start = Instant::now();
    for i in 0..n {
        let (begin, end) = nth_slot(i);
        let t = Instant::now();
        service.create("bench", 1, begin, end).await.unwrap();
        latencies.push(t.elapsed());
    }
    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("create", &mut latencies);
}

/// Many clients race for the same few slots. Every slot must end up booked
/// exactly once, whatever the interleaving.
async fn phase2_contended(service: Arc<ReservationService>) {
    let clients = 64;
    let slots = 50;
    let start = Instant::now();

    let mut handles = Vec::new();
    for c in 0..clients {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let mut outcome = (0u32, 0u32, 0u32);
            for s in 0..slots {
                let (begin, end) = nth_slot(s);
                let lane = 2 + (s % (LANES - 1));
                match service.create(&format!("client{c}"), lane, begin, end).await {
                    Ok(_) => outcome.0 += 1,
                    Err(ServiceError::Unavailable) => outcome.1 += 1,
                    Err(ServiceError::ConcurrentConflict) => outcome.2 += 1,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
            outcome
        }));
    }

    let (mut booked, mut unavailable, mut raced) = (0, 0, 0);
    for h in handles {
        let (b, u, r) = h.await.unwrap();
        booked += b;
        unavailable += u;
        raced += r;
    }
    let elapsed = start.elapsed();
    println!(
        "  {clients} clients x {slots} slots in {:.2}s: booked={booked}, unavailable={unavailable}, lost races={raced}",
        elapsed.as_secs_f64()
    );
    assert_eq!(booked, slots as u32, "every slot booked exactly once");

    for lane in 2..=LANES {
        let reservations = service.engine().lane_reservations(lane).await;
        for pair in reservations.windows(2) {
            assert!(
                pair[0].span.end <= pair[1].span.start,
                "double booking on lane {lane}: {:?} / {:?}",
                pair[0],
                pair[1]
            );
        }
    }
    println!("  no double bookings");
}

async fn phase3_search_under_load(service: Arc<ReservationService>) {
    let writers = 8;
    let searches = 500;

    let mut writer_handles = Vec::new();
    for w in 0..writers {
        let service = service.clone();
        writer_handles.push(tokio::spawn(async move {
            for i in 0..200 {
                let (begin, end) = nth_slot(5_000 + i);
                let _ = service.create(&format!("writer{w}"), 1 + (w % LANES), begin, end).await;
            }
        }));
    }

    let mut latencies = Vec::with_capacity(searches);
    for i in 0..searches {
        let (begin, end) = nth_slot(5_000 + (i as i64 % 200));
        let t = Instant::now();
        service
            .find_available_lanes("reader", 1, begin, end, None)
            .await
            .unwrap();
        latencies.push(t.elapsed());
    }
    for h in writer_handles {
        h.await.unwrap();
    }
    print_latency("lane search", &mut latencies);
}

#[tokio::main]
async fn main() {
    println!("=== lanecontrol stress benchmark ===");

    println!("\n[phase 1] sequential create throughput");
    let service = setup("phase1.wal");
    phase1_sequential(&service).await;

    println!("\n[phase 2] contended creates");
    let service = setup("phase2.wal");
    phase2_contended(service).await;

    println!("\n[phase 3] lane search under write load");
    let service = setup("phase3.wal");
    phase3_search_under_load(service).await;

    println!("\n=== benchmark complete ===");
}
