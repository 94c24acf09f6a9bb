//! Load test for the hockey server.
//!
//! Spawns fake WebSocket clients that:
//! - Connect and get paired into matches
//! - Ready up once `init` arrives
//! - Steer in a random direction at a fixed rate
//! - Count tick/scored/ended messages
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --pairs N        Number of client pairs to spawn (default: 50)
//!   --duration S     Test duration in seconds (default: 30)
//!   --move-rate R    Move messages per second per client (default: 10)
//!   --url URL        Server URL (default: ws://127.0.0.1:9001/ws)

use futures_util::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Protocol types (minimal subset) ===

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome {},
    #[serde(rename = "init")]
    Init {},
    #[serde(rename = "start")]
    Start {},
    #[serde(rename = "tick")]
    Tick {},
    #[serde(rename = "scored")]
    Scored {},
    #[serde(rename = "ended")]
    Ended {},
}

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    inits_received: AtomicU64,
    starts_received: AtomicU64,
    ticks_received: AtomicU64,
    goals_received: AtomicU64,
    endings_received: AtomicU64,
    moves_sent: AtomicU64,
    errors: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

// === Client task ===

async fn run_client(
    client_id: u32,
    url: String,
    move_rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    metrics
        .latency_sum_ms
        .fetch_add(connect_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let move_interval = if move_rate > 0.0 {
        Duration::from_secs_f64(1.0 / move_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut move_timer = tokio::time::interval(move_interval);
    move_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut rng = StdRng::seed_from_u64(client_id as u64);
    let mut in_match = false;
    let test_end = Instant::now() + duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = move_timer.tick(), if in_match => {
                let direction = json!({
                    "x": rng.gen_range(-1.0..=1.0),
                    "y": rng.gen_range(-1.0..=1.0),
                });
                let msg = json!({ "type": "move", "direction": direction });
                if ws.send(Message::Text(msg.to_string().into())).await.is_ok() {
                    metrics.moves_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::Init {}) => {
                                metrics.inits_received.fetch_add(1, Ordering::Relaxed);
                                let ready = json!({ "type": "ready" }).to_string();
                                if ws.send(Message::Text(ready.into())).await.is_err() {
                                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                                    break;
                                }
                            }
                            Ok(ServerMsg::Start {}) => {
                                metrics.starts_received.fetch_add(1, Ordering::Relaxed);
                                in_match = true;
                            }
                            Ok(ServerMsg::Tick {}) => {
                                metrics.ticks_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Scored {}) => {
                                metrics.goals_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Ended {}) => {
                                metrics.endings_received.fetch_add(1, Ordering::Relaxed);
                                break;
                            }
                            Ok(ServerMsg::Welcome {}) => {}
                            Err(_) => {
                                metrics.errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_pairs: u32 = 50;
    let mut duration_secs: u64 = 30;
    let mut move_rate: f64 = 10.0;
    let mut url = "ws://127.0.0.1:9001/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--pairs" => {
                i += 1;
                num_pairs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(50);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--move-rate" => {
                i += 1;
                move_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(10.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    let num_clients = num_pairs * 2;

    println!("=== Hockey Server Load Test ===");
    println!("Pairs: {} ({} clients)", num_pairs, num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Move rate: {}/s per client", move_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, move_rate, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, msgs={}, ticks={}, goals={}, ended={}, moves={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.ticks_received.load(Ordering::Relaxed),
                metrics_clone.goals_received.load(Ordering::Relaxed),
                metrics_clone.endings_received.load(Ordering::Relaxed),
                metrics_clone.moves_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let inits = metrics.inits_received.load(Ordering::Relaxed);
    let starts = metrics.starts_received.load(Ordering::Relaxed);
    let ticks = metrics.ticks_received.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Clients paired: {}", inits);
    println!("Clients started: {}", starts);
    println!("Total tick messages: {}", ticks);
    println!("Total goals: {}", metrics.goals_received.load(Ordering::Relaxed));
    println!("Total endings: {}", metrics.endings_received.load(Ordering::Relaxed));
    println!("Total moves sent: {}", metrics.moves_sent.load(Ordering::Relaxed));
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));

    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    println!();
    println!(
        "Messages/sec (total): {:.0}",
        msgs as f64 / duration_secs.max(1) as f64
    );
    if starts > 0 {
        println!(
            "Ticks per started client per second: {:.1} (expected ~60)",
            ticks as f64 / starts as f64 / duration_secs.max(1) as f64
        );
    }
}
