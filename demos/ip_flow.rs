//! Per-client load tracking with a keyed counter.

use flowrate::{KeyedRateCounter, RateCounterBuilder, SharedKeyedCounter};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Keyed Flow Control Example ===\n");

    basic_keyed_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    hot_client_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    collision_example();
}

fn basic_keyed_example() {
    println!("1. Counting per Client:");

    let counter = KeyedRateCounter::new(64, 1000).unwrap();

    let clients = [
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2)),
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
    ];

    for (i, ip) in clients.iter().enumerate() {
        let key = ip.to_string();
        counter.record_events(&key, (i as u64 + 1) * 5);
        println!(
            "   {} -> bucket {:>2}, count {}",
            key,
            counter.bucket_for(&key),
            counter.count_for_key(&key)
        );
    }
}

fn hot_client_example() {
    println!("2. Spotting a Heavy Client:");

    let counter: SharedKeyedCounter = Arc::new(
        RateCounterBuilder::new()
            .slot_count(32)
            .rotation_interval_ms(250)
            .build_keyed()
            .unwrap(),
    );

    // Twenty well-behaved clients and one noisy one
    let mut handles = vec![];
    for i in 0..20u8 {
        let counter = counter.clone();
        handles.push(thread::spawn(move || {
            let key = Ipv4Addr::new(172, 16, 0, i).to_string();
            for _ in 0..40 {
                counter.record_event(&key);
                thread::sleep(Duration::from_millis(20));
            }
        }));
    }
    {
        let counter = counter.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..4000 {
                counter.record_event("203.0.113.66");
                thread::sleep(Duration::from_micros(200));
            }
        }));
    }

    for _ in 0..3 {
        thread::sleep(Duration::from_millis(250));
        let average = counter.average_window_count();
        let noisy = counter.count_for_key("203.0.113.66");
        let verdict = if average > 0 && noisy > average * 5 {
            "⛔ throttle"
        } else {
            "✅ ok"
        };
        println!(
            "   average bucket load {:>4} | 203.0.113.66 {:>4} | {}",
            average, noisy, verdict
        );
    }

    for handle in handles {
        handle.join().unwrap();
    }

    println!("   Busiest bucket vs average: {:.1}x", counter.stats().imbalance());
}

fn collision_example() {
    println!("3. Shared Buckets:");

    let counter = KeyedRateCounter::new(4, 60_000).unwrap();

    let keys: Vec<String> = (1..=8).map(|i| format!("10.0.0.{}", i)).collect();
    for key in &keys {
        counter.record_event(key);
    }

    for key in &keys {
        println!(
            "   {:<10} bucket {} reads {}",
            key,
            counter.bucket_for(key),
            counter.count_for_key(key)
        );
    }
    println!("   8 keys, 4 buckets: counts are per bucket, not per key");
    println!("   Buckets: {:?}", counter.stats().slots);
}
