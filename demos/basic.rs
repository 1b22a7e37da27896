//! Basic usage example for the flowrate crate.

use flowrate::{GlobalRateCounter, MemoryOrdering, RateCounterBuilder, RateCounterConfig};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Basic Rate Counter Example ===\n");

    // Example 1: Counting into the live window
    simple_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 2: Windows rotating over time
    rotation_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 3: Many threads, one counter
    concurrent_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 4: Snapshot statistics
    stats_example();
}

fn simple_example() {
    println!("1. Counting Events:");

    let counter = GlobalRateCounter::new(10, 1000).unwrap();
    println!("   Created counter with 10 windows of 1 second");

    for i in 1..=5 {
        let count = counter.record_event();
        println!("   Event {} - window count now {}", i, count);
    }
    counter.record_events(10);

    println!("   Live window: {}", counter.current_window_count());
    println!(
        "   Average (nothing published yet): {}",
        counter.average_window_count()
    );
}

fn rotation_example() {
    println!("2. Rotating Windows:");

    let config = RateCounterConfig::new(4, 200).with_ordering(MemoryOrdering::AcquireRelease);
    let counter = GlobalRateCounter::with_config(config).unwrap();
    println!("   4 windows of 200ms, spanning {:?}", counter.window_span());

    for (step, events) in [8u64, 4, 12, 0, 2].into_iter().enumerate() {
        counter.record_events(events);
        println!(
            "   Step {}: recorded {:>2} | live {:>2} | previous {:>2} | average {:>2}",
            step,
            events,
            counter.current_window_count(),
            counter.window_count_n_steps_ago(1),
            counter.average_window_count()
        );
        thread::sleep(Duration::from_millis(200));
    }

    println!("   Oldest to newest: {:?}", counter.slots_oldest_first());
}

fn concurrent_example() {
    println!("3. Concurrent Recording:");

    let counter = Arc::new(
        RateCounterBuilder::new()
            .slot_count(5)
            .rotation_interval_ms(100)
            .thread_name("demo-rotation")
            .build_global()
            .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|id| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    counter.record_event();
                    thread::sleep(Duration::from_millis(2));
                }
                println!("   Thread {} finished", id);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    println!("   Events in the last 500ms: {}", counter.window_total());
    println!("   Average per 100ms window: {}", counter.average_window_count());
}

fn stats_example() {
    println!("4. Statistics:");

    let counter = GlobalRateCounter::new(4, 60_000).unwrap();
    for events in [3, 9, 1] {
        counter.record_events(events);
        counter.rotate();
    }
    counter.record_events(5);

    println!("{}", counter.stats());

    counter.shutdown();
    println!("\n   Rotation thread running: {}", counter.is_rotating());
}
