//! RxJS-style Reactive Example
//!
//! Consumes worker results with observable operators, subjects and merge.
//!
//! Usage:
//!   cargo run --example rxjs_style

use anyhow::Result;
use futures::StreamExt;
use std::time::Duration;
use worker_stream::rx::{Observable, Subject, merge};
use worker_stream::{WorkerOptions, WorkerStream, WorkerSubject};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("🎯 Worker Stream - RxJS-style Reactive Example\n");

    // Example 1: Subject (like RxJS Subject)
    println!("1. Subject Example (multicast)");
    let subject = Subject::new();

    let sub1 = subject.subscribe(|value| {
        println!("   Subscriber 1 received: {}", value);
    });

    let sub2 = subject.subscribe(|value| {
        println!("   Subscriber 2 received: {}", value);
    });

    subject.next("Hello");
    subject.next("World");
    tokio::time::sleep(Duration::from_millis(100)).await;

    println!("   ✅ Both subscribers received messages\n");

    sub1.unsubscribe();
    sub2.unsubscribe();

    // Example 2: worker stream with operators
    println!("2. Worker stream with operators");
    let worker = WorkerStream::from_function(
        |n: u32| async move { Ok::<_, String>(n * 10) },
        WorkerOptions::new().with_name("tens"),
    );

    let subscription = worker
        .observe()
        .filter(|value| value % 20 == 0)
        .map(|value| format!("value-{}", value))
        .take(3)
        .subscribe(
            |value| println!("   Received: {}", value),
            |err| eprintln!("   Error: {}", err),
            || println!("   ✅ Stream completed\n"),
        );

    for n in 1..=6 {
        worker.post_message(n);
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    subscription.unsubscribe();
    worker.complete();

    // Example 3: shared worker subject
    println!("3. Worker subject (shared terminal state)");
    let shared = WorkerSubject::from_function(
        |word: String| async move {
            if word.is_empty() {
                Err("empty word".to_string())
            } else {
                Ok(word.to_uppercase())
            }
        },
        WorkerOptions::new(),
    );

    let _loud = shared
        .observe()
        .subscribe_next(|word| println!("   Loud: {}", word));
    let errors = shared.observe().last();

    shared.post_message("hello".to_string());
    shared.post_message(String::new());
    shared.post_message("ignored".to_string());

    match errors.await {
        Ok(last) => println!("   Completed with {:?}", last),
        Err(e) => println!("   ❌ Stopped: {}\n", e),
    }
    println!("   State: {:?}\n", shared.state());

    // Example 4: merge results from two workers
    println!("4. Merge");
    let evens = WorkerStream::from_function(
        |n: u32| async move { Ok::<_, String>(n * 2) },
        WorkerOptions::new().with_name("evens"),
    );
    let odds = WorkerStream::from_function(
        |n: u32| async move { Ok::<_, String>(n * 2 + 1) },
        WorkerOptions::new().with_name("odds"),
    );

    let merged = merge(vec![
        evens.observe().take(3),
        odds.observe().take(3),
        Observable::from_iter(vec![100]),
    ]);
    for n in 0..3 {
        evens.post_message(n);
        odds.post_message(n);
    }

    let mut values = Vec::new();
    let mut stream = merged.into_stream();
    while let Some(value) = stream.next().await {
        values.push(value?);
    }
    values.sort();
    println!("   ✅ Merged: {:?}", values);

    evens.complete();
    odds.complete();

    println!("\n✅ Done");
    Ok(())
}
