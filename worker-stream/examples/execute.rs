//! One-shot Worker Example
//!
//! Runs functions on background worker threads with `execute`, and loads
//! worker options from YAML.
//!
//! Usage:
//!   cargo run --example execute

use anyhow::Result;
use std::time::Duration;
use worker_stream::{WorkerError, WorkerOptions, WorkerStream, WorkerSubject};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("🧵 Worker Stream - execute Example\n");

    // Example 1: round trip
    println!("1. Round trip");
    let echoed = WorkerStream::execute(
        |data: String| async move { Ok::<_, String>(data) },
        "some data".to_string(),
    )
    .await?;
    println!("   ✅ Worker echoed: {}\n", echoed);

    // Example 2: CPU-bound work off the async runtime
    println!("2. Blocking computation");
    let primes = WorkerStream::execute(
        |limit: u64| async move {
            let count = (2..=limit)
                .filter(|n| (2..*n).take_while(|d| d * d <= *n).all(|d| n % d != 0))
                .count();
            Ok::<_, String>(count)
        },
        100_000,
    )
    .await?;
    println!("   ✅ {} primes below 100000\n", primes);

    // Example 3: rejection
    println!("3. Rejection");
    match WorkerSubject::execute(
        |name: String| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err::<String, _>(format!("unknown user {}", name))
        },
        "mallory".to_string(),
    )
    .await
    {
        Err(WorkerError::Application(reason)) => println!("   ❌ Rejected with {}\n", reason),
        other => println!("   Unexpected outcome: {:?}\n", other),
    }

    // Example 4: options from YAML
    println!("4. Options from YAML");
    let options = WorkerOptions::from_yaml_str(
        r#"
name: yaml-worker
stack_size: 1048576
priority: low
"#,
    )?;
    println!("   Loaded options: {:?}", options);

    let worker = WorkerStream::from_function(
        |n: i64| async move { Ok::<_, String>(n.pow(2)) },
        options,
    );
    let squared = worker.observe().first();
    worker.post_message(12);
    println!("   ✅ 12² = {}", squared.await?);
    worker.complete();

    println!("\n✅ Done");
    Ok(())
}
