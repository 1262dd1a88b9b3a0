//! Common test utilities

use std::sync::Arc;
use std::time::Duration;
use worker_stream::{ManualResourceRegistry, ManualThreadFactory, WorkerEnv};

/// Upper bound for anything a test awaits
#[allow(dead_code)] // Used by other test modules
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a tracing subscriber honouring `RUST_LOG`, once per test binary
#[allow(dead_code)] // Used by other test modules
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worker_stream=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Environment backed by scripted threads
#[allow(dead_code)] // Used by other test modules
pub fn setup_manual_env() -> (WorkerEnv, Arc<ManualThreadFactory>, Arc<ManualResourceRegistry>) {
    let threads = Arc::new(ManualThreadFactory::new());
    let resources = Arc::new(ManualResourceRegistry::new());
    let env = WorkerEnv::new(threads.clone(), resources.clone());
    (env, threads, resources)
}

/// Environment whose factory refuses every thread
#[allow(dead_code)] // Used by other test modules
pub fn setup_refusing_env(reason: &str) -> (WorkerEnv, Arc<ManualResourceRegistry>) {
    let resources = Arc::new(ManualResourceRegistry::new());
    let env = WorkerEnv::new(
        Arc::new(ManualThreadFactory::refusing(reason)),
        resources.clone(),
    );
    (env, resources)
}
