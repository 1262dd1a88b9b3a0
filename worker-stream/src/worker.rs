//! Shared adapter plumbing: the common interface and handle ownership

use crate::config::WorkerOptions;
use crate::error::{Result, WorkerError};
use crate::runtime::{ResourceLocator, ResourceRegistry, ThreadHandle, WorkerEnv};
use crate::rx::{Observable, StreamState};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A background worker seen as a stream of results
///
/// Implemented by [`WorkerStream`](crate::WorkerStream), which attaches a
/// listener per subscription, and [`WorkerSubject`](crate::WorkerSubject), which
/// multicasts one listener's events with shared terminal state.
pub trait ObservableWorkerStream<T, R> {
    /// Subscribe to the worker's results
    fn observe(&self) -> Observable<R>;

    /// Send a value to the worker
    fn post_message(&self, value: T);

    /// Terminate the worker, release its resources and complete the stream
    fn complete(&self);

    /// Alias for [`complete`](Self::complete)
    fn terminate(&self) {
        self.complete();
    }

    fn state(&self) -> StreamState;
}

/// Subscribe for the first result, submit `data`, then tear the worker down
pub(crate) async fn run_once<W, T, R>(worker: W, data: T) -> Result<R>
where
    W: ObservableWorkerStream<T, R>,
    R: Send + 'static,
{
    // Listener attached before the message goes out
    let first = worker.observe().first();
    worker.post_message(data);

    let result = first.await;
    worker.complete();
    result
}

/// Owns one thread handle and, optionally, its resource locator
///
/// Construction never fails: a factory error is kept and handed to subscribers.
/// Teardown terminates the handle and revokes an owned locator exactly once, on
/// the first `teardown` call or on drop.
pub(crate) struct WorkerCore {
    handle: std::result::Result<Arc<dyn ThreadHandle>, WorkerError>,
    locator: ResourceLocator,
    owns_locator: bool,
    resources: Arc<dyn ResourceRegistry>,
    torn_down: Arc<AtomicBool>,
}

impl WorkerCore {
    pub(crate) fn spawn(
        env: &WorkerEnv,
        locator: ResourceLocator,
        owns_locator: bool,
        options: &WorkerOptions,
    ) -> Self {
        let handle = env.threads().create(&locator, options);
        match &handle {
            Ok(_) => tracing::debug!("Worker created for {}", locator),
            Err(e) => tracing::warn!("Worker construction failed for {}: {}", locator, e),
        }

        Self {
            handle,
            locator,
            owns_locator,
            resources: Arc::clone(env.resources()),
            torn_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn handle(&self) -> std::result::Result<&Arc<dyn ThreadHandle>, &WorkerError> {
        self.handle.as_ref()
    }

    pub(crate) fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    /// Flag raised once teardown has run
    pub(crate) fn torn_down_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.torn_down)
    }

    pub(crate) fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Handle-level state: construction failure wins, then teardown
    pub(crate) fn state(&self) -> StreamState {
        if self.handle.is_err() {
            StreamState::Errored
        } else if self.is_torn_down() {
            StreamState::Completed
        } else {
            StreamState::Active
        }
    }

    /// Serialise and forward a message to the live handle
    pub(crate) fn post<T: Serialize>(&self, value: &T) -> Result<()> {
        let message: Value = serde_json::to_value(value)?;

        match &self.handle {
            Ok(handle) if !self.is_torn_down() => handle.post_message(message),
            Ok(_) => tracing::debug!("Ignoring message for torn down worker {}", self.locator),
            Err(_) => tracing::debug!("Ignoring message for unconstructed worker {}", self.locator),
        }

        Ok(())
    }

    /// Terminate and revoke. Returns false if teardown already ran.
    pub(crate) fn teardown(&self) -> bool {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return false;
        }

        if let Ok(handle) = &self.handle {
            handle.terminate();
        }
        if self.owns_locator {
            self.resources.revoke(&self.locator);
        }

        tracing::debug!("Worker for {} torn down", self.locator);
        true
    }
}

impl Drop for WorkerCore {
    fn drop(&mut self) {
        self.teardown();
    }
}
