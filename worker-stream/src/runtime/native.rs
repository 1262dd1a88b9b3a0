//! OS-thread backed workers
//!
//! Each handle owns one named thread with a current-thread tokio runtime. Posted
//! messages are processed one at a time, in order, by the registered script; the
//! resulting event is dispatched to the listeners from the worker thread.

use super::{
    Listener, ListenerId, ListenerSet, ResourceLocator, ResourceRegistry, ThreadEvent,
    ThreadFactory, ThreadHandle,
};
use crate::config::WorkerOptions;
use crate::error::{Result, WorkerError};
use crate::script::WorkerScript;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use tokio::sync::{Notify, mpsc};

/// Thread name prefix when the options carry no name
pub const THREAD_NAME_PREFIX: &str = "worker-stream";

static THREAD_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Spawns OS threads for scripts found in a registry
pub struct NativeThreadFactory {
    registry: Arc<dyn ResourceRegistry>,
}

impl NativeThreadFactory {
    pub fn new(registry: Arc<dyn ResourceRegistry>) -> Self {
        Self { registry }
    }
}

impl ThreadFactory for NativeThreadFactory {
    fn create(
        &self,
        locator: &ResourceLocator,
        options: &WorkerOptions,
    ) -> Result<Arc<dyn ThreadHandle>> {
        let script = self.registry.resolve(locator).ok_or_else(|| {
            WorkerError::Construction(format!("No loadable script at {}", locator))
        })?;

        let name = options.name.clone().unwrap_or_else(|| {
            format!(
                "{}-{}",
                THREAD_NAME_PREFIX,
                THREAD_COUNTER.fetch_add(1, Ordering::Relaxed)
            )
        });

        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(stack_size) = options.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            listeners: ListenerSet::new(),
            terminated: AtomicBool::new(false),
            shutdown: Notify::new(),
        });

        let worker_shared = Arc::clone(&shared);
        builder
            .spawn(move || run_worker(script, inbox_rx, worker_shared))
            .map_err(|e| {
                WorkerError::Construction(format!("Failed to spawn thread {}: {}", name, e))
            })?;

        tracing::debug!("Spawned worker thread {} for {}", name, locator);

        Ok(Arc::new(NativeThread {
            name,
            shared,
            inbox: Mutex::new(Some(inbox_tx)),
        }))
    }
}

struct Shared {
    listeners: ListenerSet,
    terminated: AtomicBool,
    /// Interrupts the worker loop, including a call in progress
    shutdown: Notify,
}

impl Shared {
    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

/// Handle to a spawned worker thread
///
/// Termination drops the call in progress at its next await point and the
/// thread exits. A script blocking without awaiting holds the thread until it
/// yields.
pub struct NativeThread {
    name: String,
    shared: Arc<Shared>,
    inbox: Mutex<Option<mpsc::UnboundedSender<Value>>>,
}

impl ThreadHandle for NativeThread {
    fn post_message(&self, message: Value) {
        if self.shared.is_terminated() {
            tracing::debug!("Dropping message for terminated worker {}", self.name);
            return;
        }

        if let Some(inbox) = self.inbox.lock().as_ref() {
            if inbox.send(message).is_err() {
                tracing::warn!("Worker thread {} is no longer receiving", self.name);
            }
        }
    }

    fn add_listener(&self, listener: Listener) -> ListenerId {
        self.shared.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.shared.listeners.remove(id);
    }

    fn terminate(&self) {
        if self.shared.terminated.swap(true, Ordering::SeqCst) {
            return;
        }

        // Closing the inbox ends the worker loop once idle, the notification
        // interrupts a running call. notify_one keeps a permit if the loop is
        // between waits.
        self.inbox.lock().take();
        self.shared.shutdown.notify_one();
        self.shared.listeners.close();
        tracing::debug!("Terminated worker thread {}", self.name);
    }

    fn is_terminated(&self) -> bool {
        self.shared.is_terminated()
    }
}

fn run_worker(
    script: WorkerScript,
    mut inbox: mpsc::UnboundedReceiver<Value>,
    shared: Arc<Shared>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start worker runtime: {}", e);
            shared.listeners.dispatch(&ThreadEvent::Error(WorkerError::Runtime(
                format!("Failed to start worker runtime: {}", e),
            )));
            return;
        }
    };

    runtime.block_on(async move {
        loop {
            let message = tokio::select! {
                _ = shared.shutdown.notified() => break,
                message = inbox.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            if shared.is_terminated() {
                break;
            }

            let outcome = tokio::select! {
                _ = shared.shutdown.notified() => {
                    tracing::debug!("Dropping in-flight call on terminated worker");
                    break;
                }
                outcome = AssertUnwindSafe(script.invoke(message)).catch_unwind() => outcome,
            };

            let event = match outcome {
                Ok(event) => event,
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    tracing::error!("Worker script panicked: {}", reason);
                    ThreadEvent::Error(WorkerError::Runtime(format!(
                        "Worker script panicked: {}",
                        reason
                    )))
                }
            };

            if shared.is_terminated() {
                break;
            }
            shared.listeners.dispatch(&event);
        }
    });

    tracing::debug!("Worker thread exiting");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
