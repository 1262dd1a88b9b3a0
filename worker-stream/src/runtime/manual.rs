//! Scripted capabilities for driving the adapters without real threads
//!
//! A [`ManualThread`] never runs anything: it records posted messages and lets
//! the owner emit message and error events, which are dispatched synchronously
//! on the caller's thread.

use super::{
    Listener, ListenerId, ListenerSet, ResourceLocator, ResourceRegistry, ScriptRegistry,
    ThreadEvent, ThreadFactory, ThreadHandle,
};
use crate::config::WorkerOptions;
use crate::error::{Result, WorkerError};
use crate::script::WorkerScript;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Factory producing [`ManualThread`]s, or refusing to
#[derive(Default)]
pub struct ManualThreadFactory {
    refusal: Option<String>,
    created: Mutex<Vec<Arc<ManualThread>>>,
}

impl ManualThreadFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose every `create` fails with a construction error
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            refusal: Some(reason.into()),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Every handle created so far, oldest first
    pub fn threads(&self) -> Vec<Arc<ManualThread>> {
        self.created.lock().clone()
    }

    /// The most recently created handle
    pub fn last(&self) -> Option<Arc<ManualThread>> {
        self.created.lock().last().cloned()
    }
}

impl ThreadFactory for ManualThreadFactory {
    fn create(
        &self,
        locator: &ResourceLocator,
        options: &WorkerOptions,
    ) -> Result<Arc<dyn ThreadHandle>> {
        if let Some(reason) = &self.refusal {
            return Err(WorkerError::Construction(reason.clone()));
        }

        let thread = Arc::new(ManualThread {
            locator: locator.clone(),
            options: options.clone(),
            listeners: ListenerSet::new(),
            posted: Mutex::new(Vec::new()),
            terminated: AtomicBool::new(false),
            terminate_calls: AtomicUsize::new(0),
        });
        self.created.lock().push(Arc::clone(&thread));

        Ok(thread)
    }
}

/// Thread handle whose events are emitted by hand
pub struct ManualThread {
    locator: ResourceLocator,
    options: WorkerOptions,
    listeners: ListenerSet,
    posted: Mutex<Vec<Value>>,
    terminated: AtomicBool,
    terminate_calls: AtomicUsize,
}

impl ManualThread {
    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    /// Options received from the adapter
    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    /// Messages posted while the handle was alive
    pub fn posted(&self) -> Vec<Value> {
        self.posted.lock().clone()
    }

    /// Dispatch a message event to the current listeners
    pub fn emit_message(&self, message: Value) {
        self.listeners.dispatch(&ThreadEvent::Message(message));
    }

    /// Dispatch an error event to the current listeners
    pub fn emit_error(&self, error: WorkerError) {
        self.listeners.dispatch(&ThreadEvent::Error(error));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// How many times `terminate` was called, including redundant calls
    pub fn terminate_calls(&self) -> usize {
        self.terminate_calls.load(Ordering::SeqCst)
    }
}

impl ThreadHandle for ManualThread {
    fn post_message(&self, message: Value) {
        if !self.is_terminated() {
            self.posted.lock().push(message);
        }
    }

    fn add_listener(&self, listener: Listener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }

    fn terminate(&self) {
        self.terminate_calls.fetch_add(1, Ordering::SeqCst);
        if !self.terminated.swap(true, Ordering::SeqCst) {
            self.listeners.close();
        }
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

/// [`ScriptRegistry`] that also records every revocation
#[derive(Default)]
pub struct ManualResourceRegistry {
    scripts: ScriptRegistry,
    revoked: Mutex<Vec<ResourceLocator>>,
}

impl ManualResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `revoke` call received, in order
    pub fn revocations(&self) -> Vec<ResourceLocator> {
        self.revoked.lock().clone()
    }

    /// Number of registered, unrevoked scripts
    pub fn live(&self) -> usize {
        self.scripts.len()
    }
}

impl ResourceRegistry for ManualResourceRegistry {
    fn make_loadable_resource(&self, script: WorkerScript) -> ResourceLocator {
        self.scripts.make_loadable_resource(script)
    }

    fn resolve(&self, locator: &ResourceLocator) -> Option<WorkerScript> {
        self.scripts.resolve(locator)
    }

    fn revoke(&self, locator: &ResourceLocator) {
        self.revoked.lock().push(locator.clone());
        self.scripts.revoke(locator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_refusing_factory() {
        let factory = ManualThreadFactory::refusing("no workers here");
        let result = factory.create(&ResourceLocator::new("x"), &WorkerOptions::new());
        assert!(matches!(result, Err(WorkerError::Construction(reason)) if reason == "no workers here"));
        assert!(factory.threads().is_empty());
    }

    #[test]
    fn test_emit_reaches_listeners() {
        let factory = ManualThreadFactory::new();
        let handle = factory
            .create(&ResourceLocator::new("x"), &WorkerOptions::new().with_name("m"))
            .unwrap();
        let thread = factory.last().unwrap();
        assert_eq!(thread.options().name.as_deref(), Some("m"));

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        handle.add_listener(Box::new(move |_: &ThreadEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        thread.emit_message(json!(1));
        thread.emit_error(WorkerError::Runtime("x".into()));
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        handle.terminate();
        thread.emit_message(json!(2));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_records_posts_until_terminated() {
        let factory = ManualThreadFactory::new();
        let handle = factory
            .create(&ResourceLocator::new("x"), &WorkerOptions::new())
            .unwrap();

        handle.post_message(json!("a"));
        handle.terminate();
        handle.terminate();
        handle.post_message(json!("b"));

        let thread = factory.last().unwrap();
        assert_eq!(thread.posted(), vec![json!("a")]);
        assert_eq!(thread.terminate_calls(), 2);
    }
}
