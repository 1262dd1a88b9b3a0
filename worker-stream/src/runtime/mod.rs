//! Thread and resource capabilities consumed by the worker adapters
//!
//! The adapters never touch threads or script storage directly. They go through a
//! [`ThreadFactory`] and a [`ResourceRegistry`], bundled in a [`WorkerEnv`]:
//!
//! - [`NativeThreadFactory`] + [`ScriptRegistry`]: OS threads running registered scripts
//! - [`ManualThreadFactory`] + [`ManualResourceRegistry`]: scripted handles for tests

mod listeners;
mod manual;
mod native;
mod registry;

pub use manual::{ManualResourceRegistry, ManualThread, ManualThreadFactory};
pub use native::NativeThreadFactory;
pub use registry::ScriptRegistry;

pub(crate) use listeners::ListenerSet;

use crate::config::WorkerOptions;
use crate::error::{Result, WorkerError};
use crate::script::WorkerScript;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Event raised by a running thread
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEvent {
    /// The thread posted a message
    Message(Value),
    /// The thread signalled a failure
    Error(WorkerError),
}

/// Callback attached to a thread's message and error events
pub type Listener = Box<dyn Fn(&ThreadEvent) + Send + Sync>;

/// Identifies an attached listener for later removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Identifier of a loadable script resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceLocator(String);

impl ResourceLocator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceLocator {
    fn from(locator: &str) -> Self {
        Self::new(locator)
    }
}

impl From<String> for ResourceLocator {
    fn from(locator: String) -> Self {
        Self(locator)
    }
}

/// Live background execution context
///
/// Listeners run on whatever thread dispatches the event. After `terminate`
/// every listener is dropped and no further events are dispatched; listeners
/// added to a terminated handle are dropped immediately.
pub trait ThreadHandle: Send + Sync {
    /// Queue a message for the thread
    fn post_message(&self, message: Value);

    /// Attach a listener for message and error events
    fn add_listener(&self, listener: Listener) -> ListenerId;

    /// Detach a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Stop the thread. Calling it again has no effect.
    fn terminate(&self);

    fn is_terminated(&self) -> bool;
}

/// Creates thread handles from resource locators
pub trait ThreadFactory: Send + Sync {
    /// Create a thread running the script behind `locator`
    ///
    /// `options` is passed through untouched by the adapters.
    fn create(
        &self,
        locator: &ResourceLocator,
        options: &WorkerOptions,
    ) -> Result<Arc<dyn ThreadHandle>>;
}

/// Turns worker scripts into loadable, revocable resources
pub trait ResourceRegistry: Send + Sync {
    /// Register a script and allocate a locator for it
    fn make_loadable_resource(&self, script: WorkerScript) -> ResourceLocator;

    /// Look up the script behind a locator
    fn resolve(&self, locator: &ResourceLocator) -> Option<WorkerScript>;

    /// Release a locator allocated by `make_loadable_resource`
    fn revoke(&self, locator: &ResourceLocator);
}

lazy_static! {
    static ref GLOBAL_ENV: WorkerEnv = WorkerEnv::native();
}

/// Capabilities used to build workers
#[derive(Clone)]
pub struct WorkerEnv {
    threads: Arc<dyn ThreadFactory>,
    resources: Arc<dyn ResourceRegistry>,
}

impl WorkerEnv {
    pub fn new(threads: Arc<dyn ThreadFactory>, resources: Arc<dyn ResourceRegistry>) -> Self {
        Self { threads, resources }
    }

    /// Fresh environment running scripts on OS threads
    pub fn native() -> Self {
        let registry = Arc::new(ScriptRegistry::new());
        let threads = Arc::new(NativeThreadFactory::new(registry.clone()));
        Self::new(threads, registry)
    }

    /// Process-wide native environment used by the plain constructors
    pub fn global() -> Self {
        GLOBAL_ENV.clone()
    }

    pub fn threads(&self) -> &Arc<dyn ThreadFactory> {
        &self.threads
    }

    pub fn resources(&self) -> &Arc<dyn ResourceRegistry> {
        &self.resources
    }
}

impl fmt::Debug for WorkerEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerEnv").finish_non_exhaustive()
    }
}
