//! Stateful worker subject
//!
//! One listener is attached when the worker is created and feeds a shared
//! [`Subject`]. Every subscriber sees the same terminal state, and a subscriber
//! arriving after it receives that terminal notification at once.

use crate::config::WorkerOptions;
use crate::envelope::Envelope;
use crate::error::{Result, WorkerError};
use crate::runtime::{ResourceLocator, ResourceRegistry, ThreadEvent, WorkerEnv};
use crate::rx::{Observable, StreamState, Subject};
use crate::script::{ReplyFraming, WorkerFunction, WorkerScript};
use crate::worker::{ObservableWorkerStream, WorkerCore, run_once};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

/// A worker thread multicast through a shared subject
///
/// The worker replies with [`Envelope`]s: a `result` is decoded and delivered,
/// an `error` stops the subject with [`WorkerError::Application`]. Clones share
/// the thread and the subject.
///
/// # Example
/// ```no_run
/// use worker_stream::{WorkerOptions, WorkerSubject};
///
/// # #[tokio::main]
/// # async fn main() {
/// let worker = WorkerSubject::from_function(
///     |name: String| async move { Ok::<_, String>(format!("hello {}", name)) },
///     WorkerOptions::default(),
/// );
///
/// let _subscription = worker.observe().subscribe_next(|greeting| {
///     tracing::info!("{}", greeting);
/// });
/// worker.post_message("world".to_string());
/// # }
/// ```
pub struct WorkerSubject<T, R: Clone + Send + 'static> {
    core: Arc<WorkerCore>,
    subject: Subject<R>,
    _input: PhantomData<fn(T)>,
}

impl<T, R> WorkerSubject<T, R>
where
    T: Serialize,
    R: DeserializeOwned + Clone + Send + 'static,
{
    /// Create a worker from a resource locator using the global environment
    ///
    /// The locator belongs to the caller and is never revoked.
    pub fn new(locator: impl Into<ResourceLocator>, options: WorkerOptions) -> Self {
        Self::with_env(&WorkerEnv::global(), locator, options)
    }

    /// Create a worker from a resource locator using `env`
    pub fn with_env(
        env: &WorkerEnv,
        locator: impl Into<ResourceLocator>,
        options: WorkerOptions,
    ) -> Self {
        Self::from_core(WorkerCore::spawn(env, locator.into(), false, &options))
    }

    fn from_core(core: WorkerCore) -> Self {
        let subject = Subject::new();

        match core.handle() {
            Ok(handle) => {
                let sink = subject.clone();
                let locator = core.locator().clone();
                handle.add_listener(Box::new(move |event: &ThreadEvent| {
                    bridge(&sink, &locator, event);
                }));
            }
            Err(e) => subject.error(e.clone()),
        }

        Self {
            core: Arc::new(core),
            subject,
            _input: PhantomData,
        }
    }

    /// Subscribe to the shared subject
    ///
    /// Values delivered before this call are not replayed.
    pub fn observe(&self) -> Observable<R> {
        self.subject.observe()
    }

    /// Send a value to the worker
    ///
    /// A value that cannot be serialised stops the subject with
    /// [`WorkerError::Decode`].
    pub fn post_message(&self, value: T) {
        if let Err(e) = self.core.post(&value) {
            tracing::warn!("Unserializable message for {}: {}", self.core.locator(), e);
            self.subject.error(e);
        }
    }

    /// Terminate the thread, revoke an owned locator and complete the subject.
    /// Further calls do nothing.
    pub fn complete(&self) {
        self.core.teardown();
        self.subject.complete();
    }

    /// Alias for [`complete`](Self::complete)
    pub fn terminate(&self) {
        self.complete();
    }

    pub fn state(&self) -> StreamState {
        self.subject.state()
    }

    pub fn locator(&self) -> &ResourceLocator {
        self.core.locator()
    }
}

impl<T, R> WorkerSubject<T, R>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    R: Serialize + DeserializeOwned + Clone + Send + 'static,
{
    /// Create a worker running `function`, using the global environment
    pub fn from_function<F>(function: F, options: WorkerOptions) -> Self
    where
        F: WorkerFunction<T, R>,
    {
        Self::from_function_in(&WorkerEnv::global(), function, options)
    }

    /// Create a worker running `function`, using `env`
    ///
    /// The function replies in envelopes and its locator is owned by the worker.
    pub fn from_function_in<F>(env: &WorkerEnv, function: F, options: WorkerOptions) -> Self
    where
        F: WorkerFunction<T, R>,
    {
        let script = WorkerScript::new(function, ReplyFraming::Envelope);
        let locator = env.resources().make_loadable_resource(script);
        Self::from_core(WorkerCore::spawn(env, locator, true, &options))
    }

    /// Run `function` once on a fresh worker and resolve with its result
    pub async fn execute<F>(function: F, data: T) -> Result<R>
    where
        F: WorkerFunction<T, R>,
    {
        Self::execute_in(&WorkerEnv::global(), function, data).await
    }

    /// [`execute`](Self::execute) using `env`
    pub async fn execute_in<F>(env: &WorkerEnv, function: F, data: T) -> Result<R>
    where
        F: WorkerFunction<T, R>,
    {
        let worker = Self::from_function_in(env, function, WorkerOptions::default());
        run_once(worker, data).await
    }
}

/// Translate one thread event into subject notifications
fn bridge<R>(subject: &Subject<R>, locator: &ResourceLocator, event: &ThreadEvent)
where
    R: DeserializeOwned + Clone + Send + 'static,
{
    if subject.is_stopped() {
        tracing::debug!("Ignoring event from {} after terminal state", locator);
        return;
    }

    match event {
        ThreadEvent::Message(message) => match Envelope::parse(message.clone()) {
            Some(Envelope::Error(payload)) => subject.error(WorkerError::Application(payload)),
            Some(Envelope::Result(value)) => match serde_json::from_value::<R>(value) {
                Ok(value) => subject.next(value),
                Err(e) => subject.error(WorkerError::from(e)),
            },
            None => tracing::debug!("Dropping malformed envelope from {}: {}", locator, message),
        },
        ThreadEvent::Error(e) => subject.error(e.clone()),
    }
}

impl<T, R: Clone + Send + 'static> Clone for WorkerSubject<T, R> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            subject: self.subject.clone(),
            _input: PhantomData,
        }
    }
}

impl<T, R> ObservableWorkerStream<T, R> for WorkerSubject<T, R>
where
    T: Serialize,
    R: DeserializeOwned + Clone + Send + 'static,
{
    fn observe(&self) -> Observable<R> {
        WorkerSubject::observe(self)
    }

    fn post_message(&self, value: T) {
        WorkerSubject::post_message(self, value);
    }

    fn complete(&self) {
        WorkerSubject::complete(self);
    }

    fn state(&self) -> StreamState {
        WorkerSubject::state(self)
    }
}
