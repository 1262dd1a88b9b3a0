//! Cold worker stream
//!
//! Every [`WorkerStream::observe`] call attaches its own listener to the
//! thread and forwards that listener's events, so each subscription sees only
//! the results produced after it attached. Results posted while nobody is
//! subscribed reach nobody.

use crate::config::WorkerOptions;
use crate::error::{Result, WorkerError};
use crate::runtime::{
    ListenerId, ResourceLocator, ResourceRegistry, ThreadEvent, ThreadHandle, WorkerEnv,
};
use crate::rx::{Observable, StreamState};
use crate::script::{ReplyFraming, WorkerFunction, WorkerScript};
use crate::worker::{ObservableWorkerStream, WorkerCore, run_once};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;

/// A worker thread exposed as a cold observable of `R` results
///
/// Clones share the same thread. The thread is terminated by
/// [`complete`](Self::complete) / [`terminate`](Self::terminate), or when the
/// last clone is dropped.
///
/// # Example
/// ```no_run
/// use futures::StreamExt;
/// use worker_stream::{WorkerOptions, WorkerStream};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let worker = WorkerStream::from_function(
///     |n: u64| async move { Ok::<_, String>(n * n) },
///     WorkerOptions::new().with_name("squares"),
/// );
///
/// let squares = worker.observe().take(3).into_stream();
/// for n in 1..=3 {
///     worker.post_message(n);
/// }
///
/// let values: Vec<_> = squares.collect().await;
/// worker.complete();
/// # Ok(())
/// # }
/// ```
pub struct WorkerStream<T, R> {
    core: Arc<WorkerCore>,
    _types: PhantomData<fn(T) -> R>,
}

impl<T, R> WorkerStream<T, R>
where
    T: Serialize,
    R: DeserializeOwned + Send + 'static,
{
    /// Create a worker from a resource locator using the global environment
    ///
    /// The locator belongs to the caller and is never revoked. Construction
    /// failures surface as the error of every subscription.
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
        Self {
            core: Arc::new(core),
            _types: PhantomData,
        }
    }

    /// Subscribe to the results produced from now on
    ///
    /// The listener is attached before this returns, so a message posted right
    /// after cannot be missed. Dropping the observable detaches it without
    /// stopping the thread.
    pub fn observe(&self) -> Observable<R> {
        let handle = match self.core.handle() {
            Ok(handle) => Arc::clone(handle),
            Err(e) => return Observable::error(e.clone()),
        };
        if self.core.is_torn_down() {
            return Observable::empty();
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = handle.add_listener(Box::new(move |event: &ThreadEvent| {
            let _ = tx.send(event.clone());
        }));
        let guard = ListenerGuard { handle, id };
        let torn_down = self.core.torn_down_flag();

        Observable::from_stream(async_stream::stream! {
            let _guard = guard;

            while let Some(event) = rx.recv().await {
                // Nothing reaches subscribers after an explicit completion
                if torn_down.load(Ordering::SeqCst) {
                    break;
                }

                match event {
                    ThreadEvent::Message(message) => match serde_json::from_value::<R>(message) {
                        Ok(value) => yield Ok(value),
                        Err(e) => {
                            yield Err(WorkerError::from(e));
                            break;
                        }
                    },
                    ThreadEvent::Error(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        })
    }

    /// Send a value to the worker
    ///
    /// Ignored when construction failed or after teardown. A value that cannot
    /// be serialised is logged and dropped.
    pub fn post_message(&self, value: T) {
        if let Err(e) = self.core.post(&value) {
            tracing::warn!("Dropping unserializable message for {}: {}", self.core.locator(), e);
        }
    }

    /// Terminate the thread, revoke an owned locator and complete every
    /// subscription. Further calls do nothing.
    pub fn complete(&self) {
        self.core.teardown();
    }

    /// Alias for [`complete`](Self::complete)
    pub fn terminate(&self) {
        self.complete();
    }

    /// Handle-level state: `Errored` if construction failed, `Completed` after
    /// teardown, otherwise `Active`
    ///
    /// Thread error events end only the subscriptions that received them and
    /// leave this state `Active`, since a later subscription may still see
    /// results.
    pub fn state(&self) -> StreamState {
        self.core.state()
    }

    pub fn locator(&self) -> &ResourceLocator {
        self.core.locator()
    }
}

impl<T, R> WorkerStream<T, R>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    R: Serialize + DeserializeOwned + Send + 'static,
{
    /// Create a worker running `function`, using the global environment
    ///
    /// The function is registered as a loadable resource owned by the worker.
    pub fn from_function<F>(function: F, options: WorkerOptions) -> Self
    where
        F: WorkerFunction<T, R>,
    {
        Self::from_function_in(&WorkerEnv::global(), function, options)
    }

    /// Create a worker running `function`, using `env`
    pub fn from_function_in<F>(env: &WorkerEnv, function: F, options: WorkerOptions) -> Self
    where
        F: WorkerFunction<T, R>,
    {
        let script = WorkerScript::new(function, ReplyFraming::Raw);
        let locator = env.resources().make_loadable_resource(script);
        Self::from_core(WorkerCore::spawn(env, locator, true, &options))
    }

    /// Run `function` once on a fresh worker and resolve with its result
    ///
    /// # Example
    /// ```no_run
    /// # use worker_stream::WorkerStream;
    /// # #[tokio::main]
    /// # async fn main() {
    /// let echoed = WorkerStream::execute(
    ///     |data: String| async move { Ok::<_, String>(data) },
    ///     "some data".to_string(),
    /// )
    /// .await;
    /// assert_eq!(echoed.unwrap(), "some data");
    /// # }
    /// ```
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

impl<T, R> Clone for WorkerStream<T, R> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            _types: PhantomData,
        }
    }
}

impl<T, R> ObservableWorkerStream<T, R> for WorkerStream<T, R>
where
    T: Serialize,
    R: DeserializeOwned + Send + 'static,
{
    fn observe(&self) -> Observable<R> {
        WorkerStream::observe(self)
    }

    fn post_message(&self, value: T) {
        WorkerStream::post_message(self, value);
    }

    fn complete(&self) {
        WorkerStream::complete(self);
    }

    fn state(&self) -> StreamState {
        WorkerStream::state(self)
    }
}

/// Detaches a subscription's listener when its stream is dropped
struct ListenerGuard {
    handle: Arc<dyn ThreadHandle>,
    id: ListenerId,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.handle.remove_listener(self.id);
    }
}
