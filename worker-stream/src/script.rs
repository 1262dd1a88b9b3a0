//! Worker functions and their loadable script form

use crate::envelope::Envelope;
use crate::error::WorkerError;
use crate::runtime::ThreadEvent;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A unary function a worker thread can run
///
/// Implemented for every `Fn(T) -> impl Future<Output = Result<R, E>>`, so plain
/// async closures work directly:
///
/// ```
/// # use worker_stream::WorkerFunction;
/// fn assert_worker_fn<F: WorkerFunction<u32, u32>>(_: F) {}
/// assert_worker_fn(|n: u32| async move { Ok::<_, String>(n * 2) });
/// ```
pub trait WorkerFunction<T, R>: Send + Sync + 'static {
    /// Failure value, serialised as the application error payload
    type Error: Serialize;
    type Future: Future<Output = Result<R, Self::Error>> + Send + 'static;

    fn call(&self, input: T) -> Self::Future;
}

impl<F, Fut, T, R, E> WorkerFunction<T, R> for F
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    E: Serialize,
{
    type Error = E;
    type Future = Fut;

    fn call(&self, input: T) -> Self::Future {
        self(input)
    }
}

/// How a script reports the outcome of each call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFraming {
    /// Results are plain messages, failures go out on the error channel
    Raw,
    /// Results and failures are both messages wrapped in an [`Envelope`]
    Envelope,
}

type ScriptBody = dyn Fn(Value) -> BoxFuture<'static, ThreadEvent> + Send + Sync;

/// Type-erased, loadable form of a [`WorkerFunction`]
///
/// Inputs and outputs cross the thread boundary as JSON values.
#[derive(Clone)]
pub struct WorkerScript {
    framing: ReplyFraming,
    body: Arc<ScriptBody>,
}

impl WorkerScript {
    /// Wrap a typed function
    pub fn new<T, R, F>(function: F, framing: ReplyFraming) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: WorkerFunction<T, R>,
    {
        let function = Arc::new(function);

        let body = move |input: Value| -> BoxFuture<'static, ThreadEvent> {
            let function = Arc::clone(&function);
            Box::pin(async move {
                let input: T = match serde_json::from_value(input) {
                    Ok(input) => input,
                    Err(e) => {
                        return ThreadEvent::Error(WorkerError::Runtime(format!(
                            "Invalid worker input: {}",
                            e
                        )));
                    }
                };

                match function.call(input).await {
                    Ok(result) => match serde_json::to_value(result) {
                        Ok(value) => reply(framing, value),
                        Err(e) => ThreadEvent::Error(WorkerError::Runtime(format!(
                            "Unserializable worker result: {}",
                            e
                        ))),
                    },
                    Err(reason) => match serde_json::to_value(reason) {
                        Ok(reason) => fail(framing, reason),
                        Err(e) => ThreadEvent::Error(WorkerError::Runtime(format!(
                            "Unserializable worker error: {}",
                            e
                        ))),
                    },
                }
            })
        };

        Self {
            framing,
            body: Arc::new(body),
        }
    }

    pub fn framing(&self) -> ReplyFraming {
        self.framing
    }

    /// Run the script once. The returned event is what the thread dispatches.
    pub fn invoke(&self, input: Value) -> BoxFuture<'static, ThreadEvent> {
        (self.body)(input)
    }
}

impl fmt::Debug for WorkerScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerScript")
            .field("framing", &self.framing)
            .finish_non_exhaustive()
    }
}

fn reply(framing: ReplyFraming, value: Value) -> ThreadEvent {
    match framing {
        ReplyFraming::Raw => ThreadEvent::Message(value),
        ReplyFraming::Envelope => ThreadEvent::Message(Envelope::Result(value).into_value()),
    }
}

fn fail(framing: ReplyFraming, reason: Value) -> ThreadEvent {
    match framing {
        ReplyFraming::Raw => ThreadEvent::Error(WorkerError::Application(reason)),
        ReplyFraming::Envelope => ThreadEvent::Message(Envelope::Error(reason).into_value()),
    }
}
