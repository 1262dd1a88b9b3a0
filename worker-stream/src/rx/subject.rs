//! Subject implementation (RxJS-like)

use super::{Observable, Subscription};
use crate::error::{Result, WorkerError};
use crate::reactive::MessageStream;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Terminal status of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Active,
    Errored,
    Completed,
}

impl StreamState {
    pub fn is_stopped(self) -> bool {
        self != Self::Active
    }
}

/// Subject - both Observable and Observer (RxJS-like)
///
/// A Subject is a special type of Observable that allows values to be
/// multicasted to many Observers. Once it errors or completes it is stopped:
/// later `next`/`error`/`complete` calls are ignored, and late subscribers
/// receive the terminal notification straight away.
///
/// # Example
/// ```no_run
/// # use worker_stream::rx::Subject;
/// # #[tokio::main]
/// # async fn main() {
/// let subject = Subject::new();
///
/// // Subscribe
/// subject.subscribe(|value| {
///     tracing::info!("Subscriber 1: {}", value);
/// });
///
/// subject.subscribe(|value| {
///     tracing::info!("Subscriber 2: {}", value);
/// });
///
/// // Emit values
/// subject.next(1);
/// subject.next(2);
/// subject.complete();
/// # }
/// ```
pub struct Subject<T: Clone + Send + 'static> {
    inner: Arc<Mutex<SubjectState<T>>>,
}

struct SubjectState<T> {
    status: StreamState,
    error: Option<WorkerError>,
    observers: Vec<mpsc::UnboundedSender<Result<T>>>,
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Create a new Subject
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SubjectState {
                status: StreamState::Active,
                error: None,
                observers: Vec::new(),
            })),
        }
    }

    /// Emit a value to all subscribers
    pub fn next(&self, value: T) {
        let mut state = self.inner.lock();
        if state.status.is_stopped() {
            return;
        }

        // Drop observers whose stream is gone
        state
            .observers
            .retain(|observer| observer.send(Ok(value.clone())).is_ok());
    }

    /// Emit an error to all subscribers and stop
    pub fn error(&self, error: WorkerError) {
        let mut state = self.inner.lock();
        if state.status.is_stopped() {
            return;
        }

        state.status = StreamState::Errored;
        for observer in state.observers.drain(..) {
            let _ = observer.send(Err(error.clone()));
        }
        state.error = Some(error);
    }

    /// Signal completion to all subscribers and stop
    pub fn complete(&self) {
        let mut state = self.inner.lock();
        if state.status.is_stopped() {
            return;
        }

        state.status = StreamState::Completed;
        // Dropping the senders ends every observer stream
        state.observers.clear();
    }

    pub fn state(&self) -> StreamState {
        self.inner.lock().status
    }

    pub fn is_stopped(&self) -> bool {
        self.state().is_stopped()
    }

    /// Number of attached observers
    pub fn observer_count(&self) -> usize {
        self.inner.lock().observers.len()
    }

    /// Convert Subject to Observable
    ///
    /// Values emitted before this call are not replayed.
    pub fn observe(&self) -> Observable<T> {
        let mut state = self.inner.lock();
        match state.status {
            StreamState::Active => {
                let (tx, rx) = mpsc::unbounded_channel();
                state.observers.push(tx);
                Observable::from_stream(MessageStream::new(rx))
            }
            StreamState::Errored => match &state.error {
                Some(error) => Observable::error(error.clone()),
                None => Observable::empty(),
            },
            StreamState::Completed => Observable::empty(),
        }
    }

    /// Subscribe to this Subject
    ///
    /// Returns a Subscription handle that can be used to unsubscribe.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: FnMut(T) + Send + 'static,
    {
        self.observe().subscribe_next(observer)
    }
}

impl<T: Clone + Send + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    #[test]
    fn test_subject_default() {
        let subject: Subject<i32> = Subject::default();
        assert_eq!(subject.state(), StreamState::Active);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_subject_clone_shares_state() {
        let subject1: Subject<i32> = Subject::new();
        let subject2 = subject1.clone();
        subject2.complete();
        assert!(subject1.is_stopped());
    }

    #[tokio::test]
    async fn test_subject_multicast() {
        let subject = Subject::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&counter);
        let sub1 = subject.subscribe(move |_value: i32| {
            c1.fetch_add(1, Ordering::SeqCst);
        });

        let c2 = Arc::clone(&counter);
        let sub2 = subject.subscribe(move |_value: i32| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        subject.next(1);
        subject.next(2);

        sleep(Duration::from_millis(100)).await;

        // Both subscribers should receive both messages
        assert_eq!(counter.load(Ordering::SeqCst), 4);

        sub1.unsubscribe();
        sub2.unsubscribe();
    }

    #[tokio::test]
    async fn test_subject_complete() {
        let subject = Subject::new();
        let observed = subject.observe();

        subject.next(1);
        subject.complete();
        subject.next(2); // Should not be received

        let values: Vec<_> = observed.into_stream().collect().await;
        assert_eq!(values, vec![Ok(1)]);
        assert_eq!(subject.state(), StreamState::Completed);
    }

    #[tokio::test]
    async fn test_subject_error() {
        let subject = Subject::new();
        let observed = subject.observe();

        subject.next(1);
        subject.error(WorkerError::Runtime("boom".into()));
        subject.next(2); // Should not be received
        subject.complete(); // Already stopped

        let values: Vec<_> = observed.into_stream().collect().await;
        assert_eq!(values, vec![Ok(1), Err(WorkerError::Runtime("boom".into()))]);
        assert_eq!(subject.state(), StreamState::Errored);
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_terminal_state() {
        let errored: Subject<i32> = Subject::new();
        errored.error(WorkerError::NoValue);
        assert_eq!(errored.observe().first().await, Err(WorkerError::NoValue));

        let completed: Subject<i32> = Subject::new();
        completed.complete();
        assert_eq!(completed.observe().last().await, Ok(None));
    }

    #[tokio::test]
    async fn test_dropped_observer_is_pruned() {
        let subject = Subject::new();
        let observed = subject.observe();
        assert_eq!(subject.observer_count(), 1);

        drop(observed);
        subject.next(1);
        assert_eq!(subject.observer_count(), 0);
    }
}
