//! Observable implementation (RxJS-like)

use crate::error::{Result, WorkerError};
use futures::{Stream, StreamExt, stream};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tokio::sync::Notify;

/// Observer trait - similar to RxJS Observer
pub trait Observer<T>: Send {
    fn next(&mut self, value: T);
    fn error(&mut self, error: WorkerError);
    fn complete(&mut self);
}

/// Subscription handle - similar to RxJS Subscription
///
/// Unsubscribing stops delivery and drops the underlying stream, which detaches
/// any listener the stream holds.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionState>,
}

struct SubscriptionState {
    is_active: AtomicBool,
    cancel: Notify,
}

impl Subscription {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SubscriptionState {
                is_active: AtomicBool::new(true),
                cancel: Notify::new(),
            }),
        }
    }

    /// Unsubscribe from the observable
    pub fn unsubscribe(&self) {
        if self.inner.is_active.swap(false, Ordering::SeqCst) {
            self.inner.cancel.notify_one();
        }
    }

    /// Check if subscription is active
    ///
    /// Also false once the observable has errored or completed.
    pub fn is_active(&self) -> bool {
        self.inner.is_active.load(Ordering::SeqCst)
    }

    fn finish(&self) {
        self.inner.is_active.store(false, Ordering::SeqCst);
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

enum Notification<T> {
    Next(T),
    Error(WorkerError),
    Complete,
}

/// Observable wrapper - similar to RxJS Observable
pub struct Observable<T> {
    stream: Pin<Box<dyn Stream<Item = Result<T>> + Send + 'static>>,
}

impl<T: Send + 'static> Observable<T> {
    /// Create an Observable from a Stream
    ///
    /// The stream should end after its first `Err` item.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
        }
    }

    /// Emit each value, then complete
    pub fn from_iter<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_stream(stream::iter(values.into_iter().map(Ok)))
    }

    /// Fail immediately
    pub fn error(error: WorkerError) -> Self {
        Self::from_stream(stream::once(async move { Err(error) }))
    }

    /// Complete immediately
    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    /// Subscribe with next/error/complete callbacks (RxJS style)
    ///
    /// Callbacks run on a spawned tokio task, so this must be called within a
    /// runtime.
    ///
    /// # Example
    /// ```no_run
    /// # use worker_stream::rx::Observable;
    /// # #[tokio::main]
    /// # async fn main() {
    /// let obs = Observable::from_iter(vec![1, 2, 3]);
    ///
    /// obs.subscribe(
    ///     |value| println!("Next: {}", value),
    ///     |err| eprintln!("Error: {}", err),
    ///     || println!("Complete!")
    /// );
    /// # }
    /// ```
    pub fn subscribe<N, E, C>(self, mut next: N, mut on_error: E, mut complete: C) -> Subscription
    where
        N: FnMut(T) + Send + 'static,
        E: FnMut(WorkerError) + Send + 'static,
        C: FnMut() + Send + 'static,
    {
        self.drive(move |notification| match notification {
            Notification::Next(value) => next(value),
            Notification::Error(err) => on_error(err),
            Notification::Complete => complete(),
        })
    }

    /// Subscribe with only next callback (simplified)
    pub fn subscribe_next<F>(self, next: F) -> Subscription
    where
        F: FnMut(T) + Send + 'static,
    {
        self.subscribe(next, |_| {}, || {})
    }

    /// Subscribe an [`Observer`]
    pub fn subscribe_observer<O>(self, mut observer: O) -> Subscription
    where
        O: Observer<T> + 'static,
    {
        self.drive(move |notification| match notification {
            Notification::Next(value) => observer.next(value),
            Notification::Error(err) => observer.error(err),
            Notification::Complete => observer.complete(),
        })
    }

    fn drive<S>(self, mut sink: S) -> Subscription
    where
        S: FnMut(Notification<T>) + Send + 'static,
    {
        let subscription = Subscription::new();
        let handle = subscription.clone();

        tokio::spawn(async move {
            let mut stream = self.stream;

            while handle.is_active() {
                tokio::select! {
                    _ = handle.inner.cancel.notified() => {
                        tracing::debug!("Observable subscription cancelled");
                        break;
                    }
                    item = stream.next() => match item {
                        Some(Ok(value)) => sink(Notification::Next(value)),
                        Some(Err(err)) => {
                            sink(Notification::Error(err));
                            break;
                        }
                        None => {
                            sink(Notification::Complete);
                            break;
                        }
                    }
                }
            }

            handle.finish();
        });

        subscription
    }

    /// Convert back to Stream for chaining with StreamExt operators
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = Result<T>> + Send + 'static>> {
        self.stream
    }

    /// Map operator - transform values
    pub fn map<F, R>(self, mut f: F) -> Observable<R>
    where
        F: FnMut(T) -> R + Send + 'static,
        R: Send + 'static,
    {
        Observable::from_stream(self.stream.map(move |item| item.map(&mut f)))
    }

    /// Filter operator - filter values
    pub fn filter<F>(self, mut f: F) -> Observable<T>
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        Observable::from_stream(self.stream.filter(move |item| {
            let keep = match item {
                Ok(value) => f(value),
                Err(_) => true,
            };
            async move { keep }
        }))
    }

    /// Tap operator - run a side effect for each value
    pub fn tap<F>(self, mut f: F) -> Observable<T>
    where
        F: FnMut(&T) + Send + 'static,
    {
        Observable::from_stream(self.stream.inspect(move |item| {
            if let Ok(value) = item {
                f(value);
            }
        }))
    }

    /// Take operator - take first N values, then complete
    pub fn take(self, n: usize) -> Observable<T> {
        let mut source = self.stream;
        Observable::from_stream(async_stream::stream! {
            let mut remaining = n;
            while remaining > 0 {
                match source.next().await {
                    Some(Ok(value)) => {
                        remaining -= 1;
                        yield Ok(value);
                    }
                    Some(Err(err)) => {
                        yield Err(err);
                        break;
                    }
                    None => break,
                }
            }
        })
    }

    /// Skip operator - skip first N values
    pub fn skip(self, n: usize) -> Observable<T> {
        let mut source = self.stream;
        Observable::from_stream(async_stream::stream! {
            let mut skipped = 0;
            while let Some(item) = source.next().await {
                match item {
                    Ok(_) if skipped < n => skipped += 1,
                    Ok(value) => {
                        yield Ok(value);
                    }
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        })
    }

    /// Take while predicate is true
    pub fn take_while<F>(self, mut f: F) -> Observable<T>
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        Observable::from_stream(self.stream.take_while(move |item| {
            let result = match item {
                Ok(value) => f(value),
                Err(_) => true,
            };
            async move { result }
        }))
    }

    /// Resolve with the first value
    ///
    /// Fails with the stream's error, or with [`WorkerError::NoValue`] if it
    /// completes empty. The rest of the stream is dropped.
    pub async fn first(self) -> Result<T> {
        let mut stream = self.stream;
        match stream.next().await {
            Some(item) => item,
            None => Err(WorkerError::NoValue),
        }
    }

    /// Resolve with the last value once the stream completes (RxJS `toPromise`)
    ///
    /// `Ok(None)` when it completes without a value.
    pub async fn last(self) -> Result<Option<T>> {
        let mut stream = self.stream;
        let mut last = None;
        while let Some(item) = stream.next().await {
            last = Some(item?);
        }
        Ok(last)
    }
}

// Implement Stream for Observable so it can be used with StreamExt
impl<T> Stream for Observable<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}
