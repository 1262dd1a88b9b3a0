//! RxJS-style reactive programming for Rust
//!
//! Streams carry `Result<T, WorkerError>` items. An `Err` item is the error
//! notification and is always the last item; the end of the stream is the
//! completion notification.

pub mod observable;
pub mod operators;
pub mod subject;

pub use observable::{Observable, Observer, Subscription};
pub use subject::{StreamState, Subject};

pub use operators::merge;
