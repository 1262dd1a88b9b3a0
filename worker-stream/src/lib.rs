//! # Worker Stream
//!
//! Run a function on a background worker thread and consume its results as a
//! reactive stream.
//!
//! ## Features
//!
//! - 🧵 **Worker threads**: each worker runs on its own named OS thread with a
//!   single-threaded Tokio runtime, processing messages in order
//! - 📡 **Cold streams**: [`WorkerStream`] attaches a listener per subscription
//! - 🔔 **Shared subjects**: [`WorkerSubject`] multicasts one listener with a
//!   shared terminal state and envelope-framed replies
//! - 🧪 **Injectable capabilities**: thread creation and script registration go
//!   through [`ThreadFactory`] and [`ResourceRegistry`], with scripted
//!   implementations for tests
//! - 🛡️ **Typed errors**: construction, runtime, application and decode failures
//!   all arrive as [`WorkerError`] on the stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use worker_stream::WorkerStream;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let doubled = WorkerStream::execute(|n: u64| async move { Ok::<_, String>(n * 2) }, 21).await?;
//!     assert_eq!(doubled, 42);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod reactive;
pub mod runtime;
pub mod rx; // RxJS-style reactive programming
pub mod script;
mod worker;
mod worker_stream;
mod worker_subject;

pub use config::WorkerOptions;
pub use envelope::Envelope;
pub use error::{Result, WorkerError};
pub use reactive::MessageStream;
pub use runtime::{
    Listener, ListenerId, ManualResourceRegistry, ManualThread, ManualThreadFactory,
    NativeThreadFactory, ResourceLocator, ResourceRegistry, ScriptRegistry, ThreadEvent,
    ThreadFactory, ThreadHandle, WorkerEnv,
};
pub use rx::StreamState;
pub use script::{ReplyFraming, WorkerFunction, WorkerScript};
pub use worker::ObservableWorkerStream;
pub use worker_stream::WorkerStream;
pub use worker_subject::WorkerSubject;
