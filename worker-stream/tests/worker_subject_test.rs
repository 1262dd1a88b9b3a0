//! Tests for the shared worker subject

mod common;

use common::{TEST_TIMEOUT, init_tracing, setup_manual_env, setup_refusing_env};
use futures::StreamExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use worker_stream::{
    ReplyFraming, ResourceRegistry, StreamState, WorkerEnv, WorkerError, WorkerOptions,
    WorkerScript, WorkerSubject,
};

#[tokio::test]
async fn test_execute_round_trip() {
    init_tracing();

    let result = timeout(
        TEST_TIMEOUT,
        WorkerSubject::execute(
            |data: String| async move { Ok::<_, String>(data) },
            "some data".to_string(),
        ),
    )
    .await
    .unwrap();

    assert_eq!(result, Ok("some data".to_string()));
}

#[tokio::test]
async fn test_execute_rejection_carries_reason() {
    let result = timeout(
        TEST_TIMEOUT,
        WorkerSubject::execute(|_: ()| async { Err::<(), _>("reason") }, ()),
    )
    .await
    .unwrap();

    let error = tokio_test::assert_err!(result);
    assert_eq!(error, WorkerError::Application(json!("reason")));
    assert_eq!(error.to_string(), "Worker function failed: \"reason\"");
}

#[tokio::test]
async fn test_envelope_error_wins_over_result() {
    // A raw script replying with both markers, loaded from a caller-owned locator
    let env = WorkerEnv::native();
    let locator = env.resources().make_loadable_resource(WorkerScript::new(
        |_: Value| async { Ok::<_, String>(json!({ "result": 1, "error": "both" })) },
        ReplyFraming::Raw,
    ));

    let worker: WorkerSubject<(), i32> =
        WorkerSubject::with_env(&env, locator.clone(), WorkerOptions::new());
    let observed = worker.observe();
    worker.post_message(());

    let result = timeout(TEST_TIMEOUT, observed.last()).await.unwrap();
    assert_eq!(result, Err(WorkerError::Application(json!("both"))));
    assert_eq!(worker.state(), StreamState::Errored);

    worker.complete();
    assert!(env.resources().resolve(&locator).is_some());
}

#[tokio::test]
async fn test_subscribers_share_values() {
    let worker = WorkerSubject::from_function(
        |n: u32| async move { Ok::<_, String>(n + 1) },
        WorkerOptions::new().with_name("incrementer"),
    );

    let a = worker.observe().take(2).into_stream();
    let b = worker.observe().take(2).into_stream();
    worker.post_message(1);
    worker.post_message(2);

    let (a, b) = timeout(TEST_TIMEOUT, async {
        futures::join!(a.collect::<Vec<_>>(), b.collect::<Vec<_>>())
    })
    .await
    .unwrap();

    assert_eq!(a, vec![Ok(2), Ok(3)]);
    assert_eq!(a, b);
    worker.complete();
}

#[tokio::test]
async fn test_application_error_is_shared_and_terminal() {
    let worker = WorkerSubject::from_function(
        |n: i32| async move {
            if n < 0 {
                Err(format!("negative input {}", n))
            } else {
                Ok(n)
            }
        },
        WorkerOptions::new(),
    );

    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    let observed = worker.observe().tap(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    worker.post_message(1);
    worker.post_message(-1);
    worker.post_message(2);

    let result = timeout(TEST_TIMEOUT, observed.last()).await.unwrap();
    assert_eq!(
        result,
        Err(WorkerError::Application(json!("negative input -1")))
    );
    assert_eq!(delivered.load(Ordering::SeqCst), 1);

    // Late subscribers see the same failure
    let late = timeout(TEST_TIMEOUT, worker.observe().first()).await.unwrap();
    assert_eq!(late, Err(WorkerError::Application(json!("negative input -1"))));
}

#[tokio::test]
async fn test_complete_discards_pending_results() {
    let worker = WorkerSubject::from_function(
        |data: String| async move {
            if data == "b" {
                sleep(Duration::from_millis(300)).await;
            }
            Ok::<_, String>(data)
        },
        WorkerOptions::new(),
    );

    let mut observed = worker.observe();
    worker.post_message("a".to_string());
    worker.post_message("b".to_string());

    let first = timeout(TEST_TIMEOUT, observed.next()).await.unwrap();
    assert_eq!(first, Some(Ok("a".to_string())));

    worker.complete();
    assert_eq!(timeout(TEST_TIMEOUT, observed.next()).await.unwrap(), None);
    assert_eq!(worker.state(), StreamState::Completed);
}

#[tokio::test]
async fn test_unknown_locator_fails_construction() {
    let worker: WorkerSubject<i32, i32> =
        WorkerSubject::new("worker-script:missing", WorkerOptions::new());

    let result = timeout(TEST_TIMEOUT, worker.observe().first()).await.unwrap();
    assert!(matches!(result, Err(WorkerError::Construction(_))));
}

#[tokio::test]
async fn test_refused_thread_fails_execute() {
    let (env, resources) = setup_refusing_env("no threads");

    let result = timeout(
        TEST_TIMEOUT,
        WorkerSubject::execute_in(&env, |n: i32| async move { Ok::<_, String>(n) }, 1),
    )
    .await
    .unwrap();

    assert_eq!(result, Err(WorkerError::Construction("no threads".into())));
    assert_eq!(resources.revocations().len(), 1);
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let (env, threads, resources) = setup_manual_env();
    let worker = WorkerSubject::from_function_in(
        &env,
        |n: i32| async move { Ok::<_, String>(n) },
        WorkerOptions::new(),
    );
    let clone = worker.clone();

    worker.complete();
    clone.terminate();
    worker.terminate();
    drop(worker);
    drop(clone);

    assert_eq!(resources.revocations().len(), 1);
    assert_eq!(threads.last().unwrap().terminate_calls(), 1);
}

#[tokio::test]
async fn test_ignores_events_after_terminal_state() {
    let (env, threads, _) = setup_manual_env();
    let worker: WorkerSubject<(), i32> =
        WorkerSubject::with_env(&env, "w.js", WorkerOptions::new());
    let observed = worker.observe();

    let thread = threads.last().unwrap();
    thread.emit_message(json!({ "result": 1 }));
    thread.emit_error(WorkerError::Runtime("first".into()));
    thread.emit_error(WorkerError::Runtime("second".into()));
    thread.emit_message(json!({ "result": 2 }));

    let items: Vec<_> = timeout(TEST_TIMEOUT, observed.into_stream().collect())
        .await
        .unwrap();
    assert_eq!(items, vec![Ok(1), Err(WorkerError::Runtime("first".into()))]);
}
