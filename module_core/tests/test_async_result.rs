use common::session::SessionData;
use module_core::async_result::{AsyncResult, AsyncState};
use tokio::time::timeout;

#[tokio::test]
pub async fn result_starts_not_finished() {
    let result = AsyncResult::<()>::new();
    assert_eq!(result.result(), AsyncState::NotFinished);
    assert_eq!(result.error_message(), None);
}

#[tokio::test]
pub async fn worker_completion_delivered_to_waiting_owner() {
    let result = AsyncResult::<()>::new();
    let worker_result = result.clone();
    tokio::spawn(async move {
        worker_result.set_result(AsyncState::Ok, None);
    });

    let state = timeout(
        std::time::Duration::from_millis(100),
        result.wait_for_finished(),
    )
    .await
    .expect("Result not finished in timeout");
    assert_eq!(state, AsyncState::Ok);
    assert_eq!(result.result(), AsyncState::Ok);
}

#[tokio::test]
pub async fn wait_for_finished_returns_for_already_finished_result() {
    let result = AsyncResult::<()>::new();
    result.set_result(AsyncState::Error, Some("not found".to_string()));
    let state = result.wait_for_finished().await;
    assert_eq!(state, AsyncState::Error);
    assert_eq!(result.error_message(), Some("not found".to_string()));
}

#[tokio::test]
pub async fn second_completion_is_ignored() {
    let result = AsyncResult::<()>::new();
    result.set_result(AsyncState::Ok, None);
    result.set_result(AsyncState::Error, Some("too late".to_string()));
    assert_eq!(result.result(), AsyncState::Ok);
    assert_eq!(result.error_message(), None);
}

#[tokio::test]
pub async fn completing_with_not_finished_is_ignored() {
    let result = AsyncResult::<()>::new();
    result.set_result(AsyncState::NotFinished, None);
    assert_eq!(result.result(), AsyncState::NotFinished);
}

#[tokio::test]
pub async fn value_only_readable_on_success() {
    let result = AsyncResult::<SessionData>::new();
    assert_eq!(result.value(), None);

    let worker_result = result.clone();
    let session = common::test_helper::session::get_session();
    let exp_session = session.clone();
    tokio::spawn(async move {
        worker_result.set_result_value(session);
    });

    let state = timeout(
        std::time::Duration::from_millis(100),
        result.wait_for_finished(),
    )
    .await
    .expect("Result not finished in timeout");
    assert_eq!(state, AsyncState::Ok);
    assert_eq!(result.value(), Some(exp_session));
}

#[tokio::test]
pub async fn failed_value_result_has_no_value() {
    let result = AsyncResult::<SessionData>::new();
    result.set_result(AsyncState::Error, Some("storage error".to_string()));
    assert_eq!(result.value(), None);
    assert_eq!(result.error_message(), Some("storage error".to_string()));
}

#[tokio::test]
pub async fn done_subscription_observes_terminal_state() {
    let result = AsyncResult::<()>::new();
    let mut done = result.done();
    assert_eq!(*done.borrow(), AsyncState::NotFinished);

    let worker_result = result.clone();
    tokio::spawn(async move {
        worker_result.set_result(AsyncState::Ok, None);
    });

    timeout(std::time::Duration::from_millis(100), done.changed())
        .await
        .expect("done not signalled in timeout")
        .unwrap();
    assert_eq!(*done.borrow(), AsyncState::Ok);
}

#[tokio::test]
pub async fn completions_observed_in_order() {
    let first = AsyncResult::<()>::new();
    let second = AsyncResult::<()>::new();
    let worker_first = first.clone();
    let worker_second = second.clone();
    tokio::spawn(async move {
        worker_first.set_result(AsyncState::Ok, None);
        worker_second.set_result(AsyncState::Ok, None);
    });

    timeout(
        std::time::Duration::from_millis(100),
        second.wait_for_finished(),
    )
    .await
    .expect("Result not finished in timeout");
    // the first result was completed before the second one
    assert_eq!(first.result(), AsyncState::Ok);
}
