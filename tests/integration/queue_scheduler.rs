//! Task queue and generation scheduler driving real relay requests.

use crate::integration::test_utils::{completion_body, dispatcher, registry_with, relay_client};
use genrelay::error::ApiError;
use genrelay::provider::{PromptMessage, RELAY_GENERATE_PATH};
use genrelay::queue::{GenerationJob, GenerationScheduler, QueueOrder, Task, TaskQueue};
use serde_json::Value;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn job(preset: &str, priority: f64, text: &str) -> GenerationJob {
    GenerationJob {
        preset: preset.to_string(),
        priority,
        messages: vec![PromptMessage::new("user", text)],
    }
}

async fn sent_contents(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| {
            let body: Value = request.body_json().unwrap();
            body["messages"][0]["content"].as_str().unwrap().to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_sequential_batch_hits_relay_in_priority_order() {
    let server = MockServer::start().await;
    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let dispatcher = Arc::new(dispatcher(&registry, relay_client(&server.uri())));

    for order in [QueueOrder::Ascending, QueueOrder::Descending] {
        server.reset().await;
        Mock::given(method("POST"))
            .and(path(RELAY_GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("done")))
            .mount(&server)
            .await;

        let mut scheduler = GenerationScheduler::new(order, Arc::clone(&dispatcher));
        scheduler.submit(job("summary", 1.0, "low")).unwrap();
        scheduler.submit(job("summary", 10.0, "urgent")).unwrap();
        scheduler.submit(job("summary", 5.0, "normal")).unwrap();

        let outcomes = scheduler.run_sequential().await.unwrap();
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert_eq!(
            sent_contents(&server).await,
            vec!["urgent", "normal", "low"],
            "order {:?}",
            order
        );
    }
}

#[tokio::test]
async fn test_unordered_batch_is_lifo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RELAY_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("done")))
        .mount(&server)
        .await;

    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let dispatcher = Arc::new(dispatcher(&registry, relay_client(&server.uri())));
    let mut scheduler = GenerationScheduler::new(QueueOrder::Unordered, dispatcher);
    scheduler.submit(job("summary", 9.0, "first")).unwrap();
    scheduler.submit(job("summary", 1.0, "second")).unwrap();
    scheduler.submit(job("summary", 5.0, "third")).unwrap();

    scheduler.run_sequential().await.unwrap();
    assert_eq!(sent_contents(&server).await, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn test_one_failing_job_does_not_stop_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RELAY_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let registry = registry_with(&[("summary", "openai", "gpt-4o-mini")]);
    let dispatcher = Arc::new(dispatcher(&registry, relay_client(&server.uri())));
    let mut scheduler = GenerationScheduler::new(QueueOrder::Descending, dispatcher);
    scheduler.submit(job("summary", 2.0, "a")).unwrap();
    scheduler.submit(job("missing", 1.0, "b")).unwrap();

    let mut outcomes = scheduler.run_concurrent(4).await.unwrap();
    outcomes.sort_by_key(|o| o.index);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].result.as_ref().unwrap_err().status(), Some(503));
    assert!(matches!(
        outcomes[1].result,
        Err(ApiError::PresetNotFound(_))
    ));
}

#[test]
fn test_queue_returns_action_results_unchanged() {
    let mut queue: TaskQueue<i32, Result<i32, String>> =
        TaskQueue::new(Vec::new(), false, true).unwrap();
    queue
        .push(Task::new(|params: Vec<i32>| Ok(params.iter().sum()), vec![1, 2, 3], 2.0))
        .unwrap();
    queue
        .push(Task::new(
            |_: Vec<i32>| Err("boom".to_string()),
            Vec::new(),
            1.0,
        ))
        .unwrap();

    assert_eq!(queue.pop_exec().unwrap(), Some(Ok(6)));
    assert_eq!(queue.pop_exec().unwrap(), Some(Err("boom".to_string())));
    assert_eq!(queue.pop_exec().unwrap(), None);
}

#[test]
fn test_queue_rejects_uninvocable_task() {
    let task: Task<(), ()> = Task {
        action: None,
        params: Vec::new(),
        priority: 0.0,
    };
    let err = TaskQueue::exec(Some(task)).unwrap_err();
    assert!(matches!(err, ApiError::InvalidTask(_)));
    assert!(matches!(
        TaskQueue::<(), ()>::exec(None),
        Err(ApiError::InvalidTask(_))
    ));
}
