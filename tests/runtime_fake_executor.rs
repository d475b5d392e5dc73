// tests/runtime_fake_executor.rs

use std::sync::{Arc, Mutex};

use elmdev::dag::{TaskAction, TaskGraph};
use elmdev::engine::{CoreRuntime, RuntimeEvent, StopPolicy, TaskOutcome, drive};
use elmdev::types::TriggerWhileRunningBehaviour;
use elmdev::errors::ElmdevError;
use elmdev_test_utils::builders::TaskGraphBuilder;
use elmdev_test_utils::fake_executor::FakeExecutor;
use elmdev_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

struct Harness {
    tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    handle: tokio::task::JoinHandle<elmdev::errors::Result<()>>,
}

fn start(graph: TaskGraph, policy: StopPolicy, failing: &[&str]) -> Harness {
    init_tracing();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor =
        FakeExecutor::new(tx.clone(), Arc::clone(&executed)).failing(failing.iter().copied());

    let core = CoreRuntime::new(graph, TriggerWhileRunningBehaviour::Queue, policy);
    let handle = tokio::spawn(drive(core, rx, executor));

    Harness {
        tx,
        executed,
        handle,
    }
}

async fn trigger(tx: &mpsc::Sender<RuntimeEvent>, task: &str) {
    tx.send(RuntimeEvent::trigger(task)).await.unwrap();
}

fn position(executed: &[String], task: &str) -> usize {
    executed
        .iter()
        .position(|t| t == task)
        .unwrap_or_else(|| panic!("{task} was not executed: {executed:?}"))
}

#[tokio::test]
async fn build_runs_prerequisites_before_dependents() {
    let h = start(TaskGraph::standard().unwrap(), StopPolicy::WhenIdle, &[]);
    trigger(&h.tx, "build").await;

    with_timeout(h.handle).await.unwrap().unwrap();

    let executed = h.executed.lock().unwrap().clone();
    assert_eq!(executed.len(), 4, "{executed:?}");
    assert!(position(&executed, "elm-init") < position(&executed, "elm"));
    assert!(position(&executed, "elm") < position(&executed, "build"));
    assert!(position(&executed, "static") < position(&executed, "build"));
    assert!(!executed.iter().any(|t| t == "watch" || t == "connect"));
}

#[tokio::test]
async fn default_completes_once_services_report_progress() {
    let h = start(TaskGraph::standard().unwrap(), StopPolicy::OnShutdown, &[]);
    trigger(&h.tx, "default").await;

    // The run finishes logically; the runtime keeps going until shutdown.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!h.handle.is_finished());
    {
        let executed = h.executed.lock().unwrap();
        assert_eq!(executed.last().map(String::as_str), Some("default"));
        assert_eq!(executed.len(), 7);
    }

    h.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(h.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_task_skips_dependents_and_fails_the_run() {
    let h = start(TaskGraph::standard().unwrap(), StopPolicy::WhenIdle, &["elm-init"]);
    trigger(&h.tx, "build").await;

    let result = with_timeout(h.handle).await.unwrap();
    match result {
        Err(ElmdevError::TasksFailed(tasks)) => {
            assert_eq!(tasks, vec!["build", "elm", "elm-init"]);
        }
        other => panic!("expected TasksFailed, got {other:?}"),
    }

    let executed = h.executed.lock().unwrap().clone();
    assert!(executed.contains(&"static".to_string()));
    assert!(!executed.contains(&"elm".to_string()));
    assert!(!executed.contains(&"build".to_string()));
}

#[tokio::test]
async fn server_failure_stops_the_runtime() {
    let h = start(TaskGraph::standard().unwrap(), StopPolicy::OnShutdown, &["connect"]);
    trigger(&h.tx, "default").await;

    let result = with_timeout(h.handle).await.unwrap();
    assert!(
        matches!(result, Err(ElmdevError::ServiceFailed(ref t)) if t == "connect"),
        "{result:?}"
    );
}

#[tokio::test]
async fn file_change_reruns_only_the_changed_task() {
    let h = start(TaskGraph::standard().unwrap(), StopPolicy::OnShutdown, &[]);
    trigger(&h.tx, "default").await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    h.executed.lock().unwrap().clear();

    trigger(&h.tx, "elm").await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert_eq!(*h.executed.lock().unwrap(), vec!["elm"]);

    h.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(h.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn prerequisite_that_never_succeeded_is_pulled_back_in() {
    let h = start(TaskGraph::standard().unwrap(), StopPolicy::OnShutdown, &[]);
    trigger(&h.tx, "watch").await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    trigger(&h.tx, "elm").await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert_eq!(*h.executed.lock().unwrap(), vec!["watch", "elm-init", "elm"]);

    h.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(h.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn custom_graph_runs_independent_roots_together() {
    let graph = TaskGraphBuilder::new()
        .task("a", TaskAction::Group, &[])
        .task("b", TaskAction::Group, &[])
        .task("c", TaskAction::Group, &["a", "b"])
        .build();
    let h = start(graph, StopPolicy::WhenIdle, &[]);
    trigger(&h.tx, "c").await;

    with_timeout(h.handle).await.unwrap().unwrap();
    assert_eq!(*h.executed.lock().unwrap(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn completion_outcome_for_unknown_task_is_ignored() {
    let h = start(TaskGraph::standard().unwrap(), StopPolicy::OnShutdown, &[]);
    h.tx.send(RuntimeEvent::TaskCompleted {
        task: "nope".to_string(),
        outcome: TaskOutcome::Failed,
    })
    .await
    .unwrap();
    h.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();

    with_timeout(h.handle).await.unwrap().unwrap();
    assert!(h.executed.lock().unwrap().is_empty());
}
