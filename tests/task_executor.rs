// tests/task_executor.rs

use std::time::Duration;

use elmdev::dag::{Dispatch, TaskAction};
use elmdev::engine::{RuntimeEvent, TaskOutcome};
use elmdev::exec::{Executor, TaskExecutor};
use elmdev_test_utils::builders::{ConfigFileBuilder, ScratchProject};
use elmdev_test_utils::init_tracing;
use tokio::sync::mpsc;

fn dispatch(name: &str, action: TaskAction, run: u64) -> Vec<Dispatch> {
    vec![Dispatch {
        name: name.to_string(),
        action,
        run,
    }]
}

async fn next_event(rx: &mut mpsc::Receiver<RuntimeEvent>, what: &str) -> RuntimeEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap_or_else(|_| panic!("no event for {what}"))
        .expect("executor dropped the runtime channel")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn finite_task_runs_again_when_dispatched_right_after_completing() {
    init_tracing();
    let p = ScratchProject::new();
    let (tx, mut rx) = mpsc::channel(64);
    let mut executor = TaskExecutor::spawn(tx, p.context(&ConfigFileBuilder::new().build()));

    for run in 1..=500 {
        executor.dispatch(dispatch("group", TaskAction::Group, run)).unwrap();

        let event = next_event(&mut rx, &format!("run {run}")).await;
        assert_eq!(
            event,
            RuntimeEvent::TaskCompleted {
                task: "group".to_string(),
                outcome: TaskOutcome::Success,
            }
        );
    }
}

#[tokio::test]
async fn running_watcher_is_not_started_twice() {
    init_tracing();
    let p = ScratchProject::new();
    p.write("src/Main.elm", "main");
    let (tx, mut rx) = mpsc::channel(64);
    let mut executor = TaskExecutor::spawn(tx, p.context(&ConfigFileBuilder::new().build()));

    let progressed = RuntimeEvent::TaskProgressed {
        task: "watch".to_string(),
    };

    executor.dispatch(dispatch("watch", TaskAction::Watch, 1)).unwrap();
    assert_eq!(next_event(&mut rx, "first start").await, progressed);

    executor.dispatch(dispatch("watch", TaskAction::Watch, 2)).unwrap();
    assert_eq!(next_event(&mut rx, "second dispatch").await, progressed);
}
