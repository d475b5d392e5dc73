use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use elmdev::dag::Dispatch;
use elmdev::engine::{RuntimeEvent, TaskOutcome};
use elmdev::errors::{ElmdevError, Result};
use elmdev::exec::Executor;
use tokio::sync::mpsc;

/// An executor that runs nothing:
/// - records dispatched task names, in order
/// - answers long-lived tasks with `TaskProgressed`
/// - answers everything else with `TaskCompleted`, failing the tasks listed
///   via [`failing`](Self::failing)
///
/// Answers are forwarded in dispatch order by a background task, so it must
/// be created inside a Tokio runtime.
pub struct FakeExecutor {
    answers: mpsc::UnboundedSender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        let (answers, mut rx) = mpsc::unbounded_channel::<RuntimeEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if runtime_tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Self {
            answers,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing<'a>(mut self, tasks: impl IntoIterator<Item = &'a str>) -> Self {
        self.failing.extend(tasks.into_iter().map(str::to_string));
        self
    }
}

impl Executor for FakeExecutor {
    fn dispatch(&mut self, tasks: Vec<Dispatch>) -> Result<()> {
        for task in tasks {
            self.executed.lock().unwrap().push(task.name.clone());

            let event = if self.failing.contains(&task.name) {
                RuntimeEvent::TaskCompleted {
                    task: task.name,
                    outcome: TaskOutcome::Failed,
                }
            } else if task.long_lived() {
                RuntimeEvent::TaskProgressed { task: task.name }
            } else {
                RuntimeEvent::TaskCompleted {
                    task: task.name,
                    outcome: TaskOutcome::Success,
                }
            };

            self.answers
                .send(event)
                .map_err(|_| ElmdevError::ExecutorGone)?;
        }
        Ok(())
    }
}
