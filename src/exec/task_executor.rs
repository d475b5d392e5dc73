// src/exec/task_executor.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dag::Dispatch;
use crate::engine::{RuntimeEvent, TaskName};
use crate::errors::{ElmdevError, Result};
use crate::exec::Executor;
use crate::exec::task_runner::run_task;
use crate::pipeline::BuildContext;

/// Runs each dispatched task on its own Tokio task, at most one instance
/// per task name.
pub struct TaskExecutor {
    tx: mpsc::UnboundedSender<Dispatch>,
}

impl TaskExecutor {
    /// Start the executor loop on the current Tokio runtime.
    ///
    /// Services it started are stopped once the returned executor and the
    /// loop are gone.
    pub fn spawn(runtime_tx: mpsc::Sender<RuntimeEvent>, ctx: Arc<BuildContext>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(executor_loop(rx, runtime_tx, ctx));
        Self { tx }
    }
}

impl Executor for TaskExecutor {
    fn dispatch(&mut self, tasks: Vec<Dispatch>) -> Result<()> {
        for task in tasks {
            self.tx.send(task).map_err(|_| ElmdevError::ExecutorGone)?;
        }
        Ok(())
    }
}

struct Instance {
    /// Dropping it stops a long-lived task.
    _stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

async fn executor_loop(
    mut rx: mpsc::UnboundedReceiver<Dispatch>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: Arc<BuildContext>,
) {
    let mut instances: HashMap<TaskName, Instance> = HashMap::new();

    while let Some(task) = rx.recv().await {
        if let Some(previous) = instances.remove(&task.name) {
            if task.long_lived() && !previous.handle.is_finished() {
                debug!(task = %task.name, run = task.run, "already up; reporting progress");
                instances.insert(task.name.clone(), previous);
                let progressed = RuntimeEvent::TaskProgressed { task: task.name };
                if runtime_tx.send(progressed).await.is_err() {
                    break;
                }
                continue;
            }

            // A finite task is only dispatched again after it reported its
            // outcome, but its Tokio task may still be returning.
            if let Err(err) = previous.handle.await {
                warn!(task = %task.name, error = %err, "previous instance did not exit cleanly");
            }
        }

        let name = task.name.clone();
        instances.insert(name, launch(task, &runtime_tx, &ctx));
    }

    debug!(running = instances.len(), "executor loop finished");
}

fn launch(task: Dispatch, runtime_tx: &mpsc::Sender<RuntimeEvent>, ctx: &Arc<BuildContext>) -> Instance {
    let (stop_tx, stop_rx) = oneshot::channel();
    let handle = tokio::spawn(run_task(task, Arc::clone(ctx), runtime_tx.clone(), stop_rx));
    Instance {
        _stop: stop_tx,
        handle,
    }
}
