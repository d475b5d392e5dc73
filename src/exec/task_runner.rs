// src/exec/task_runner.rs

//! Runs a single scheduled task.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::dag::{Dispatch, TaskAction};
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::pipeline::{BuildContext, compile, copy};
use crate::{serve, watch};

/// Run one task and report its outcome to the runtime.
///
/// - Finite tasks send `TaskCompleted` when their action returns.
/// - Long-lived tasks send `TaskProgressed` once they are up, then stay
///   alive until the stop channel fires or is dropped. They only send
///   `TaskCompleted` if startup fails.
pub async fn run_task(
    task: Dispatch,
    ctx: Arc<BuildContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    stop_rx: oneshot::Receiver<()>,
) {
    let task_name = task.name.clone();
    let run = task.run;

    let result = if task.long_lived() {
        run_long_lived(&task, &ctx, &runtime_tx, stop_rx).await
    } else {
        run_finite(&task, &ctx).await
    };

    let outcome = match result {
        Ok(Some(())) => TaskOutcome::Success,
        Ok(None) => return,
        Err(err) => {
            error!(task = %task_name, run, error = %format!("{err:#}"), "task failed");
            TaskOutcome::Failed
        }
    };

    info!(task = %task_name, run, ?outcome, "task finished");
    let _ = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task_name,
            outcome,
        })
        .await;
}

/// `Ok(Some(()))` means completed; finite tasks always complete.
async fn run_finite(task: &Dispatch, ctx: &BuildContext) -> Result<Option<()>> {
    match task.action {
        TaskAction::Group => {}
        TaskAction::ElmInit => compile::init(ctx).await?,
        TaskAction::Compile => {
            let report = compile::compile_all(ctx).await?;
            info!(
                task = %task.name,
                processed = report.processed,
                failed = report.failed.len(),
                "compile batch done"
            );
        }
        TaskAction::CopyStatic => {
            let report = copy::copy_all(ctx).await?;
            info!(
                task = %task.name,
                processed = report.processed,
                failed = report.failed.len(),
                "static batch done"
            );
        }
        TaskAction::Serve | TaskAction::Watch => {
            anyhow::bail!("task '{}' is long-lived", task.name)
        }
    }
    Ok(Some(()))
}

/// `Ok(None)` means the task ran until stopped and reports nothing more.
async fn run_long_lived(
    task: &Dispatch,
    ctx: &BuildContext,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    stop_rx: oneshot::Receiver<()>,
) -> Result<Option<()>> {
    // Each guard keeps its service alive until dropped.
    let guard: Box<dyn Send> = match task.action {
        TaskAction::Serve => {
            let server = serve::start(ctx.serve_root(), ctx.server_addr())
                .with_context(|| format!("starting server for task '{}'", task.name))?;
            info!(task = %task.name, addr = %server.addr(), "serving {}", ctx.serve_root().display());
            Box::new(server)
        }
        TaskAction::Watch => {
            let profiles = watch::build_profiles(ctx)?;
            let watcher = watch::spawn_watcher(
                ctx.root().to_path_buf(),
                profiles,
                runtime_tx.clone(),
                ctx.watch().use_hash,
            )
            .with_context(|| format!("starting watcher for task '{}'", task.name))?;
            Box::new(watcher)
        }
        _ => anyhow::bail!("task '{}' is not long-lived", task.name),
    };

    runtime_tx
        .send(RuntimeEvent::TaskProgressed {
            task: task.name.clone(),
        })
        .await
        .with_context(|| format!("sending progress for task '{}'", task.name))?;

    match stop_rx.await {
        Ok(()) => info!(task = %task.name, "stop requested"),
        Err(_) => debug!(task = %task.name, "executor gone; stopping"),
    }
    drop(guard);

    Ok(None)
}
