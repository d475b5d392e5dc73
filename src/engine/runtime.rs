// src/engine/runtime.rs

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::{CoreRuntime, RuntimeEvent};
use crate::errors::Result;
use crate::exec::Executor;

/// Feed events into `core` until it asks to stop, handing every dispatched
/// task to `executor`.
///
/// Ends with [`CoreRuntime::finish`]: an error when a server or watcher
/// failed, or when a finite target finished with failed tasks.
pub async fn drive<E: Executor>(
    mut core: CoreRuntime,
    mut events: mpsc::Receiver<RuntimeEvent>,
    mut executor: E,
) -> Result<()> {
    while let Some(event) = events.recv().await {
        debug!(?event, "event");
        let reaction = core.step(event);

        if !reaction.dispatch.is_empty() {
            executor.dispatch(reaction.dispatch)?;
        }
        if reaction.stop {
            break;
        }
    }

    if core.failed().is_empty() {
        info!("stopped");
    } else {
        info!(failed = ?core.failed(), "stopped with failed tasks");
    }
    core.finish()
}
