// src/watch/event_handler.rs

//! Turns notify events into task triggers.

use std::collections::BTreeSet;
use std::path::Path;

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::hash::ContentHashes;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::TaskWatchProfile;

/// Tasks to trigger for one notify event, deduplicated and sorted.
///
/// With `hashes` set, paths whose content did not change are skipped.
pub fn tasks_for_event(
    root: &Path,
    event: &Event,
    profiles: &[TaskWatchProfile],
    mut hashes: Option<&mut ContentHashes>,
) -> BTreeSet<String> {
    let mut tasks = BTreeSet::new();
    if matches!(event.kind, EventKind::Access(_)) {
        return tasks;
    }

    for path in &event.paths {
        let Some(rel) = relative_str(root, path) else {
            warn!(path = %path.display(), root = %root.display(), "event outside watch root");
            continue;
        };

        let matching: Vec<&TaskWatchProfile> =
            profiles.iter().filter(|p| p.matches(&rel)).collect();
        if matching.is_empty() {
            continue;
        }

        if let Some(hashes) = hashes.as_deref_mut() {
            if !hashes.has_changed(path) {
                debug!(path = %rel, "content unchanged; skipping");
                continue;
            }
        }

        for profile in matching {
            debug!(task = %profile.task(), path = %rel, "watch match");
            tasks.insert(profile.task().to_string());
        }
    }

    tasks
}

/// Send one trigger per task. Returns `false` once the runtime is
/// gone.
pub async fn send_triggers(
    tasks: BTreeSet<String>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    for task in tasks {
        info!(task = %task, "change detected; triggering");
        if runtime_tx.send(RuntimeEvent::trigger(task)).await.is_err() {
            debug!("runtime channel closed; stopping watcher loop");
            return false;
        }
    }
    true
}
