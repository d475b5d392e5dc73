// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::event_handler::{send_triggers, tasks_for_event};
use crate::watch::hash::ContentHashes;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::TaskWatchProfile;

/// Dropping this stops the OS watch.
pub struct WatcherHandle {
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WatcherHandle")
    }
}

/// Watch `root` recursively and trigger every task whose profile matches a
/// changed path.
///
/// With `use_hash`, files already on disk are hashed before the watch starts,
/// so saving one without changing it triggers nothing.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<TaskWatchProfile>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    use_hash: bool,
) -> Result<WatcherHandle> {
    let root: PathBuf = root.into();
    let root = root.canonicalize().unwrap_or(root);
    let mut hashes = if use_hash { Some(seed_hashes(&root, &profiles)?) } else { None };

    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<Event>();
    let forward = move |res: notify::Result<Event>| match res {
        // The receiver only goes away once the loop below ends.
        Ok(event) => drop(notify_tx.send(event)),
        Err(err) => warn!(error = %err, "file watch error"),
    };

    let mut watcher = RecommendedWatcher::new(forward, Config::default()).context("creating file watcher")?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {}", root.display()))?;

    info!(
        root = %root.display(),
        patterns = ?profiles.iter().map(|p| p.sources().pattern()).collect::<Vec<_>>(),
        "watching for changes"
    );

    tokio::spawn(async move {
        while let Some(event) = notify_rx.recv().await {
            debug!(kind = ?event.kind, paths = ?event.paths, "fs event");
            let tasks = tasks_for_event(&root, &event, &profiles, hashes.as_mut());
            if !send_triggers(tasks, &runtime_tx).await {
                break;
            }
        }
        debug!("watch loop ended");
    });

    Ok(WatcherHandle { _watcher: watcher })
}

fn seed_hashes(root: &Path, profiles: &[TaskWatchProfile]) -> Result<ContentHashes> {
    let mut hashes = ContentHashes::new();
    for profile in profiles {
        for file in profile.sources().expand(root, None)? {
            if relative_str(root, &file.path).is_some_and(|rel| profile.matches(&rel)) {
                hashes.seed(&file.path);
            }
        }
    }
    debug!(files = hashes.len(), "seeded content hashes");
    Ok(hashes)
}
