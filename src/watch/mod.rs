// src/watch/mod.rs

//! File watching for the `watch` task.
//!
//! - [`patterns`] maps source globs to the task they re-run.
//! - [`watcher`] wires up `notify` and forwards triggers to the runtime.
//! - [`hash`] suppresses events whose file content did not change.
//!
//! The watcher does not know about the task graph; it only turns file
//! changes into `TaskTriggered` events.

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{ContentHashes, compute_file_hash};
pub use patterns::{TaskWatchProfile, build_profiles};
pub use watcher::{WatcherHandle, spawn_watcher};
