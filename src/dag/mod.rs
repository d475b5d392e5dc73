// src/dag/mod.rs

//! The task graph and the per-run scheduler that walks it.

pub mod graph;
pub mod scheduler;

pub use graph::{TaskAction, TaskGraph, TaskSpec};
pub use scheduler::{Dispatch, Phase, Scheduler, Transition};
