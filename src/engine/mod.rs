// src/engine/mod.rs

//! Event-driven core of elmdev.
//!
//! [`core::CoreRuntime`] turns each [`RuntimeEvent`] into a [`core::Reaction`]
//! without doing any IO. [`runtime::drive`] feeds it from a channel and
//! hands the tasks it dispatches to an [`Executor`](crate::exec::Executor).

pub mod core;
pub mod queue;
pub mod runtime;

pub use core::{CoreRuntime, Reaction, StopPolicy};
pub use runtime::drive;

pub type TaskName = String;

/// How a finite task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

/// Everything the core reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// Run `task`: the CLI target at startup, or a watched file changed.
    TaskTriggered { task: TaskName },
    /// A long-lived task is up.
    TaskProgressed { task: TaskName },
    TaskCompleted { task: TaskName, outcome: TaskOutcome },
    /// Ctrl-C.
    ShutdownRequested,
}

impl RuntimeEvent {
    pub fn trigger(task: impl Into<TaskName>) -> Self {
        RuntimeEvent::TaskTriggered { task: task.into() }
    }
}
