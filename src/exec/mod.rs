// src/exec/mod.rs

//! Running dispatched tasks.
//!
//! The event loop only sees the [`Executor`] trait. [`TaskExecutor`] is the
//! real one; tests plug in a fake that reports outcomes immediately.

pub mod task_executor;
pub mod task_runner;

pub use task_executor::TaskExecutor;

use crate::dag::Dispatch;
use crate::errors::Result;

pub trait Executor: Send {
    /// Start `tasks`. Must not block: outcomes come back as runtime events.
    fn dispatch(&mut self, tasks: Vec<Dispatch>) -> Result<()>;
}
