// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers for tasks that were already part of the active run.
///
/// They are replayed together as one follow-up run once the active run
/// ends, so saving three `.elm` files during a compile recompiles once.
#[derive(Debug)]
pub struct PendingTriggers {
    behaviour: TriggerWhileRunningBehaviour,
    tasks: BTreeSet<TaskName>,
}

impl PendingTriggers {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            behaviour,
            tasks: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// `Queue` accumulates; `Cancel` keeps only the latest trigger.
    pub fn push(&mut self, task: TaskName) {
        if self.behaviour == TriggerWhileRunningBehaviour::Cancel && !self.tasks.is_empty() {
            debug!(task = %task, dropped = self.tasks.len(), "replacing pending triggers");
            self.tasks.clear();
        }
        debug!(task = %task, "trigger deferred to the next run");
        self.tasks.insert(task);
    }

    /// Empty the set, sorted by name.
    pub fn take(&mut self) -> Vec<TaskName> {
        std::mem::take(&mut self.tasks).into_iter().collect()
    }
}
