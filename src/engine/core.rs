// src/engine/core.rs

//! Pure state machine behind the event loop: no channels, no Tokio, no IO.

use std::collections::BTreeSet;

use tracing::{debug, error, warn};

use crate::dag::{Dispatch, Scheduler, TaskGraph, Transition};
use crate::engine::queue::PendingTriggers;
use crate::engine::{RuntimeEvent, TaskName, TaskOutcome};
use crate::errors::{ElmdevError, Result};
use crate::types::TriggerWhileRunningBehaviour;

/// When the event loop ends without a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// `build`, `elm`, `static`: once nothing runs and nothing is pending.
    WhenIdle,
    /// Targets that start the server or the watcher.
    OnShutdown,
}

impl StopPolicy {
    pub fn for_target(graph: &TaskGraph, target: &str) -> Result<Self> {
        Ok(if graph.requires_long_lived(target)? {
            StopPolicy::OnShutdown
        } else {
            StopPolicy::WhenIdle
        })
    }
}

/// What the event loop must do after one event.
#[derive(Debug, Default)]
pub struct Reaction {
    pub dispatch: Vec<Dispatch>,
    pub failed: Vec<TaskName>,
    pub stop: bool,
}

impl Reaction {
    fn absorb(&mut self, transition: Transition) {
        self.dispatch.extend(transition.dispatch);
        self.failed.extend(transition.failed);
    }
}

impl From<Transition> for Reaction {
    fn from(transition: Transition) -> Self {
        let mut reaction = Reaction::default();
        reaction.absorb(transition);
        reaction
    }
}

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    pending: PendingTriggers,
    policy: StopPolicy,
    failed: BTreeSet<TaskName>,
    fatal: Option<TaskName>,
}

impl CoreRuntime {
    pub fn new(graph: TaskGraph, behaviour: TriggerWhileRunningBehaviour, policy: StopPolicy) -> Self {
        Self {
            scheduler: Scheduler::new(graph),
            pending: PendingTriggers::new(behaviour),
            policy,
            failed: BTreeSet::new(),
            fatal: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Every task that failed since startup.
    pub fn failed(&self) -> &BTreeSet<TaskName> {
        &self.failed
    }

    pub fn step(&mut self, event: RuntimeEvent) -> Reaction {
        let mut reaction = match event {
            RuntimeEvent::TaskTriggered { task } => self.on_trigger(task),
            RuntimeEvent::TaskProgressed { task } => self.scheduler.progressed(&task).into(),
            RuntimeEvent::TaskCompleted { task, outcome } => self.on_completed(task, outcome),
            RuntimeEvent::ShutdownRequested => Reaction {
                stop: true,
                ..Reaction::default()
            },
        };

        if !reaction.stop {
            self.replay_pending(&mut reaction);
            reaction.stop = self.policy == StopPolicy::WhenIdle
                && self.scheduler.is_idle()
                && self.pending.is_empty();
        }

        self.failed.extend(reaction.failed.iter().cloned());
        reaction
    }

    /// Outcome once the event loop has stopped.
    ///
    /// A failed server or watcher is always an error. Other failures only
    /// fail finite targets; in watch mode they were logged as they happened.
    pub fn finish(&self) -> Result<()> {
        if let Some(task) = &self.fatal {
            return Err(ElmdevError::ServiceFailed(task.clone()));
        }
        if self.policy == StopPolicy::WhenIdle && !self.failed.is_empty() {
            return Err(ElmdevError::TasksFailed(self.failed.iter().cloned().collect()));
        }
        Ok(())
    }

    /// A task outside the active run joins it; one already in it runs again
    /// after the run ends.
    fn on_trigger(&mut self, task: TaskName) -> Reaction {
        if !self.scheduler.knows(&task) {
            warn!(task = %task, "trigger for unknown task; ignoring");
            return Reaction::default();
        }
        if self.scheduler.is_idle() || self.scheduler.phase_of(&task).is_none() {
            return self.scheduler.request(&[task]).into();
        }
        self.pending.push(task);
        Reaction::default()
    }

    fn on_completed(&mut self, task: TaskName, outcome: TaskOutcome) -> Reaction {
        let service = self.scheduler.is_long_lived(&task);
        let mut reaction: Reaction = self.scheduler.finished(&task, outcome).into();

        if service && outcome == TaskOutcome::Failed {
            error!(task = %task, "long-lived task failed; stopping");
            self.fatal = Some(task);
            reaction.stop = true;
        }
        reaction
    }

    fn replay_pending(&mut self, reaction: &mut Reaction) {
        if !self.scheduler.is_idle() || self.pending.is_empty() {
            return;
        }
        let tasks = self.pending.take();
        debug!(?tasks, "starting follow-up run");
        reaction.absorb(self.scheduler.request(&tasks));
    }
}
