// src/dag/scheduler.rs

//! Per-run task state.
//!
//! A run starts when a task is requested while nothing is in flight and
//! ends once every task pulled into it has succeeded or failed. Success is
//! remembered across runs, so rebuilding `elm` after a save does not repeat
//! `elm-init`.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dag::graph::{TaskAction, TaskGraph};
use crate::engine::{TaskName, TaskOutcome};

/// Where a task stands in the active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pulled into the run, waiting on prerequisites.
    Waiting,
    /// Handed to the executor.
    Running,
    /// Finished, or a long-lived task that reported it is up.
    Succeeded,
    /// Failed itself, or sits below a failed prerequisite.
    Failed,
}

impl Phase {
    fn in_flight(self) -> bool {
        matches!(self, Phase::Waiting | Phase::Running)
    }
}

/// A task the executor should start now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub name: TaskName,
    pub action: TaskAction,
    /// Run the task belongs to, for logs.
    pub run: u64,
}

impl Dispatch {
    pub fn long_lived(&self) -> bool {
        self.action.is_long_lived()
    }
}

/// Result of feeding one request or report to the scheduler.
#[derive(Debug, Default)]
pub struct Transition {
    /// Tasks whose prerequisites are now met, sorted by name.
    pub dispatch: Vec<Dispatch>,
    /// Tasks that failed, directly or below a failed prerequisite.
    pub failed: Vec<TaskName>,
}

#[derive(Debug)]
struct Slot {
    action: TaskAction,
    deps: Vec<TaskName>,
    phase: Option<Phase>,
    ever_succeeded: bool,
    ever_started: bool,
}

impl Slot {
    fn joined(&self) -> bool {
        self.phase.is_some()
    }
}

#[derive(Debug)]
pub struct Scheduler {
    slots: BTreeMap<TaskName, Slot>,
    runs: u64,
    active: bool,
}

impl Scheduler {
    pub fn new(graph: TaskGraph) -> Self {
        let slots = graph
            .tasks()
            .filter_map(|name| graph.spec(name))
            .map(|spec| {
                let slot = Slot {
                    action: spec.action,
                    deps: spec.after.clone(),
                    phase: None,
                    ever_succeeded: false,
                    ever_started: false,
                };
                (spec.name.clone(), slot)
            })
            .collect();

        Self {
            slots,
            runs: 0,
            active: false,
        }
    }

    /// No run is active.
    pub fn is_idle(&self) -> bool {
        !self.active
    }

    pub fn knows(&self, task: &str) -> bool {
        self.slots.contains_key(task)
    }

    /// Phase of `task` in the active run; `None` when it is not part of it.
    pub fn phase_of(&self, task: &str) -> Option<Phase> {
        self.slots.get(task).and_then(|slot| slot.phase)
    }

    pub fn is_long_lived(&self, task: &str) -> bool {
        self.slots
            .get(task)
            .is_some_and(|slot| slot.action.is_long_lived())
    }

    /// Pull `tasks` into the active run, starting a new run when idle.
    ///
    /// Each requested task joins unless it already takes part. Its
    /// prerequisites join only if they never succeeded in any run.
    pub fn request(&mut self, tasks: &[TaskName]) -> Transition {
        if !self.active {
            self.begin_run();
        }

        for task in tasks {
            if !self.knows(task) {
                warn!(task = %task, "request for unknown task; ignoring");
                continue;
            }
            self.pull_in(task);
        }

        self.settle(Transition::default())
    }

    /// A long-lived task is up; it counts as succeeded for this run.
    pub fn progressed(&mut self, task: &str) -> Transition {
        if !self.mark_done(task, TaskOutcome::Success) {
            return Transition::default();
        }
        self.settle(Transition::default())
    }

    /// A task finished. Reports for tasks not running in the active run,
    /// such as a server exiting long after it came up, are ignored.
    pub fn finished(&mut self, task: &str, outcome: TaskOutcome) -> Transition {
        if !self.mark_done(task, outcome) {
            return Transition::default();
        }

        let mut transition = Transition::default();
        if outcome == TaskOutcome::Failed {
            warn!(task = %task, run = self.runs, "task failed; failing what waits on it");
            transition.failed.push(task.to_string());
        }
        self.settle(transition)
    }

    fn begin_run(&mut self) {
        self.runs += 1;
        self.active = true;
        for slot in self.slots.values_mut() {
            slot.phase = None;
        }
        debug!(run = self.runs, "run started");
    }

    fn pull_in(&mut self, root: &str) {
        let mut stack = vec![root.to_string()];

        while let Some(name) = stack.pop() {
            let Some(slot) = self.slots.get_mut(&name) else {
                continue;
            };
            if slot.joined() || (name != root && slot.ever_succeeded) {
                continue;
            }
            slot.phase = Some(Phase::Waiting);
            debug!(task = %name, run = self.runs, "joined run");
            stack.extend(slot.deps.iter().cloned());
        }
    }

    /// Returns `false` when the report does not belong to the active run.
    fn mark_done(&mut self, task: &str, outcome: TaskOutcome) -> bool {
        let run = self.runs;
        let active = self.active;
        let Some(slot) = self.slots.get_mut(task) else {
            warn!(task = %task, "report for unknown task; ignoring");
            return false;
        };
        if !active || slot.phase != Some(Phase::Running) {
            debug!(task = %task, run, phase = ?slot.phase, ?outcome, "stale report; ignoring");
            return false;
        }

        match outcome {
            TaskOutcome::Success => {
                slot.phase = Some(Phase::Succeeded);
                slot.ever_succeeded = true;
            }
            TaskOutcome::Failed => slot.phase = Some(Phase::Failed),
        }
        true
    }

    /// Fail what is blocked, dispatch what is ready and close the run once
    /// nothing is left in flight.
    fn settle(&mut self, mut transition: Transition) -> Transition {
        transition.failed.extend(self.fail_blocked());
        transition.dispatch = self.start_ready();

        if self.active && !self.slots.values().any(|s| s.phase.is_some_and(Phase::in_flight)) {
            self.active = false;
            info!(run = self.runs, "run finished");
        }
        transition
    }

    fn fail_blocked(&mut self) -> Vec<TaskName> {
        let mut failed = Vec::new();
        loop {
            let blocked: Vec<TaskName> = self
                .slots
                .iter()
                .filter(|(_, slot)| slot.phase == Some(Phase::Waiting))
                .filter(|(_, slot)| {
                    slot.deps
                        .iter()
                        .any(|dep| self.phase_of(dep) == Some(Phase::Failed))
                })
                .map(|(name, _)| name.clone())
                .collect();

            if blocked.is_empty() {
                return failed;
            }
            for name in blocked {
                if let Some(slot) = self.slots.get_mut(&name) {
                    debug!(task = %name, "prerequisite failed; not running");
                    slot.phase = Some(Phase::Failed);
                }
                failed.push(name);
            }
        }
    }

    fn satisfied(&self, dep: &str) -> bool {
        match self.slots.get(dep) {
            Some(slot) => match slot.phase {
                Some(phase) => phase == Phase::Succeeded,
                None => slot.ever_succeeded,
            },
            None => false,
        }
    }

    fn start_ready(&mut self) -> Vec<Dispatch> {
        let ready: Vec<TaskName> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.phase == Some(Phase::Waiting))
            .filter(|(_, slot)| slot.deps.iter().all(|dep| self.satisfied(dep)))
            .map(|(name, _)| name.clone())
            .collect();

        let run = self.runs;
        ready
            .into_iter()
            .filter_map(|name| {
                let slot = self.slots.get_mut(&name)?;
                if slot.ever_started {
                    info!(task = %name, run, "re-running task");
                } else {
                    info!(task = %name, run, "starting task");
                }
                slot.phase = Some(Phase::Running);
                slot.ever_started = true;
                Some(Dispatch {
                    name,
                    action: slot.action,
                    run,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::graph::{
        BUILD_TASK, CONNECT_TASK, DEFAULT_TASK, ELM_INIT_TASK, ELM_TASK, STATIC_TASK, WATCH_TASK,
    };

    fn names(t: &Transition) -> Vec<&str> {
        t.dispatch.iter().map(|d| d.name.as_str()).collect()
    }

    fn request(s: &mut Scheduler, task: &str) -> Transition {
        s.request(&[task.to_string()])
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(TaskGraph::standard().unwrap())
    }

    #[test]
    fn build_starts_independent_roots_together() {
        let mut s = scheduler();

        let t = request(&mut s, BUILD_TASK);
        assert_eq!(names(&t), vec![ELM_INIT_TASK, STATIC_TASK]);
        assert_eq!(s.phase_of(WATCH_TASK), None);

        let t = s.finished(ELM_INIT_TASK, TaskOutcome::Success);
        assert_eq!(names(&t), vec![ELM_TASK]);

        // build waits for both elm and static.
        assert!(s.finished(ELM_TASK, TaskOutcome::Success).dispatch.is_empty());
        let t = s.finished(STATIC_TASK, TaskOutcome::Success);
        assert_eq!(names(&t), vec![BUILD_TASK]);

        s.finished(BUILD_TASK, TaskOutcome::Success);
        assert!(s.is_idle());
    }

    #[test]
    fn default_does_not_gate_serve_and_watch_on_build() {
        let mut s = scheduler();

        let t = request(&mut s, DEFAULT_TASK);
        assert_eq!(
            names(&t),
            vec![CONNECT_TASK, ELM_INIT_TASK, STATIC_TASK, WATCH_TASK]
        );
        assert_eq!(t.dispatch.iter().filter(|d| d.long_lived()).count(), 2);
    }

    #[test]
    fn failed_init_fails_the_chain_but_not_static() {
        let mut s = scheduler();
        request(&mut s, BUILD_TASK);

        let t = s.finished(ELM_INIT_TASK, TaskOutcome::Failed);
        assert_eq!(t.failed, vec![ELM_INIT_TASK, ELM_TASK, BUILD_TASK]);
        assert_eq!(s.phase_of(STATIC_TASK), Some(Phase::Running));

        let t = s.finished(STATIC_TASK, TaskOutcome::Success);
        assert!(t.dispatch.is_empty());
        assert!(s.is_idle());
    }

    #[test]
    fn retrigger_skips_prerequisites_that_already_succeeded() {
        let mut s = scheduler();
        request(&mut s, ELM_TASK);
        s.finished(ELM_INIT_TASK, TaskOutcome::Success);
        s.finished(ELM_TASK, TaskOutcome::Success);
        assert!(s.is_idle());

        let t = request(&mut s, ELM_TASK);
        assert_eq!(names(&t), vec![ELM_TASK]);
        assert_eq!(t.dispatch[0].run, 2);
        assert_eq!(s.phase_of(ELM_INIT_TASK), None);
    }

    #[test]
    fn retrigger_pulls_in_prerequisites_that_never_succeeded() {
        let mut s = scheduler();
        request(&mut s, ELM_TASK);
        s.finished(ELM_INIT_TASK, TaskOutcome::Failed);
        assert!(s.is_idle());

        let t = request(&mut s, ELM_TASK);
        assert_eq!(names(&t), vec![ELM_INIT_TASK]);
    }

    #[test]
    fn request_behind_a_failed_prerequisite_fails_immediately() {
        let mut s = scheduler();
        s.request(&[STATIC_TASK.to_string(), ELM_INIT_TASK.to_string()]);
        s.finished(ELM_INIT_TASK, TaskOutcome::Failed);

        let t = request(&mut s, ELM_TASK);
        assert_eq!(t.failed, vec![ELM_TASK.to_string()]);
        assert!(t.dispatch.is_empty());
    }

    #[test]
    fn progress_completes_long_lived_tasks_logically() {
        let mut s = scheduler();
        request(&mut s, CONNECT_TASK);
        assert!(s.is_long_lived(CONNECT_TASK));

        s.progressed(CONNECT_TASK);
        assert!(s.is_idle());

        // A late exit of the server belongs to no run.
        let t = s.finished(CONNECT_TASK, TaskOutcome::Failed);
        assert!(t.failed.is_empty());
    }

    #[test]
    fn unknown_request_on_idle_scheduler_closes_the_empty_run() {
        let mut s = scheduler();
        let t = request(&mut s, "nope");
        assert!(t.dispatch.is_empty());
        assert!(s.is_idle());
    }
}
