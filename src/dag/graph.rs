// src/dag/graph.rs

use std::collections::{BTreeMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::validate::validate_task_specs;
use crate::engine::TaskName;
use crate::errors::{ElmdevError, Result};

pub const ELM_INIT_TASK: &str = "elm-init";
pub const ELM_TASK: &str = "elm";
pub const STATIC_TASK: &str = "static";
pub const WATCH_TASK: &str = "watch";
pub const CONNECT_TASK: &str = "connect";
pub const BUILD_TASK: &str = "build";
pub const DEFAULT_TASK: &str = "default";

/// What a task does once its prerequisites are done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    /// Prepare the compiler (run the init command, create the output dir).
    ElmInit,
    /// Compile every source matching the elm glob.
    Compile,
    /// Copy every asset matching the static glob.
    CopyStatic,
    /// Watch the source globs and trigger `elm` / `static` on change.
    Watch,
    /// Serve the output directory over HTTP.
    Serve,
    /// No work of its own; done as soon as its prerequisites are.
    Group,
}

impl TaskAction {
    /// Long-lived tasks keep running after they report progress.
    pub fn is_long_lived(self) -> bool {
        matches!(self, TaskAction::Watch | TaskAction::Serve)
    }
}

/// A named task and the names of the tasks that must finish first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: TaskName,
    pub after: Vec<TaskName>,
    pub action: TaskAction,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>, action: TaskAction) -> Self {
        Self {
            name: name.into(),
            after: Vec::new(),
            action,
        }
    }

    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.after.push(dep.into());
        self
    }
}

/// Explicit, validated task graph keyed by task name.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    specs: BTreeMap<TaskName, TaskSpec>,
}

impl TaskGraph {
    /// Build a graph from task declarations, rejecting unknown
    /// prerequisites, self-dependencies and cycles.
    pub fn new(specs: Vec<TaskSpec>) -> Result<Self> {
        validate_task_specs(&specs)?;
        let specs = specs.into_iter().map(|s| (s.name.clone(), s)).collect();
        Ok(Self { specs })
    }

    /// The standard development graph:
    ///
    /// ```text
    /// default -> connect, build, watch
    /// build   -> elm, static
    /// elm     -> elm-init
    /// ```
    pub fn standard() -> Result<Self> {
        Self::new(vec![
            TaskSpec::new(ELM_INIT_TASK, TaskAction::ElmInit),
            TaskSpec::new(ELM_TASK, TaskAction::Compile).after(ELM_INIT_TASK),
            TaskSpec::new(STATIC_TASK, TaskAction::CopyStatic),
            TaskSpec::new(WATCH_TASK, TaskAction::Watch),
            TaskSpec::new(CONNECT_TASK, TaskAction::Serve),
            TaskSpec::new(BUILD_TASK, TaskAction::Group)
                .after(ELM_TASK)
                .after(STATIC_TASK),
            TaskSpec::new(DEFAULT_TASK, TaskAction::Group)
                .after(CONNECT_TASK)
                .after(BUILD_TASK)
                .after(WATCH_TASK),
        ])
    }

    /// All task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn spec(&self, name: &str) -> Option<&TaskSpec> {
        self.specs.get(name)
    }

    /// Immediate prerequisites of a task (its `after` list).
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.specs
            .get(name)
            .map(|s| s.after.as_slice())
            .unwrap_or(&[])
    }

    /// The target plus every transitive prerequisite.
    pub fn closure_of(&self, target: &str) -> Result<HashSet<TaskName>> {
        if !self.contains(target) {
            return Err(ElmdevError::TaskNotFound(target.to_string()));
        }

        let mut seen = HashSet::new();
        let mut stack = vec![target.to_string()];
        while let Some(name) = stack.pop() {
            if seen.insert(name.clone()) {
                stack.extend(self.dependencies_of(&name).iter().cloned());
            }
        }
        Ok(seen)
    }

    /// A valid sequential order for running `target`: every task appears
    /// after all of its prerequisites.
    pub fn execution_order(&self, target: &str) -> Result<Vec<TaskName>> {
        let closure = self.closure_of(target)?;

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        // Insert in sorted order so the result is deterministic.
        let mut names: Vec<&str> = closure.iter().map(|s| s.as_str()).collect();
        names.sort_unstable();
        for &name in &names {
            graph.add_node(name);
        }
        for &name in &names {
            for dep in self.dependencies_of(name) {
                graph.add_edge(dep.as_str(), name, ());
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            ElmdevError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))
        })?;
        Ok(order.into_iter().map(|s| s.to_string()).collect())
    }

    /// Whether running `target` starts anything that never finishes on its own.
    pub fn requires_long_lived(&self, target: &str) -> Result<bool> {
        Ok(self
            .closure_of(target)?
            .iter()
            .filter_map(|name| self.spec(name))
            .any(|spec| spec.action.is_long_lived()))
    }
}
