// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobSet, GlobSetBuilder};

use crate::dag::graph::{ELM_TASK, STATIC_TASK};
use crate::engine::TaskName;
use crate::pipeline::sources::compile_glob;
use crate::pipeline::{BuildContext, SourceSet};
use crate::watch::path_utils::relative_str;

/// One glob watched on behalf of one task.
///
/// Paths passed to [`matches`](Self::matches) are relative to the project
/// root, e.g. `"src/Main.elm"`.
#[derive(Clone)]
pub struct TaskWatchProfile {
    task: TaskName,
    sources: SourceSet,
    exclude_set: GlobSet,
}

impl fmt::Debug for TaskWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWatchProfile")
            .field("task", &self.task)
            .field("pattern", &self.sources.pattern())
            .finish_non_exhaustive()
    }
}

impl TaskWatchProfile {
    pub fn new(task: impl Into<TaskName>, sources: SourceSet, exclude: &[String]) -> Result<Self> {
        let task = task.into();
        let exclude_set = build_globset(exclude)
            .with_context(|| format!("building exclude globset for task {task}"))?;
        Ok(Self {
            task,
            sources,
            exclude_set,
        })
    }

    /// Task triggered when a matching file changes.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.sources.matches(rel_path) && !self.exclude_set.is_match(rel_path)
    }
}

/// Watch profiles for the standard graph: Elm sources re-run `elm`, static
/// assets re-run `static`. The destination directory is always excluded.
pub fn build_profiles(ctx: &BuildContext) -> Result<Vec<TaskWatchProfile>> {
    let exclude: Vec<String> = match relative_str(ctx.root(), ctx.dest()) {
        Some(dest) if !dest.is_empty() => vec![format!("{dest}/**")],
        _ => Vec::new(),
    };

    Ok(vec![
        TaskWatchProfile::new(ELM_TASK, ctx.elm_sources().clone(), &exclude)?,
        TaskWatchProfile::new(STATIC_TASK, ctx.static_sources().clone(), &exclude)?,
    ])
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    Ok(builder.build()?)
}
