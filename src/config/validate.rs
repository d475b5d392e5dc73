// src/config/validate.rs

use std::collections::HashSet;
use std::path::Path;

use globset::GlobBuilder;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::graph::TaskSpec;
use crate::errors::{ElmdevError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ElmdevError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_compiler(cfg)?;
    validate_server(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    if cfg.paths.dest.trim().is_empty() {
        return Err(ElmdevError::ConfigError(
            "[paths].dest must not be empty".to_string(),
        ));
    }

    for (key, pattern) in [("elm", &cfg.paths.elm), ("static", &cfg.paths.statics)] {
        if pattern.trim().is_empty() {
            return Err(ElmdevError::ConfigError(format!(
                "[paths].{key} must not be empty"
            )));
        }
        if Path::new(pattern.trim()).is_absolute() {
            return Err(ElmdevError::ConfigError(format!(
                "[paths].{key} must be relative to the project root (got {pattern:?})"
            )));
        }
        GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                ElmdevError::ConfigError(format!("[paths].{key} is not a valid glob: {e}"))
            })?;
    }

    Ok(())
}

fn validate_compiler(cfg: &RawConfigFile) -> Result<()> {
    if cfg.compiler.program.trim().is_empty() {
        return Err(ElmdevError::ConfigError(
            "[compiler].program must not be empty".to_string(),
        ));
    }
    if cfg.compiler.output_extension.contains('/') {
        return Err(ElmdevError::ConfigError(format!(
            "[compiler].output_extension must be a bare extension (got {:?})",
            cfg.compiler.output_extension
        )));
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(ElmdevError::ConfigError(
            "[server].port must be a fixed port (got 0)".to_string(),
        ));
    }
    if cfg.server.host.trim().is_empty() {
        return Err(ElmdevError::ConfigError(
            "[server].host must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Check a set of task declarations before they become a `TaskGraph`.
///
/// This checks:
/// - there is at least one task, and names are unique
/// - all `after` prerequisites refer to declared tasks
/// - no task lists itself as a prerequisite
/// - the prerequisite graph has no cycles
pub fn validate_task_specs(specs: &[TaskSpec]) -> Result<()> {
    ensure_has_tasks(specs)?;
    validate_task_dependencies(specs)?;
    validate_dag(specs)?;
    Ok(())
}

fn ensure_has_tasks(specs: &[TaskSpec]) -> Result<()> {
    if specs.is_empty() {
        return Err(ElmdevError::ConfigError(
            "task graph must contain at least one task".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(ElmdevError::ConfigError(format!(
                "task '{}' is declared more than once",
                spec.name
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(specs: &[TaskSpec]) -> Result<()> {
    let names: HashSet<&str> = specs.iter().map(|s| s.name.as_str()).collect();

    for spec in specs {
        for dep in spec.after.iter() {
            if dep == &spec.name {
                return Err(ElmdevError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    spec.name
                )));
            }
            if !names.contains(dep.as_str()) {
                return Err(ElmdevError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    spec.name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(specs: &[TaskSpec]) -> Result<()> {
    // Edge direction: prerequisite -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for spec in specs {
        graph.add_node(spec.name.as_str());
    }

    for spec in specs {
        for dep in spec.after.iter() {
            graph.add_edge(dep.as_str(), spec.name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(ElmdevError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                node
            )))
        }
    }
}
