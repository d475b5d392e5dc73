// src/pipeline/mod.rs

//! The build steps behind the finite tasks.
//!
//! - [`sources`] expands the `[paths]` globs into concrete files.
//! - [`compile`] runs the external compiler (`elm-init`, `elm`).
//! - [`copy`] copies static assets (`static`).
//!
//! Everything here reads from a shared [`BuildContext`], resolved once from
//! the validated config at startup.

pub mod compile;
pub mod copy;
pub mod sources;

use std::path::{Path, PathBuf};

use crate::config::{CompilerSection, ConfigFile, WatchSection};
use crate::errors::{ElmdevError, Result};

pub use sources::{SourceFile, SourceSet};

/// Resolved, absolute view of the configuration used by the tasks.
#[derive(Debug, Clone)]
pub struct BuildContext {
    root: PathBuf,
    dest: PathBuf,
    elm: SourceSet,
    statics: SourceSet,
    compiler: CompilerSection,
    serve_root: PathBuf,
    server_addr: String,
    watch: WatchSection,
}

impl BuildContext {
    /// Resolve `cfg` against the project root. Relative paths in the config
    /// are taken relative to `root`.
    pub fn from_config(cfg: &ConfigFile, root: impl AsRef<Path>) -> Result<Self> {
        let root = std::fs::canonicalize(root.as_ref())?;

        let elm = SourceSet::parse(&cfg.paths().elm)
            .map_err(|e| ElmdevError::ConfigError(format!("[paths].elm: {e:#}")))?;
        let statics = SourceSet::parse(&cfg.paths().statics)
            .map_err(|e| ElmdevError::ConfigError(format!("[paths].static: {e:#}")))?;

        Ok(Self {
            dest: root.join(&cfg.paths().dest),
            serve_root: root.join(cfg.serve_root()),
            server_addr: cfg.server().bind_addr(),
            compiler: cfg.compiler().clone(),
            watch: cfg.watch().clone(),
            elm,
            statics,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output directory shared by the compile and static tasks.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn elm_sources(&self) -> &SourceSet {
        &self.elm
    }

    pub fn static_sources(&self) -> &SourceSet {
        &self.statics
    }

    pub fn compiler(&self) -> &CompilerSection {
        &self.compiler
    }

    pub fn serve_root(&self) -> &Path {
        &self.serve_root
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }
}

/// Per-file result of a batch task.
///
/// Individual failures are logged and recorded here; they do not fail the
/// task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Files that produced output.
    pub processed: usize,
    /// Sources that failed.
    pub failed: Vec<PathBuf>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
