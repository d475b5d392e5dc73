#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use elmdev::config::{ConfigFile, RawConfigFile};
use elmdev::dag::{TaskAction, TaskGraph, TaskSpec};
use elmdev::pipeline::BuildContext;
use elmdev::types::TriggerWhileRunningBehaviour;
use tempfile::TempDir;

/// `sh` script standing in for `elm make`.
///
/// Invoked as `sh -c <script> fake-elm <source> --output <target>`. Sources
/// containing `SYNTAX ERROR` fail with a message on stderr; anything else is
/// "compiled" by prefixing its content.
pub const FAKE_ELM_SCRIPT: &str = r#"
if grep -q 'SYNTAX ERROR' "$1"; then
  echo "-- SYNTAX PROBLEM in $1" >&2
  exit 1
fi
{ printf '// compiled\n'; cat "$1"; } > "$3"
"#;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.config.paths.dest = dest.to_string();
        self
    }

    pub fn elm(mut self, pattern: &str) -> Self {
        self.config.paths.elm = pattern.to_string();
        self
    }

    pub fn statics(mut self, pattern: &str) -> Self {
        self.config.paths.statics = pattern.to_string();
        self
    }

    /// Use [`FAKE_ELM_SCRIPT`] through `sh` instead of the real compiler.
    pub fn fake_compiler(mut self) -> Self {
        let compiler = &mut self.config.compiler;
        compiler.program = "sh".to_string();
        compiler.args = vec![
            "-c".to_string(),
            FAKE_ELM_SCRIPT.to_string(),
            "fake-elm".to_string(),
        ];
        compiler.init_args = vec!["-c".to_string(), "echo 0.19.1".to_string()];
        self
    }

    pub fn compiler_program(mut self, program: &str) -> Self {
        self.config.compiler.program = program.to_string();
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.config.server.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.watch.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for ad-hoc task graphs.
#[derive(Default)]
pub struct TaskGraphBuilder {
    specs: Vec<TaskSpec>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, name: &str, action: TaskAction, after: &[&str]) -> Self {
        let spec = after
            .iter()
            .fold(TaskSpec::new(name, action), |spec, dep| spec.after(*dep));
        self.specs.push(spec);
        self
    }

    pub fn build(self) -> TaskGraph {
        TaskGraph::new(self.specs).expect("Failed to build valid task graph")
    }
}

/// Temporary project directory with helpers for writing sources and reading
/// outputs.
pub struct ScratchProject {
    dir: TempDir,
}

impl ScratchProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("creating temp dir"),
        }
    }

    /// Canonical project root.
    pub fn root(&self) -> PathBuf {
        self.dir.path().canonicalize().expect("canonicalizing temp dir")
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("creating parent dirs");
        }
        fs::write(&path, contents).expect("writing file");
        path
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        fs::read(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn context(&self, cfg: &ConfigFile) -> Arc<BuildContext> {
        Arc::new(BuildContext::from_config(cfg, self.root()).expect("building context"))
    }

    /// Every file under `rel`, as sorted `(relative path, bytes)` pairs.
    pub fn snapshot(&self, rel: &str) -> Vec<(PathBuf, Vec<u8>)> {
        let base = self.path(rel);
        let mut out = Vec::new();
        collect_files(&base, &base, &mut out);
        out.sort();
        out
    }
}

impl Default for ScratchProject {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_files(base: &Path, dir: &Path, out: &mut Vec<(PathBuf, Vec<u8>)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(base, &path, out);
        } else if let Ok(bytes) = fs::read(&path) {
            let rel = path.strip_prefix(base).expect("under base").to_path_buf();
            out.push((rel, bytes));
        }
    }
}
