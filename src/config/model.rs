// src/config/model.rs

use serde::Deserialize;

use crate::types::TriggerWhileRunningBehaviour;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// dest = "dist"
/// elm = "src/*.elm"
/// static = "stc/*.{html,css}"
///
/// [server]
/// port = 3000
/// ```
///
/// All sections are optional; the defaults describe a project with Elm
/// sources in `src/`, static files in `stc/` and output in `dist/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub compiler: CompilerSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on globs compiling and numeric limits being sane.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    paths: PathsSection,
    compiler: CompilerSection,
    server: ServerSection,
    watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            compiler: raw.compiler,
            server: raw.server,
            watch: raw.watch,
        }
    }

    pub fn paths(&self) -> &PathsSection {
        &self.paths
    }

    pub fn compiler(&self) -> &CompilerSection {
        &self.compiler
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }

    /// Directory the dev server serves: `[server].root`, else `[paths].dest`.
    pub fn serve_root(&self) -> &str {
        self.server.root.as_deref().unwrap_or(&self.paths.dest)
    }
}

/// `[paths]` section: the two input globs and the shared output directory.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Destination directory written by the compile and static tasks.
    #[serde(default = "default_dest")]
    pub dest: String,

    /// Glob of Elm sources to compile.
    #[serde(default = "default_elm_glob")]
    pub elm: String,

    /// Glob of static assets copied verbatim.
    #[serde(default = "default_static_glob", rename = "static")]
    pub statics: String,
}

fn default_dest() -> String {
    "dist".to_string()
}

fn default_elm_glob() -> String {
    "src/*.elm".to_string()
}

fn default_static_glob() -> String {
    "stc/*.{html,css}".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            dest: default_dest(),
            elm: default_elm_glob(),
            statics: default_static_glob(),
        }
    }
}

/// `[compiler]` section.
///
/// Each source is compiled with:
///
/// ```text
/// <program> <args...> <source> <output_flag> <dest>/<rel>.<output_extension>
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerSection {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the source file (`["make"]` for `elm make`).
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    #[serde(default = "default_output_flag")]
    pub output_flag: String,

    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Arguments for the `elm-init` step, run once before compiling.
    #[serde(default = "default_init_args")]
    pub init_args: Vec<String>,
}

fn default_program() -> String {
    "elm".to_string()
}

fn default_args() -> Vec<String> {
    vec!["make".to_string()]
}

fn default_output_flag() -> String {
    "--output".to_string()
}

fn default_output_extension() -> String {
    "js".to_string()
}

fn default_init_args() -> Vec<String> {
    vec!["--version".to_string()]
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            output_flag: default_output_flag(),
            output_extension: default_output_extension(),
            init_args: default_init_args(),
        }
    }
}

/// `[server]` section for the `connect` task.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory to serve; `None` means `[paths].dest`.
    #[serde(default)]
    pub root: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            root: None,
        }
    }
}

impl ServerSection {
    /// `host:port` string suitable for `ToSocketAddrs`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Only trigger when the content of a changed file actually differs.
    #[serde(default = "default_use_hash")]
    pub use_hash: bool,

    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,
}

fn default_use_hash() -> bool {
    true
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            use_hash: default_use_hash(),
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
        }
    }
}
