// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::dag::graph::DEFAULT_TASK;

/// Command-line arguments for `elmdev`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "elmdev",
    version,
    about = "Compile Elm sources, copy static assets, serve and watch the output.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run (elm-init, elm, static, watch, connect, build, default).
    #[arg(value_name = "TASK", default_value = DEFAULT_TASK)]
    pub task: String,

    /// Path to the config file (TOML). Defaults to `Elmdev.toml`.
    ///
    /// Without this flag a missing `Elmdev.toml` means built-in defaults;
    /// an explicit path must exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ELMDEV_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve the task graph and print the execution order, without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// List all tasks and their prerequisites.
    #[arg(long)]
    pub tasks: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_default_task_and_config() {
        let args = CliArgs::try_parse_from(["elmdev"]).unwrap();
        assert_eq!(args.task, "default");
        assert_eq!(args.config, None);
        assert!(!args.dry_run);
        assert!(!args.tasks);
    }

    #[test]
    fn parses_task_and_flags() {
        let args = CliArgs::try_parse_from([
            "elmdev",
            "build",
            "--config",
            "site/Elmdev.toml",
            "--log-level",
            "debug",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.task, "build");
        assert_eq!(args.config.as_deref(), Some("site/Elmdev.toml"));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run);
    }
}
