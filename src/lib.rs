// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod serve;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_or_default};
use crate::dag::TaskGraph;
use crate::engine::{CoreRuntime, RuntimeEvent, StopPolicy, drive};
use crate::errors::{Error, Result};
use crate::exec::TaskExecutor;
use crate::pipeline::BuildContext;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, builds the standard task graph and runs the requested
/// target until it finishes (or, for targets with long-lived tasks, until
/// Ctrl-C).
pub async fn run(args: CliArgs) -> Result<()> {
    // Only the implicit default may be missing.
    let (config_path, allow_missing) = match &args.config {
        Some(path) => (PathBuf::from(path), false),
        None => (default_config_path(), true),
    };
    let cfg = load_or_default(&config_path, allow_missing)?;
    let graph = TaskGraph::standard()?;

    if args.tasks {
        print_tasks(&graph);
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&cfg, &graph, &args.task)?;
        return Ok(());
    }

    let root = config_root_dir(&config_path)?;
    let ctx = Arc::new(BuildContext::from_config(&cfg, &root)?);
    run_target(graph, ctx, &args.task).await
}

/// Run `target` from `graph` with the real executor.
///
/// Exits once idle when the target starts no long-lived task; otherwise
/// keeps serving and watching until shutdown.
pub async fn run_target(graph: TaskGraph, ctx: Arc<BuildContext>, target: &str) -> Result<()> {
    let policy = StopPolicy::for_target(&graph, target)?;
    info!(target, ?policy, root = %ctx.root().display(), "running target");

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = TaskExecutor::spawn(rt_tx.clone(), Arc::clone(&ctx));

    let shutdown_tx = rt_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            return;
        }
        let _ = shutdown_tx.send(RuntimeEvent::ShutdownRequested).await;
    });

    rt_tx
        .send(RuntimeEvent::trigger(target))
        .await
        .map_err(Error::from)?;

    let core = CoreRuntime::new(graph, ctx.watch().triggered_while_running_behaviour, policy);
    drive(core, rt_rx, executor).await
}

/// Project root: the directory holding the config file, else the cwd.
fn config_root_dir(config_path: &Path) -> Result<PathBuf> {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => Ok(std::env::current_dir()?),
    }
}

fn print_tasks(graph: &TaskGraph) {
    println!("tasks:");
    for name in graph.tasks() {
        let deps = graph.dependencies_of(name);
        if deps.is_empty() {
            println!("  {name}");
        } else {
            println!("  {name} (after: {})", deps.join(", "));
        }
    }
}

fn print_dry_run(cfg: &ConfigFile, graph: &TaskGraph, target: &str) -> Result<()> {
    let order = graph.execution_order(target)?;

    println!("elmdev dry-run: {target}");
    println!("  paths.dest   = {}", cfg.paths().dest);
    println!("  paths.elm    = {}", cfg.paths().elm);
    println!("  paths.static = {}", cfg.paths().statics);
    println!(
        "  compiler     = {} {}",
        cfg.compiler().program,
        cfg.compiler().args.join(" ")
    );
    println!("  server       = {} (root {})", cfg.server().bind_addr(), cfg.serve_root());
    println!();

    println!("execution order:");
    for (i, name) in order.iter().enumerate() {
        let action = graph
            .spec(name)
            .map(|s| format!("{:?}", s.action))
            .unwrap_or_default();
        let deps = graph.dependencies_of(name);
        if deps.is_empty() {
            println!("  {}. {name} [{action}]", i + 1);
        } else {
            println!("  {}. {name} [{action}] after {}", i + 1, deps.join(", "));
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
