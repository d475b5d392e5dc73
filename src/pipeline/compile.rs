// src/pipeline/compile.rs

//! `elm-init` and `elm`: drive the external compiler.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{BatchReport, BuildContext};

/// Check that the compiler starts and create the destination directory.
pub async fn init(ctx: &BuildContext) -> Result<()> {
    tokio::fs::create_dir_all(ctx.dest())
        .await
        .with_context(|| format!("creating {}", ctx.dest().display()))?;

    let compiler = ctx.compiler();
    let output = Command::new(&compiler.program)
        .args(&compiler.init_args)
        .current_dir(ctx.root())
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("starting compiler '{}'", compiler.program))?;

    if !output.status.success() {
        bail!(
            "'{} {}' failed ({}): {}",
            compiler.program,
            compiler.init_args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    info!(
        program = %compiler.program,
        version = %String::from_utf8_lossy(&output.stdout).trim(),
        "compiler ready"
    );
    Ok(())
}

/// Compile every matched source, one after another.
///
/// A file that fails to compile is logged and skipped; the rest of the
/// batch still runs.
pub async fn compile_all(ctx: &BuildContext) -> Result<BatchReport> {
    let sources = ctx.elm_sources().expand(ctx.root(), Some(ctx.dest()))?;
    let ext = &ctx.compiler().output_extension;

    let mut report = BatchReport::default();
    if sources.is_empty() {
        info!(pattern = %ctx.elm_sources().pattern(), "no sources matched");
        return Ok(report);
    }

    for source in sources {
        let output = ctx.dest().join(&source.rel).with_extension(ext);
        match compile_one(ctx, &source.path, &output).await {
            Ok(()) => {
                debug!(path = %source.path.display(), output = %output.display(), "compiled");
                report.processed += 1;
            }
            Err(err) => {
                error!(path = %source.path.display(), error = %format!("{err:#}"), "compile failed");
                report.failed.push(source.path);
            }
        }
    }

    Ok(report)
}

async fn compile_one(ctx: &BuildContext, source: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let compiler = ctx.compiler();
    let result = Command::new(&compiler.program)
        .args(&compiler.args)
        .arg(source)
        .arg(&compiler.output_flag)
        .arg(output)
        .current_dir(ctx.root())
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("starting compiler '{}'", compiler.program))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        let stdout = String::from_utf8_lossy(&result.stdout);
        let detail = if stderr.trim().is_empty() { stdout } else { stderr };
        bail!("compiler exited with {}: {}", result.status, detail.trim());
    }

    Ok(())
}
