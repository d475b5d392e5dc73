// src/pipeline/copy.rs

//! `static`: copy assets verbatim into the destination.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use super::{BatchReport, BuildContext};

/// Copy every matched static file to `<dest>/<rel>`.
///
/// Read and write errors are isolated per file.
pub async fn copy_all(ctx: &BuildContext) -> Result<BatchReport> {
    let sources = ctx.static_sources().expand(ctx.root(), Some(ctx.dest()))?;

    let mut report = BatchReport::default();
    if sources.is_empty() {
        info!(pattern = %ctx.static_sources().pattern(), "no static files matched");
        return Ok(report);
    }

    for source in sources {
        let target = ctx.dest().join(&source.rel);
        match copy_one(&source.path, &target).await {
            Ok(bytes) => {
                debug!(path = %source.path.display(), bytes, "copied");
                report.processed += 1;
            }
            Err(err) => {
                error!(path = %source.path.display(), error = %format!("{err:#}"), "copy failed");
                report.failed.push(source.path);
            }
        }
    }

    Ok(report)
}

async fn copy_one(from: &Path, to: &Path) -> Result<u64> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::copy(from, to)
        .await
        .with_context(|| format!("copying {} to {}", from.display(), to.display()))
}
