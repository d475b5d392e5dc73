// src/watch/hash.rs

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, warn};

/// Compute the blake3 hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {}", path.display()))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last known content hash per watched file, kept in memory only.
///
/// notify often reports one save as several events, and editors touch
/// metadata without changing content. Comparing hashes collapses those into
/// a single trigger.
#[derive(Debug, Default)]
pub struct ContentHashes {
    hashes: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Record the current hash without reporting a change.
    pub fn seed(&mut self, path: &Path) {
        match compute_file_hash(path) {
            Ok(hash) => {
                self.hashes.insert(path.to_path_buf(), hash);
            }
            Err(err) => debug!(path = %path.display(), error = %err, "not seeding hash"),
        }
    }

    /// Whether `path` changed since the last call.
    ///
    /// Missing files always count as changed. Unreadable files are reported
    /// as changed too, so a trigger is never lost to a hashing error.
    pub fn has_changed(&mut self, path: &Path) -> bool {
        if !path.exists() {
            self.hashes.remove(path);
            return true;
        }

        let hash = match compute_file_hash(path) {
            Ok(h) => h,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to hash file; treating as changed");
                self.hashes.remove(path);
                return true;
            }
        };

        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            Some(old) => old != hash,
            None => true,
        }
    }
}
