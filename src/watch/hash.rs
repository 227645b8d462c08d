// src/watch/hash.rs

//! Content hashing for `use_hash` bindings.
//!
//! Editors often touch a file without changing it (save-without-edit,
//! permission changes, atomic rename of identical contents). A binding with
//! `use_hash` only fires when the blake3 hash of the file differs from the
//! last one it saw.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Hex blake3 digest of a file's contents.
pub async fn compute_file_hash(path: &Path) -> io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Last seen content hash per path, kept in memory for one watch session.
#[derive(Debug, Default)]
pub struct ContentHashes {
    seen: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` differs from the last time it was checked.
    ///
    /// A file seen for the first time counts as changed. A file that can no
    /// longer be read (deleted, renamed away) always counts as changed and
    /// is forgotten.
    pub async fn changed(&mut self, path: &Path) -> bool {
        let hash = match compute_file_hash(path).await {
            Ok(h) => h,
            Err(e) => {
                debug!(?path, error = %e, "cannot hash file; treating as changed");
                self.seen.remove(path);
                return true;
            }
        };

        match self.seen.get(path) {
            Some(prev) if *prev == hash => {
                debug!(?path, "content unchanged; suppressing trigger");
                false
            }
            _ => {
                self.seen.insert(path.to_path_buf(), hash);
                true
            }
        }
    }
}
