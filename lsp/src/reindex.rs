//! Workspace discovery: the files loaded on `initialized`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::types::ServerConfig;

/// One source file read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFile {
    /// Workspace-relative, `/`-separated.
    pub path: String,
    pub text: String,
}

/// Read every source file under `root` that `config` accepts, honoring
/// `.gitignore`. Sorted by path; unreadable or non-UTF-8 files are skipped.
pub fn reindex(root: &Path, config: &ServerConfig) -> Result<Vec<IndexedFile>> {
    if !root.is_dir() {
        bail!("workspace root {} is not a directory", root.display());
    }

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !matches!(name.as_ref(), ".git" | ".vigil" | "node_modules" | "vendor" | "tmp")
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !config.accepts(&path) {
            continue;
        }

        let bytes = match std::fs::read(entry.path())
            .with_context(|| format!("reading {}", entry.path().display()))
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{e:#}");
                continue;
            }
        };
        match String::from_utf8(bytes) {
            Ok(text) => files.push(IndexedFile { path, text }),
            Err(_) => warn!(%path, "Skipping non-UTF-8 file"),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(count = files.len(), root = %root.display(), "Reindexed workspace");
    Ok(files)
}
