// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Checkout conflict backup.
//!
//! A checkout into a work tree alias fails when untracked files already sit
//! where tracked files would be written. Those files get moved out of the way
//! into a backup directory, keeping their path relative to the work tree, so
//! the checkout can be retried without losing anything.
//!
//! # Conflict Enumeration
//!
//! Git describes such conflicts in human-readable form only:
//!
//! ```text
//! error: The following untracked working tree files would be overwritten by checkout:
//!         .bashrc
//!         .config/nvim/init.lua
//! Please move or remove them before you switch branches.
//! Aborting
//! ```
//!
//! The manager derives most of the conflict set from NUL-delimited listings
//! of the HEAD tree and the index. A file sitting where a tracked directory
//! belongs never shows up there, so [`parse_conflict_lines`] reads the block
//! above and its paths are merged in.

use std::{
    fs,
    io,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, info};

/// Files relocated out of the work tree before retrying a checkout.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl BackupRecord {
    /// Construct record of an apply that needed no backup.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths: Vec::new(),
        }
    }

    /// Move conflicting files from work tree into backup root.
    ///
    /// Each path is relative to the work tree and keeps that relative
    /// structure under `root`. All destinations are checked before the first
    /// file is moved, so either every file is relocated or none is.
    ///
    /// # Errors
    ///
    /// - Return [`BackupError::InvalidPath`] if a conflict path is absolute or
    ///   escapes the work tree.
    /// - Return [`BackupError::Exists`] if a destination already exists.
    /// - Return [`BackupError::Move`] if a file cannot be relocated.
    pub fn relocate(
        worktree: impl AsRef<Path>,
        root: impl Into<PathBuf>,
        conflicts: impl IntoIterator<Item = PathBuf>,
    ) -> Result<Self> {
        let root = root.into();
        let mut paths: Vec<PathBuf> = conflicts.into_iter().collect();
        paths.sort();
        paths.dedup();

        for path in &paths {
            if !is_contained(path) {
                return Err(BackupError::InvalidPath(path.clone()));
            }

            let destination = root.join(path);
            if destination.symlink_metadata().is_ok() {
                return Err(BackupError::Exists(destination));
            }
        }

        for path in &paths {
            let source = worktree.as_ref().join(path);
            let destination = root.join(path);
            if let Some(parent) = destination.parent() {
                mkdirp::mkdirp(parent).map_err(|error| BackupError::Move {
                    path: source.clone(),
                    source: error,
                })?;
            }

            debug!("move {} to {}", source.display(), destination.display());
            move_file(&source, &destination).map_err(|error| BackupError::Move {
                path: source.clone(),
                source: error,
            })?;
        }

        if !paths.is_empty() {
            info!("backed up {} file(s) to {}", paths.len(), root.display());
        }

        Ok(Self { root, paths })
    }

    /// Directory that backed up files were moved into.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Work tree relative paths that were moved, sorted.
    pub fn paths(&self) -> &[PathBuf] {
        self.paths.as_slice()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Git refused to overwrite untracked files during checkout or merge.
pub fn is_overwrite_conflict(stderr: &str) -> bool {
    stderr.contains("untracked working tree files would be overwritten")
        || stderr.contains("untracked working tree files would be removed")
}

/// Extract conflicting paths from Git's conflict report.
///
/// Collects the indented lines following a "would be overwritten" or "would
/// be removed" header. Paths that are absolute or climb out of the work tree
/// are dropped.
pub fn parse_conflict_lines(stderr: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut inside = false;

    for line in stderr.lines() {
        if line.contains("would be overwritten by") || line.contains("would be removed by") {
            inside = true;
            continue;
        }

        if !inside {
            continue;
        }

        // INVARIANT: Conflict block ends at the first unindented line.
        if !line.starts_with(['\t', ' ']) {
            inside = false;
            continue;
        }

        let entry = line.trim();
        let entry = entry
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(entry);
        let path = PathBuf::from(entry);
        if !entry.is_empty() && is_contained(&path) {
            paths.push(path);
        }
    }

    paths
}

fn is_contained(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        // INVARIANT: Fall back to copy and remove when rename cannot cross
        //   file systems.
        Err(error) if source.is_file() => {
            debug!("rename failed ({error}), copying instead");
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
        Err(error) => Err(error),
    }
}

/// All possible error types for conflict backup.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Conflict path cannot be mapped under backup root.
    #[error("refusing to back up {0:?}, path is not relative to the work tree")]
    InvalidPath(PathBuf),

    /// Earlier backup would be overwritten.
    #[error("backup destination {0:?} already exists")]
    Exists(PathBuf),

    /// File could not be moved.
    #[error("failed to move {path:?} into backup")]
    Move {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Friendly result alias :3
type Result<T, E = BackupError> = std::result::Result<T, E>;
