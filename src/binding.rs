// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository binding.
//!
//! # Bare-Alias Repositories
//!
//! Bare repositories lack a working tree by definition, but Git allows the
//! caller to force one by designating a directory as an alias for a working
//! tree through the "--work-tree" argument. Keeping the Git directory and the
//! alias working tree apart allows an entire directory, usually `$HOME`, to be
//! tracked without initializing it as a repository.
//!
//! A [`RepositoryBinding`] pairs the two locations once, and every Git call
//! made afterwards has both of them bound.
//!
//! # See Also
//!
//! 1. [ArchWiki - dotfiles](https://wiki.archlinux.org/title/Dotfiles#Tracking_dotfiles_directly_with_Git)

use crate::path::normalize;

use git2::Repository;
use std::{
    ffi::OsString,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

/// Storage location paired with the work tree it is aliased onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryBinding {
    storage: PathBuf,
    worktree: WorkTree,
}

impl RepositoryBinding {
    /// Construct new binding without checking either location.
    ///
    /// Only meant for operations that create the storage location, like
    /// initialization and cloning.
    pub fn new(storage: impl Into<PathBuf>, worktree: impl Into<PathBuf>) -> Self {
        Self {
            storage: storage.into(),
            worktree: WorkTree::new(worktree),
        }
    }

    /// Construct new binding to an existing bare repository.
    ///
    /// # Errors
    ///
    /// - Return [`BindingError::NotInitialized`] if no repository exists at
    ///   the storage location.
    /// - Return [`BindingError::NotBare`] if the repository has its own work
    ///   tree.
    /// - Return [`BindingError::WorkTreeMissing`] if the work tree is not an
    ///   existing directory.
    pub fn open(storage: impl Into<PathBuf>, worktree: impl Into<PathBuf>) -> Result<Self> {
        let binding = Self::new(storage, worktree);
        let repository = binding.repository()?;
        if !repository.is_bare() {
            return Err(BindingError::NotBare(binding.storage));
        }

        if !binding.worktree().is_dir() {
            return Err(BindingError::WorkTreeMissing(binding.worktree.0));
        }

        Ok(binding)
    }

    /// Path to the bare storage repository.
    pub fn storage(&self) -> &Path {
        self.storage.as_path()
    }

    /// Path to the work tree alias.
    pub fn worktree(&self) -> &Path {
        self.worktree.as_path()
    }

    /// Open storage repository through libgit2.
    ///
    /// # Errors
    ///
    /// - Return [`BindingError::NotInitialized`] if no repository exists at
    ///   the storage location.
    pub fn repository(&self) -> Result<Repository> {
        Repository::open(&self.storage)
            .map_err(|error| BindingError::NotInitialized(self.storage.clone(), error))
    }

    /// Storage location relative to the work tree, if the work tree holds it.
    pub fn storage_in_worktree(&self) -> Option<PathBuf> {
        let storage = normalize(std::path::absolute(&self.storage).ok()?);
        let worktree = normalize(std::path::absolute(self.worktree()).ok()?);
        storage
            .strip_prefix(&worktree)
            .ok()
            .filter(|relative| !relative.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    /// Arguments that bind both locations for a Git invocation.
    pub fn path_args(&self) -> Vec<OsString> {
        vec![
            "--git-dir".into(),
            self.storage.clone().into_os_string(),
            "--work-tree".into(),
            self.worktree.to_os_string(),
        ]
    }

    /// Express user supplied path relative to the work tree.
    ///
    /// Relative paths are resolved against `cwd` when `cwd` lies inside the
    /// work tree, and against the work tree itself otherwise. Resolution is
    /// purely lexical so symlinked dotfiles are tracked as symlinks.
    ///
    /// # Errors
    ///
    /// - Return [`BindingError::OutsideWorkTree`] if the path escapes the
    ///   work tree.
    /// - Return [`BindingError::InsideStorage`] if the path points into the
    ///   storage location.
    pub fn relativize(&self, path: impl AsRef<Path>, cwd: impl AsRef<Path>) -> Result<PathBuf> {
        let cwd = normalize(cwd.as_ref());
        let worktree = normalize(cwd.join(self.worktree()));
        let storage = normalize(cwd.join(self.storage()));

        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            normalize(path)
        } else if cwd.starts_with(&worktree) {
            normalize(cwd.join(path))
        } else {
            normalize(worktree.join(path))
        };

        if absolute.starts_with(&storage) {
            return Err(BindingError::InsideStorage(absolute));
        }

        match absolute.strip_prefix(&worktree) {
            Ok(relative) if !relative.as_os_str().is_empty() => Ok(relative.to_path_buf()),
            _ => Err(BindingError::OutsideWorkTree(absolute)),
        }
    }
}

impl Display for RepositoryBinding {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{} -> {}", self.storage.display(), self.worktree)
    }
}

/// Path acting as the work tree alias of the storage repository.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct WorkTree(PathBuf);

impl WorkTree {
    /// Construct new work tree alias.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Convert work tree alias to [`OsString`].
    pub fn to_os_string(&self) -> OsString {
        self.0.clone().into_os_string()
    }

    /// Treat work tree alias as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for WorkTree {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// All possible error types for binding locations.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// No repository at storage location.
    #[error("no repository initialized at {0:?}")]
    NotInitialized(PathBuf, #[source] git2::Error),

    /// Repository at storage location carries its own work tree.
    #[error("repository at {0:?} is not bare")]
    NotBare(PathBuf),

    /// Work tree alias does not exist.
    #[error("work tree {0:?} does not exist")]
    WorkTreeMissing(PathBuf),

    /// Path lies outside of work tree alias.
    #[error("path {0:?} is outside of the work tree")]
    OutsideWorkTree(PathBuf),

    /// Path lies inside of storage location.
    #[error("path {0:?} is inside of the storage repository")]
    InsideStorage(PathBuf),
}

/// Friendly result alias :3
type Result<T, E = BindingError> = std::result::Result<T, E>;
