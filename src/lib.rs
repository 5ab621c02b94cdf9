// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile management through a bare repository.
//!
//! Dotfiles live in a bare Git repository, the __storage location__, whose
//! work tree is aliased onto another directory, the __work tree__, usually
//! the user's home directory. Both locations are bound once through a
//! [`RepositoryBinding`], and a [`DotfilesManager`] translates high-level
//! operations into calls to the Git executable with both locations bound.
//!
//! # See Also
//!
//! 1. [ArchWiki - dotfiles](https://wiki.archlinux.org/title/Dotfiles#Tracking_dotfiles_directly_with_Git)

pub mod binding;
pub mod config;
pub mod git;
pub mod manager;
pub mod path;

pub use binding::{BindingError, RepositoryBinding, WorkTree};
pub use config::{ConfigError, Settings};
pub use git::{GitBin, GitError, GitVersion, MIN_GIT_VERSION};
pub use manager::{
    backup::BackupRecord, version_check, ApplyReport, DotfilesError, DotfilesManager, SyncReport,
};
