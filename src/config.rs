// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the optional settings file to simplify the process of
//! serialization and deserialization. File I/O is left to the caller to figure
//! out.
//!
//! Every setting is optional. Command-line flags and environment variables
//! always take precedence over whatever the settings file provides.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Settings file layout.
///
/// # General Layout
///
/// Settings are split into sections that mirror the subcommands they affect:
/// `repository` for the bound locations, `apply` for checkout behavior, `sync`
/// for remote selection, and `commit` for commit defaults.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Bound locations and initialization defaults.
    pub repository: RepositorySettings,

    /// Checkout behavior.
    pub apply: ApplySettings,

    /// Remote synchronization defaults.
    pub sync: SyncSettings,

    /// Commit defaults.
    pub commit: CommitSettings,
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        settings.repository.storage = expand(settings.repository.storage)?;
        settings.repository.worktree = expand(settings.repository.worktree)?;
        settings.apply.backup_dir = expand(settings.apply.backup_dir)?;

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Location and initialization settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// Path to the bare storage repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<PathBuf>,

    /// Path to the work tree the storage repository is aliased onto.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worktree: Option<PathBuf>,

    /// Initial branch name for new repositories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Git executable to invoke.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,
}

/// Checkout settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplySettings {
    /// Where conflicting untracked files get moved to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
}

/// Remote synchronization settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Name of remote to pull from and push to.
    pub remote: String,

    /// Remote branch to synchronize with. Current branch when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            remote: "origin".into(),
            branch: None,
        }
    }
}

/// Commit settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommitSettings {
    /// Sign every commit.
    pub sign: bool,
}

fn expand(path: Option<PathBuf>) -> Result<Option<PathBuf>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let expanded = shellexpand::full(path.to_string_lossy().as_ref())
        .map_err(ConfigError::ShellExpansion)?
        .into_owned();

    Ok(Some(PathBuf::from(expanded)))
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
