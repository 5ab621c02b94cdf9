// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External Git binary invocation.
//!
//! All operations that change the storage repository or its work tree go
//! through the Git executable itself rather than libgit2. The executable is
//! run as a blocking child process with the storage location bound through
//! `--git-dir` and the work tree bound through `--work-tree`, which is exactly
//! what the classic shell alias for the bare repository technique does.
//!
//! Output is captured for non-interactive calls so callers can inspect exit
//! codes and map Git's failures onto their own error kinds. Interactive calls
//! inherit the terminal.

use crate::binding::RepositoryBinding;

use std::{
    ffi::{OsStr, OsString},
    fmt::{Display, Formatter, Result as FmtResult},
    io::ErrorKind,
    process::{Command, ExitStatus},
};
use tracing::{debug, instrument};

/// Oldest Git release whose command-line behavior is relied upon.
pub const MIN_GIT_VERSION: GitVersion = GitVersion {
    major: 2,
    minor: 20,
    patch: 0,
};

/// Handle to the Git executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitBin {
    program: OsString,
}

impl Default for GitBin {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitBin {
    /// Construct new handle to target Git executable.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Name or path of the executable being invoked.
    pub fn program(&self) -> &OsStr {
        self.program.as_os_str()
    }

    /// Call Git with both locations of binding bound, capturing its output.
    ///
    /// Runs inside the work tree so relative path arguments are interpreted
    /// relative to it. A non-zero exit is not an error here; inspect the
    /// returned [`GitOutput`] instead.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::NotFound`] if the executable does not exist.
    /// - Return [`GitError::Spawn`] if the process cannot be run.
    #[instrument(skip(self, binding, args), level = "debug")]
    pub fn call(
        &self,
        binding: &RepositoryBinding,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<GitOutput> {
        let mut command = Command::new(&self.program);
        command
            .args(binding.path_args())
            .args(["-c", "core.quotePath=false"])
            .args(args);
        if binding.worktree().is_dir() {
            command.current_dir(binding.worktree());
        }

        self.output(command)
    }

    /// Call Git without binding any locations.
    ///
    /// Used for commands that operate before a binding is valid, e.g.,
    /// cloning into the storage location, or querying the version.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::NotFound`] if the executable does not exist.
    /// - Return [`GitError::Spawn`] if the process cannot be run.
    pub fn call_unbound(&self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Result<GitOutput> {
        let mut command = Command::new(&self.program);
        command.args(args);
        self.output(command)
    }

    /// Call Git with both locations bound, handing it the current terminal.
    ///
    /// Blocks until Git exits.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::NotFound`] if the executable does not exist.
    /// - Return [`GitError::Spawn`] if the process cannot be run.
    pub fn call_interactive(
        &self,
        binding: &RepositoryBinding,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<ExitStatus> {
        let mut command = Command::new(&self.program);
        command.args(binding.path_args()).args(args);
        if binding.worktree().is_dir() {
            command.current_dir(binding.worktree());
        }
        debug!("run interactive {command:?}");

        let status = command
            .spawn()
            .map_err(|error| self.spawn_error(error))?
            .wait()?;

        Ok(status)
    }

    /// Determine version of Git executable.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::NotFound`] if the executable does not exist.
    /// - Return [`GitError::Version`] if the version banner cannot be parsed.
    pub fn version(&self) -> Result<GitVersion> {
        let output = self.call_unbound(["--version"])?;
        if !output.success() {
            return Err(GitError::Version(output.message()));
        }

        output.stdout.parse()
    }

    fn output(&self, mut command: Command) -> Result<GitOutput> {
        debug!("run {command:?}");
        let output = command.output().map_err(|error| self.spawn_error(error))?;
        let output = GitOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(output.stdout.as_slice()).into_owned(),
            stderr: String::from_utf8_lossy(output.stderr.as_slice()).into_owned(),
        };
        debug!(status = %output.status, "git exited");

        Ok(output)
    }

    fn spawn_error(&self, error: std::io::Error) -> GitError {
        match error.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => GitError::NotFound {
                program: self.program.to_string_lossy().into_owned(),
            },
            _ => GitError::Spawn(error),
        }
    }
}

/// Captured result of a finished Git process.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Git exited with zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, if Git was not killed by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Standard output and standard error joined together, trailing newline
    /// chomped.
    pub fn message(&self) -> String {
        let mut message = String::new();
        if !self.stdout.trim().is_empty() {
            message.push_str(self.stdout.as_str());
        }

        if !self.stderr.trim().is_empty() {
            if !message.is_empty() && !message.ends_with('\n') {
                message.push('\n');
            }
            message.push_str(self.stderr.as_str());
        }

        // INVARIANT: Chomp trailing newlines.
        message.trim_end_matches(['\r', '\n']).to_string()
    }
}

/// Semantic version of Git executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl std::str::FromStr for GitVersion {
    type Err = GitError;

    /// Parse banner like "git version 2.39.3 (Apple Git-146)", or
    /// "git version 2.45.1.windows.1".
    fn from_str(banner: &str) -> Result<Self, Self::Err> {
        let invalid = || GitError::Version(banner.trim().to_string());
        let number = banner
            .trim()
            .strip_prefix("git version")
            .and_then(|rest| rest.split_whitespace().next())
            .ok_or_else(invalid)?;

        let mut parts = number
            .split('.')
            .map(|part| part.parse::<u32>().ok());
        let major = parts.next().flatten().ok_or_else(invalid)?;
        let minor = parts.next().flatten().ok_or_else(invalid)?;
        let patch = parts.next().flatten().unwrap_or(0);

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl Display for GitVersion {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// All possible error types for Git invocation.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// Executable cannot be found or run.
    #[error("git executable {program:?} not found")]
    NotFound { program: String },

    /// Executable could not be spawned for any other reason.
    #[error(transparent)]
    Spawn(#[from] std::io::Error),

    /// Version banner is not understood.
    #[error("cannot determine git version from {0:?}")]
    Version(String),
}

/// Friendly result alias :3
type Result<T, E = GitError> = std::result::Result<T, E>;
