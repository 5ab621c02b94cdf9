// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile management.
//!
//! The [`DotfilesManager`] translates high-level operations into Git
//! invocations against one [`RepositoryBinding`]. Almost every operation is a
//! single Git call whose failure is mapped onto a [`DotfilesError`] kind.
//!
//! # Applying Tracked Files
//!
//! The one piece of real control flow is [`DotfilesManager::apply`]. A fresh
//! machine usually already has files like `.bashrc` sitting in the work tree,
//! which makes Git refuse the checkout. Rather than failing, or worse,
//! overwriting them, apply moves the conflicting files into a backup
//! directory and retries the checkout exactly once.
//!
//! # Synchronization
//!
//! [`DotfilesManager::sync`] is pull-then-push, but the pull half never
//! merges or rebases. Ancestry between local HEAD and the fetched remote
//! branch is decided first, and divergent history is handed back to the
//! caller as [`DotfilesError::SyncConflict`] with local state untouched.

pub mod backup;

use crate::{
    binding::{BindingError, RepositoryBinding},
    git::{GitBin, GitError, GitOutput, GitVersion, MIN_GIT_VERSION},
    manager::backup::{is_overwrite_conflict, parse_conflict_lines, BackupError, BackupRecord},
};

use git2::{ConfigLevel, ObjectType, Oid, Repository, RepositoryInitOptions};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    collections::{HashSet, VecDeque},
    ffi::{OsStr, OsString},
    fs::{self, OpenOptions},
    io::Write as _,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, instrument, warn};

/// Default name of the initial branch of new repositories.
pub const DEFAULT_BRANCH: &str = "main";

/// Default backup directory name, relative to the work tree.
pub const DEFAULT_BACKUP_DIR: &str = ".dotfiles-backup";

/// Outcome of applying tracked files to the work tree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Tracked files that the checkout wrote out fresh.
    pub updated: Vec<PathBuf>,

    /// Untracked files moved aside before the checkout could succeed.
    pub backup: BackupRecord,
}

/// Outcome of synchronizing with a remote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Local branch was fast-forwarded to the remote branch.
    pub fast_forwarded: bool,

    /// Local commits were pushed to the remote branch.
    pub pushed: bool,
}

/// Manage dotfiles tracked in a bare repository.
#[derive(Debug, Clone)]
pub struct DotfilesManager {
    binding: RepositoryBinding,
    git: GitBin,
}

impl DotfilesManager {
    /// Construct manager over an existing binding.
    ///
    /// Use [`RepositoryBinding::open`] to obtain a binding whose locations
    /// have been checked.
    pub fn new(binding: RepositoryBinding, git: GitBin) -> Self {
        Self { binding, git }
    }

    /// Initialize a new bare repository at the storage location.
    ///
    /// With `force`, an existing repository is reinitialized in place, which
    /// keeps its history.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::PathNotFound`] if the work tree does not
    ///   exist.
    /// - Return [`DotfilesError::AlreadyExists`] if a repository exists at
    ///   the storage location and `force` is not set.
    /// - Return [`DotfilesError::InvalidArguments`] if the storage location is
    ///   a non-empty directory that holds no repository.
    /// - Return [`DotfilesError::Git2`] if libgit2 initialization fails.
    #[instrument(skip(binding, git), level = "debug")]
    pub fn init(
        binding: RepositoryBinding,
        branch: &str,
        force: bool,
        git: GitBin,
    ) -> Result<Self> {
        Self::check_vacant(&binding, force)?;

        info!("initialize bare repository at {:?}", binding.storage().display());
        let mut opts = RepositoryInitOptions::new();
        opts.bare(true);
        opts.mkpath(true);
        opts.initial_head(branch);
        Repository::init_opts(binding.storage(), &opts)?;

        let manager = Self::new(binding, git);
        manager.exclude_storage()?;

        Ok(manager)
    }

    /// Clone existing remote as a bare repository into the storage location.
    ///
    /// The new repository is configured to hide untracked files, and a
    /// fetch refspec is added so remote-tracking branches exist. Nothing is
    /// checked out; follow up with [`DotfilesManager::apply`].
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::PathNotFound`] if the work tree does not
    ///   exist.
    /// - Return [`DotfilesError::AlreadyExists`] if a repository exists at
    ///   the storage location.
    /// - Return [`DotfilesError::ExternalToolFailure`] if the clone fails.
    #[instrument(skip(binding, git), level = "debug")]
    pub fn clone_remote(url: &str, binding: RepositoryBinding, git: GitBin) -> Result<Self> {
        Self::check_vacant(&binding, false)?;

        info!("clone {url} into {:?}", binding.storage().display());
        let storage = binding.storage().as_os_str().to_owned();
        let output = git.call_unbound([
            OsString::from("clone"),
            OsString::from("--bare"),
            OsString::from(url),
            storage,
        ])?;
        if !output.success() {
            return Err(DotfilesError::external("clone", &output));
        }

        let manager = Self::new(binding, git);
        manager.configure(true)?;
        let repository = manager.binding.repository()?;
        repository.config()?.open_level(ConfigLevel::Local)?.set_str(
            "remote.origin.fetch",
            "+refs/heads/*:refs/remotes/origin/*",
        )?;
        manager.exclude_storage()?;

        Ok(manager)
    }

    /// Binding this manager operates on.
    pub fn binding(&self) -> &RepositoryBinding {
        &self.binding
    }

    /// Toggle reporting of untracked files in the work tree.
    ///
    /// A work tree alias like `$HOME` is full of files nobody wants tracked,
    /// so status output is unusable unless untracked files are hidden.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::NotInitialized`] if the storage location
    ///   holds no repository.
    #[instrument(skip(self), level = "debug")]
    pub fn configure(&self, hide_untracked: bool) -> Result<()> {
        let repository = self.binding.repository()?;
        let mut config = repository.config()?.open_level(ConfigLevel::Local)?;
        let value = if hide_untracked { "no" } else { "normal" };
        debug!("set status.showUntrackedFiles to {value}");
        config.set_str("status.showUntrackedFiles", value)?;

        Ok(())
    }

    /// Stage target paths for the next commit.
    ///
    /// Every path is validated before anything is staged. Returns the staged
    /// paths relative to the work tree.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::InvalidArguments`] if no paths are given, or
    ///   a path lies outside the work tree or inside the storage location.
    /// - Return [`DotfilesError::PathNotFound`] if a path does not exist.
    /// - Return [`DotfilesError::ExternalToolFailure`] if staging fails.
    #[instrument(skip(self, paths), level = "debug")]
    pub fn track(&self, paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Result<Vec<PathBuf>> {
        let relative = self.resolve_paths(paths)?;
        for path in &relative {
            let full_path = self.binding.worktree().join(path);
            if full_path.symlink_metadata().is_err() {
                return Err(DotfilesError::PathNotFound(full_path));
            }
        }

        info!("track {} path(s)", relative.len());
        self.call_checked("add", args_with_paths(["add", "--"], &relative))?;

        Ok(relative)
    }

    /// Stop tracking target paths, leaving them in the work tree.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::InvalidArguments`] if no paths are given, or
    ///   a path lies outside the work tree or inside the storage location.
    /// - Return [`DotfilesError::ExternalToolFailure`] if unstaging fails,
    ///   e.g., a path is not tracked.
    #[instrument(skip(self, paths), level = "debug")]
    pub fn untrack(&self, paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Result<Vec<PathBuf>> {
        let relative = self.resolve_paths(paths)?;
        info!("untrack {} path(s)", relative.len());
        self.call_checked(
            "rm",
            args_with_paths(["rm", "--cached", "-r", "--quiet", "--"], &relative),
        )?;

        Ok(relative)
    }

    /// Record staged changes as a new commit.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::InvalidArguments`] if the message is blank.
    /// - Return [`DotfilesError::NothingToCommit`] if nothing is staged. No
    ///   commit object gets created in that case.
    /// - Return [`DotfilesError::SigningFailed`] if signing was requested and
    ///   Git could not sign.
    /// - Return [`DotfilesError::ExternalToolFailure`] for any other failure.
    #[instrument(skip(self, message), level = "debug")]
    pub fn commit(&self, message: &str, sign: bool) -> Result<()> {
        if message.trim().is_empty() {
            return Err(DotfilesError::InvalidArguments(
                "commit message cannot be empty".into(),
            ));
        }

        // INVARIANT: Exit code 1 means staged changes exist, 0 means none.
        let staged = self.git.call(&self.binding, ["diff", "--cached", "--quiet"])?;
        match staged.code() {
            Some(0) => return Err(DotfilesError::NothingToCommit),
            Some(1) => {}
            _ => return Err(DotfilesError::external("diff", &staged)),
        }

        let mut args = vec!["commit"];
        if sign {
            args.push("--gpg-sign");
        }
        args.extend(["-m", message]);

        let output = self.git.call(&self.binding, args)?;
        if output.success() {
            info!("{}", output.message());
            return Ok(());
        }

        let text = output.message();
        if text.contains("nothing to commit") || text.contains("no changes added to commit") {
            Err(DotfilesError::NothingToCommit)
        } else if sign && is_signing_failure(&text) {
            Err(DotfilesError::SigningFailed(text))
        } else {
            Err(DotfilesError::external("commit", &output))
        }
    }

    /// Check out tracked files of current branch into the work tree.
    ///
    /// Untracked files that block the checkout are moved into `backup_dir`,
    /// keeping their path relative to the work tree, and the checkout is
    /// retried exactly once.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::Backup`] if conflicting files cannot be moved.
    /// - Return [`DotfilesError::CheckoutFailed`] if the retry still conflicts.
    /// - Return [`DotfilesError::ExternalToolFailure`] for any other checkout
    ///   failure.
    #[instrument(skip(self, backup_dir), level = "debug")]
    pub fn apply(&self, backup_dir: impl AsRef<Path>) -> Result<ApplyReport> {
        let backup_dir = backup_dir.as_ref();
        if self.is_empty()? {
            warn!("repository {:?} has no commits, nothing to apply", self.binding.storage().display());
            return Ok(ApplyReport {
                updated: Vec::new(),
                backup: BackupRecord::empty(backup_dir),
            });
        }

        let tracked = self.list_tracked_files()?;
        let indexed = self.indexed_paths()?;
        let updated: Vec<PathBuf> = tracked
            .iter()
            .filter(|path| !indexed.contains(*path))
            .cloned()
            .collect();

        let first = self.git.call(&self.binding, ["checkout"])?;
        if first.success() {
            return Ok(ApplyReport {
                updated,
                backup: BackupRecord::empty(backup_dir),
            });
        }

        if !is_overwrite_conflict(&first.stderr) {
            return Err(DotfilesError::external("checkout", &first));
        }

        let conflicts = self.enumerate_conflicts(&tracked, &first.stderr)?;
        warn!(
            "checkout blocked by {} untracked file(s), moving them to {:?}",
            conflicts.len(),
            backup_dir.display()
        );
        let backup = BackupRecord::relocate(self.binding.worktree(), backup_dir, conflicts)?;

        // INVARIANT: Retry exactly once.
        let retry = self.git.call(&self.binding, ["checkout"])?;
        if retry.success() {
            return Ok(ApplyReport { updated, backup });
        }

        if is_overwrite_conflict(&retry.stderr) {
            let conflicts = self.enumerate_conflicts(&tracked, &retry.stderr)?;
            return Err(DotfilesError::CheckoutFailed { conflicts });
        }

        Err(DotfilesError::external("checkout", &retry))
    }

    /// Pull from and push to target remote branch.
    ///
    /// The pull half only ever fast-forwards. A remote branch that does not
    /// exist yet is simply pushed to.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::SyncConflict`] if local and remote history
    ///   have diverged, or the remote rejects the push as non-fast-forward.
    /// - Return [`DotfilesError::ExternalToolFailure`] if fetching, merging,
    ///   or pushing fails otherwise.
    #[instrument(skip(self), level = "debug")]
    pub fn sync(&self, remote: &str, branch: &str) -> Result<SyncReport> {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        let result = self.sync_with_progress(remote, branch, &bar);
        bar.finish_and_clear();
        result
    }

    fn sync_with_progress(&self, remote: &str, branch: &str, bar: &ProgressBar) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        bar.set_message(format!("fetch {remote}/{branch}"));
        let fetch = self.git.call(&self.binding, ["fetch", remote, branch])?;
        let fetched = if fetch.success() {
            Some(self.rev_parse("FETCH_HEAD")?)
        } else if fetch.stderr.contains("couldn't find remote ref") {
            info!("{remote}/{branch} does not exist yet");
            None
        } else {
            return Err(DotfilesError::external("fetch", &fetch));
        };

        let local = self.head_oid()?;
        if let Some(fetched) = fetched {
            let repository = self.binding.repository()?;
            let behind = match local {
                None => true,
                Some(local) if local == fetched => false,
                Some(local) if repository.graph_descendant_of(fetched, local)? => true,
                Some(local) if repository.graph_descendant_of(local, fetched)? => false,
                Some(_) => {
                    return Err(DotfilesError::SyncConflict {
                        remote: remote.into(),
                        branch: branch.into(),
                    })
                }
            };

            if behind {
                bar.set_message(format!("fast-forward to {remote}/{branch}"));
                let merge = self.git.call(&self.binding, ["merge", "--ff-only", "FETCH_HEAD"])?;
                if !merge.success() {
                    return Err(DotfilesError::external("merge", &merge));
                }
                info!("fast-forwarded to {remote}/{branch}");
                report.fast_forwarded = true;
            }
        }

        let Some(local) = self.head_oid()? else {
            warn!("nothing to push, repository has no commits");
            return Ok(report);
        };

        if fetched != Some(local) {
            bar.set_message(format!("push to {remote}/{branch}"));
            let refspec = format!("HEAD:refs/heads/{branch}");
            let push = self.git.call(&self.binding, ["push", remote, refspec.as_str()])?;
            if !push.success() {
                if push.stderr.contains("[rejected]") || push.stderr.contains("non-fast-forward") {
                    return Err(DotfilesError::SyncConflict {
                        remote: remote.into(),
                        branch: branch.into(),
                    });
                }
                return Err(DotfilesError::external("push", &push));
            }
            info!("pushed to {remote}/{branch}");
            report.pushed = true;
        }

        Ok(report)
    }

    /// Short status of tracked files.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::ExternalToolFailure`] if Git fails.
    pub fn status(&self) -> Result<String> {
        let output = self.call_checked("status", ["status", "--short", "--branch"])?;
        Ok(output.stdout)
    }

    /// Name of the branch HEAD points to, even when it has no commits yet.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::InvalidArguments`] if HEAD is detached.
    pub fn current_branch(&self) -> Result<String> {
        let repository = self.binding.repository()?;
        let head = repository.find_reference("HEAD")?;
        head.symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .map(ToString::to_string)
            .ok_or_else(|| DotfilesError::InvalidArguments("HEAD is detached, name a branch".into()))
    }

    /// List files tracked at HEAD, relative to the work tree.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::Git2`] if the HEAD tree cannot be walked.
    pub fn list_tracked_files(&self) -> Result<Vec<PathBuf>> {
        let repository = self.binding.repository()?;
        if self.is_empty()? {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let tree = repository.head()?.peel_to_commit()?.tree()?;
        let mut trees_and_paths = VecDeque::new();
        trees_and_paths.push_front((tree, PathBuf::new()));

        // Use DFS to traverse HEAD tree.
        while let Some((tree, path)) = trees_and_paths.pop_front() {
            for tree_entry in &tree {
                let Some(name) = tree_entry.name() else {
                    continue;
                };
                match tree_entry.kind() {
                    // INVARIANT: Hit a tree? Traverse it!
                    Some(ObjectType::Tree) => {
                        let next_tree = repository.find_tree(tree_entry.id())?;
                        trees_and_paths.push_front((next_tree, path.join(name)));
                    }
                    // INVARIANT: Hit a blob? Record our current path!
                    Some(ObjectType::Blob) => entries.push(path.join(name)),
                    _ => continue,
                }
            }
        }

        entries.sort();
        Ok(entries)
    }

    /// Run Git on the binding with the current terminal attached.
    ///
    /// # Errors
    ///
    /// - Return [`DotfilesError::ExternalToolFailure`] if Git exits non-zero.
    pub fn gitcall_interactive(&self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Result<()> {
        let status = self.git.call_interactive(&self.binding, args)?;
        if !status.success() {
            return Err(DotfilesError::ExternalToolFailure {
                command: "git".into(),
                message: format!("exited with {status}"),
            });
        }

        Ok(())
    }

    fn check_vacant(binding: &RepositoryBinding, force: bool) -> Result<()> {
        if !binding.worktree().is_dir() {
            return Err(DotfilesError::PathNotFound(binding.worktree().to_path_buf()));
        }

        if binding.repository().is_ok() {
            if force {
                warn!("reinitialize existing repository {:?}", binding.storage().display());
                return Ok(());
            }
            return Err(DotfilesError::AlreadyExists(binding.storage().to_path_buf()));
        }

        let occupied = fs::read_dir(binding.storage())
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if occupied {
            return Err(DotfilesError::InvalidArguments(format!(
                "storage location {:?} is not empty and holds no repository",
                binding.storage()
            )));
        }

        Ok(())
    }

    fn resolve_paths(&self, paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Result<Vec<PathBuf>> {
        let cwd = std::env::current_dir()?;
        let relative = paths
            .into_iter()
            .map(|path| self.binding.relativize(path, &cwd))
            .collect::<std::result::Result<Vec<_>, BindingError>>()?;

        if relative.is_empty() {
            return Err(DotfilesError::InvalidArguments("no paths given".into()));
        }

        Ok(relative)
    }

    fn call_checked(
        &self,
        command: &str,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<GitOutput> {
        let output = self.git.call(&self.binding, args)?;
        if !output.success() {
            return Err(DotfilesError::external(command, &output));
        }

        Ok(output)
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.head_oid()?.is_none())
    }

    fn head_oid(&self) -> Result<Option<Oid>> {
        let repository = self.binding.repository()?;
        let oid = repository
            .head()
            .ok()
            .and_then(|head| head.target())
            .and_then(|oid| repository.find_commit(oid).ok())
            .map(|commit| commit.id());

        Ok(oid)
    }

    fn rev_parse(&self, revision: &str) -> Result<Oid> {
        let output = self.call_checked("rev-parse", ["rev-parse", "--verify", revision])?;
        Ok(Oid::from_str(output.stdout.trim())?)
    }

    fn indexed_paths(&self) -> Result<HashSet<PathBuf>> {
        let output = self.call_checked("ls-files", ["ls-files", "-z"])?;
        Ok(output
            .stdout
            .split('\0')
            .filter(|entry| !entry.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    /// Tracked paths present on disk but absent from the index are what Git
    /// refuses to overwrite. A file blocking a tracked directory only shows
    /// up in Git's report, so both sources are merged.
    fn enumerate_conflicts(&self, tracked: &[PathBuf], stderr: &str) -> Result<Vec<PathBuf>> {
        let indexed = self.indexed_paths()?;
        let mut conflicts: Vec<PathBuf> = tracked
            .iter()
            .filter(|path| !indexed.contains(*path))
            .filter(|path| self.binding.worktree().join(path).symlink_metadata().is_ok())
            .cloned()
            .collect();

        let reported = parse_conflict_lines(stderr);
        debug!("checkout report names {} conflict(s)", reported.len());
        conflicts.extend(reported);
        conflicts.sort();
        conflicts.dedup();

        Ok(conflicts)
    }

    /// Keep Git from descending into a storage location nested in the work
    /// tree, e.g., `~/.local/share/baredot/dotfiles.git` under `$HOME`.
    fn exclude_storage(&self) -> Result<()> {
        let Some(relative) = self.binding.storage_in_worktree() else {
            return Ok(());
        };

        let components: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        let pattern = format!("/{}/", components.join("/"));

        let info = self.binding.storage().join("info");
        mkdirp::mkdirp(&info)?;
        let exclude = info.join("exclude");
        let current = fs::read_to_string(&exclude).unwrap_or_default();
        if current.lines().any(|line| line.trim() == pattern) {
            return Ok(());
        }

        debug!("exclude {pattern} in {}", exclude.display());
        let mut file = OpenOptions::new().create(true).append(true).open(&exclude)?;
        if !current.is_empty() && !current.ends_with('\n') {
            writeln!(file)?;
        }
        writeln!(file, "{pattern}")?;

        Ok(())
    }
}

/// Verify Git is installed and recent enough.
///
/// # Errors
///
/// - Return [`DotfilesError::DependencyMissing`] if Git is absent, its version
///   cannot be determined, or it is older than [`MIN_GIT_VERSION`].
pub fn version_check(git: &GitBin) -> Result<GitVersion> {
    let version = git.version()?;
    debug!("found git {version}");
    if version < MIN_GIT_VERSION {
        return Err(DotfilesError::DependencyMissing(format!(
            "git {version} is older than required {MIN_GIT_VERSION}"
        )));
    }

    Ok(version)
}

fn args_with_paths<'a>(
    leading: impl IntoIterator<Item = &'a str>,
    paths: &[PathBuf],
) -> Vec<OsString> {
    leading
        .into_iter()
        .map(OsString::from)
        .chain(paths.iter().map(|path| path.as_os_str().to_owned()))
        .collect()
}

fn is_signing_failure(text: &str) -> bool {
    let text = text.to_lowercase();
    ["failed to sign", "gpg failed", "signing failed", "no secret key", "cannot run gpg"]
        .iter()
        .any(|needle| text.contains(needle))
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("\n  {}", path.display()))
        .collect()
}

/// All possible error types for dotfile management.
#[derive(Debug, thiserror::Error)]
pub enum DotfilesError {
    /// Repository already exists at storage location.
    #[error("repository already exists at {0:?}, use --force to reinitialize")]
    AlreadyExists(PathBuf),

    /// No repository at storage location.
    #[error("no repository initialized at {0:?}")]
    NotInitialized(PathBuf),

    /// Path does not exist.
    #[error("path {0:?} does not exist")]
    PathNotFound(PathBuf),

    /// Staging area matches HEAD.
    #[error("nothing staged to commit")]
    NothingToCommit,

    /// Git could not sign commit.
    #[error("failed to sign commit:\n{0}")]
    SigningFailed(String),

    /// Checkout still conflicts after backing up untracked files.
    #[error("checkout still blocked by untracked files, resolve manually:{}", join_paths(.conflicts))]
    CheckoutFailed { conflicts: Vec<PathBuf> },

    /// Local and remote history diverged.
    #[error("local history diverged from {remote}/{branch}, resolve manually")]
    SyncConflict { remote: String, branch: String },

    /// Git is absent or too old.
    #[error("git dependency unavailable: {0}")]
    DependencyMissing(String),

    /// Caller supplied unusable arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Git failed in a way no other kind describes.
    #[error("git {command} failed:\n{message}")]
    ExternalToolFailure { command: String, message: String },

    /// Conflicting files could not be backed up.
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// File system operations fail.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

impl DotfilesError {
    fn external(command: &str, output: &GitOutput) -> Self {
        Self::ExternalToolFailure {
            command: command.into(),
            message: output.message(),
        }
    }

    /// Process exit code reported for this error.
    ///
    /// Invalid arguments exit with 2, conflicts that need manual resolution
    /// with 3, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArguments(_) => 2,
            Self::CheckoutFailed { .. } | Self::SyncConflict { .. } => 3,
            _ => 1,
        }
    }
}

impl From<GitError> for DotfilesError {
    fn from(error: GitError) -> Self {
        match error {
            GitError::NotFound { program } => {
                Self::DependencyMissing(format!("git executable {program:?} not found"))
            }
            GitError::Version(banner) => {
                Self::DependencyMissing(format!("cannot determine git version from {banner:?}"))
            }
            GitError::Spawn(error) => Self::Io(error),
        }
    }
}

impl From<BindingError> for DotfilesError {
    fn from(error: BindingError) -> Self {
        match error {
            BindingError::NotInitialized(path, _) => Self::NotInitialized(path),
            BindingError::WorkTreeMissing(path) => Self::PathNotFound(path),
            other => Self::InvalidArguments(other.to_string()),
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = DotfilesError> = std::result::Result<T, E>;
