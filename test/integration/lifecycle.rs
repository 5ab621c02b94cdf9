// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{head_of, set_identity, Workspace};

use anyhow::Result;
use baredot::{DotfilesError, DotfilesManager, GitBin, RepositoryBinding};
use git2::Repository;
use pretty_assertions::assert_eq;
use std::{fs, path::PathBuf};

#[test]
fn init_configure_track_commit() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    manager.configure(true)?;

    let bashrc = ws.write(".bashrc", "alias ll='ls -l'\n")?;
    let init_lua = ws.write(".config/nvim/init.lua", "vim.opt.number = true\n")?;
    let staged = manager.track([&bashrc, &init_lua])?;
    assert_eq!(
        staged,
        vec![PathBuf::from(".bashrc"), PathBuf::from(".config/nvim/init.lua")]
    );

    manager.commit("add shell and editor", false)?;
    assert_eq!(
        manager.list_tracked_files()?,
        vec![PathBuf::from(".bashrc"), PathBuf::from(".config/nvim/init.lua")]
    );

    let repo = Repository::open(ws.storage())?;
    assert!(repo.is_bare());
    assert_eq!(repo.config()?.get_string("status.showUntrackedFiles")?, "no");

    Ok(())
}

#[test]
fn configure_can_show_untracked_again() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    manager.configure(true)?;
    manager.configure(false)?;

    let repo = Repository::open(ws.storage())?;
    assert_eq!(repo.config()?.get_string("status.showUntrackedFiles")?, "normal");

    Ok(())
}

#[test]
fn configure_without_repository_is_not_initialized() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    fs::remove_dir_all(ws.storage())?;

    let result = manager.configure(true);
    assert!(matches!(result, Err(DotfilesError::NotInitialized(_))));

    Ok(())
}

#[test]
fn commit_with_nothing_staged_creates_no_commit() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;

    let result = manager.commit("empty", false);
    assert!(matches!(result, Err(DotfilesError::NothingToCommit)));
    assert_eq!(head_of(ws.storage())?, None);

    let gitconfig = ws.write(".gitconfig", "[core]\n\teditor = vim\n")?;
    manager.track([&gitconfig])?;
    manager.commit("add gitconfig", false)?;
    let head = head_of(ws.storage())?;
    assert!(head.is_some());

    let result = manager.commit("again", false);
    assert!(matches!(result, Err(DotfilesError::NothingToCommit)));
    assert_eq!(head_of(ws.storage())?, head);

    Ok(())
}

#[test]
fn commit_rejects_blank_message() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    let profile = ws.write(".profile", "export EDITOR=vim\n")?;
    manager.track([&profile])?;

    let result = manager.commit("   ", false);
    assert!(matches!(result, Err(DotfilesError::InvalidArguments(_))));
    assert_eq!(head_of(ws.storage())?, None);

    Ok(())
}

#[cfg(unix)]
#[test]
fn commit_reports_signing_failure() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    {
        let repo = Repository::open(ws.storage())?;
        let mut config = repo.config()?.open_level(git2::ConfigLevel::Local)?;
        config.set_str("gpg.program", "false")?;
        config.set_str("user.signingkey", "0xDEADBEEF")?;
    }

    let profile = ws.write(".profile", "export EDITOR=vim\n")?;
    manager.track([&profile])?;

    let result = manager.commit("signed", true);
    assert!(matches!(result, Err(DotfilesError::SigningFailed(_))));
    assert_eq!(head_of(ws.storage())?, None);

    Ok(())
}

#[test]
fn init_twice_is_already_exists() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    let bashrc = ws.write(".bashrc", "set -o vi\n")?;
    manager.track([&bashrc])?;
    manager.commit("add bashrc", false)?;
    let head = head_of(ws.storage())?;

    let result = DotfilesManager::init(ws.binding(), "main", false, GitBin::default());
    assert!(matches!(result, Err(DotfilesError::AlreadyExists(_))));

    // Forced reinitialization keeps history.
    DotfilesManager::init(ws.binding(), "main", true, GitBin::default())?;
    assert_eq!(head_of(ws.storage())?, head);

    Ok(())
}

#[test]
fn init_requires_existing_worktree() -> Result<()> {
    let ws = Workspace::new()?;
    let binding = RepositoryBinding::new(ws.storage(), ws.root().join("missing"));

    let result = DotfilesManager::init(binding, "main", false, GitBin::default());
    assert!(matches!(result, Err(DotfilesError::PathNotFound(_))));
    assert!(!ws.storage().exists());

    Ok(())
}

#[test]
fn init_refuses_occupied_storage() -> Result<()> {
    let ws = Workspace::new()?;
    fs::create_dir_all(ws.storage())?;
    fs::write(ws.storage().join("notes.txt"), "not a repository")?;

    let result = DotfilesManager::init(ws.binding(), "main", false, GitBin::default());
    assert!(matches!(result, Err(DotfilesError::InvalidArguments(_))));

    Ok(())
}

#[test]
fn track_missing_path_stages_nothing() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    let bashrc = ws.write(".bashrc", "set -o vi\n")?;

    let result = manager.track([bashrc, ws.worktree().join(".zshrc")]);
    assert!(matches!(result, Err(DotfilesError::PathNotFound(path)) if path.ends_with(".zshrc")));

    let result = manager.commit("should be empty", false);
    assert!(matches!(result, Err(DotfilesError::NothingToCommit)));

    Ok(())
}

#[test]
fn track_rejects_paths_outside_worktree() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    let outside = ws.root().join("outside.txt");
    fs::write(&outside, "stray")?;

    let result = manager.track([&outside]);
    assert!(matches!(result, Err(DotfilesError::InvalidArguments(_))));

    let result = manager.track(Vec::<PathBuf>::new());
    assert!(matches!(result, Err(DotfilesError::InvalidArguments(_))));

    Ok(())
}

#[test]
fn track_rejects_storage_inside_worktree() -> Result<()> {
    let ws = Workspace::new()?;
    let storage = ws.worktree().join(".cfg");
    let binding = RepositoryBinding::new(&storage, ws.worktree());
    let manager = DotfilesManager::init(binding, "main", false, GitBin::default())?;

    let result = manager.track([storage.join("HEAD")]);
    assert!(matches!(result, Err(DotfilesError::InvalidArguments(_))));

    Ok(())
}

#[test]
fn track_parent_of_nested_storage_skips_repository() -> Result<()> {
    let ws = Workspace::new()?;
    let storage = ws.worktree().join(".local/share/baredot/dotfiles.git");
    let binding = RepositoryBinding::new(&storage, ws.worktree());
    let manager = DotfilesManager::init(binding, "main", false, GitBin::default())?;
    set_identity(&storage)?;

    let exclude = fs::read_to_string(storage.join("info/exclude"))?;
    assert!(exclude.lines().any(|line| line == "/.local/share/baredot/dotfiles.git/"));

    ws.write(".local/share/app/state", "ready\n")?;
    manager.track([ws.worktree().join(".local")])?;
    manager.commit("add local state", false)?;

    assert_eq!(
        manager.list_tracked_files()?,
        vec![PathBuf::from(".local/share/app/state")]
    );

    // Reinitializing does not repeat the exclusion.
    let binding = RepositoryBinding::new(&storage, ws.worktree());
    DotfilesManager::init(binding, "main", true, GitBin::default())?;
    let exclude = fs::read_to_string(storage.join("info/exclude"))?;
    assert_eq!(
        exclude.lines().filter(|line| line.contains("dotfiles.git")).count(),
        1
    );

    Ok(())
}

#[test]
fn untrack_keeps_file_on_disk() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    let bashrc = ws.write(".bashrc", "set -o vi\n")?;
    let history = ws.write(".bash_history", "ls\n")?;
    manager.track([&bashrc, &history])?;
    manager.commit("add bash files", false)?;

    manager.untrack([&history])?;
    manager.commit("stop tracking history", false)?;

    assert_eq!(manager.list_tracked_files()?, vec![PathBuf::from(".bashrc")]);
    assert_eq!(ws.read(".bash_history")?, "ls\n");

    Ok(())
}

#[test]
fn status_lists_modified_tracked_files() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    manager.configure(true)?;
    let bashrc = ws.write(".bashrc", "set -o vi\n")?;
    ws.write(".untracked", "noise")?;
    manager.track([&bashrc])?;
    manager.commit("add bashrc", false)?;

    ws.write(".bashrc", "set -o emacs\n")?;
    let status = manager.status()?;
    assert!(status.contains(".bashrc"));
    assert!(!status.contains(".untracked"));

    Ok(())
}

#[test]
fn current_branch_of_unborn_repository() -> Result<()> {
    let ws = Workspace::new()?;
    let binding = ws.binding();
    let manager = DotfilesManager::init(binding, "trunk", false, GitBin::default())?;
    assert_eq!(manager.current_branch()?, "trunk");

    Ok(())
}
