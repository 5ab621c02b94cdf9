// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{RepoFixture, Workspace};

use anyhow::Result;
use baredot::{DotfilesError, DotfilesManager};
use pretty_assertions::assert_eq;
use std::{fs, path::PathBuf};

fn remote_with_dotfiles(ws: &Workspace) -> Result<RepoFixture> {
    let remote = ws.remote()?;
    remote.stage_and_commit(".bashrc", "tracked bashrc\n")?;
    remote.stage_and_commit(".config/nvim/init.lua", "tracked init\n")?;
    Ok(remote)
}

#[test]
fn apply_on_clean_worktree_needs_no_backup() -> Result<()> {
    let ws = Workspace::new()?;
    let remote = remote_with_dotfiles(&ws)?;
    let manager = ws.clone_from(&remote)?;

    let report = manager.apply(ws.backup_dir())?;
    assert!(report.backup.is_empty());
    assert_eq!(
        report.updated,
        vec![PathBuf::from(".bashrc"), PathBuf::from(".config/nvim/init.lua")]
    );
    assert_eq!(ws.read(".bashrc")?, "tracked bashrc\n");
    assert_eq!(ws.read(".config/nvim/init.lua")?, "tracked init\n");
    assert!(!ws.backup_dir().exists());

    // Applying again has nothing new to write.
    let report = manager.apply(ws.backup_dir())?;
    assert!(report.backup.is_empty());
    assert!(report.updated.is_empty());

    Ok(())
}

#[test]
fn apply_moves_exactly_the_conflicting_files() -> Result<()> {
    let ws = Workspace::new()?;
    let remote = remote_with_dotfiles(&ws)?;
    let manager = ws.clone_from(&remote)?;
    ws.write(".bashrc", "local bashrc\n")?;
    ws.write(".config/nvim/init.lua", b"local \x00 init")?;
    ws.write(".profile", "unrelated\n")?;

    let report = manager.apply(ws.backup_dir())?;
    assert_eq!(
        report.backup.paths(),
        &[PathBuf::from(".bashrc"), PathBuf::from(".config/nvim/init.lua")]
    );
    assert_eq!(report.backup.root(), ws.backup_dir().as_path());

    let backup = ws.backup_dir();
    assert_eq!(fs::read(backup.join(".bashrc"))?, b"local bashrc\n");
    assert_eq!(fs::read(backup.join(".config/nvim/init.lua"))?, b"local \x00 init");
    assert!(!backup.join(".profile").exists());

    assert_eq!(ws.read(".bashrc")?, "tracked bashrc\n");
    assert_eq!(ws.read(".config/nvim/init.lua")?, "tracked init\n");
    assert_eq!(ws.read(".profile")?, "unrelated\n");

    Ok(())
}

#[test]
fn apply_moves_file_blocking_tracked_directory() -> Result<()> {
    let ws = Workspace::new()?;
    let remote = remote_with_dotfiles(&ws)?;
    let manager = ws.clone_from(&remote)?;
    ws.write(".bashrc", "local bashrc\n")?;
    ws.write(".config", "plain file in the way\n")?;

    let report = manager.apply(ws.backup_dir())?;
    assert_eq!(
        report.backup.paths(),
        &[PathBuf::from(".bashrc"), PathBuf::from(".config")]
    );

    let backup = ws.backup_dir();
    assert_eq!(fs::read_to_string(backup.join(".bashrc"))?, "local bashrc\n");
    assert_eq!(fs::read_to_string(backup.join(".config"))?, "plain file in the way\n");
    assert!(ws.worktree().join(".config").is_dir());
    assert_eq!(ws.read(".config/nvim/init.lua")?, "tracked init\n");
    assert_eq!(ws.read(".bashrc")?, "tracked bashrc\n");

    Ok(())
}

#[test]
fn apply_refuses_to_overwrite_earlier_backup() -> Result<()> {
    let ws = Workspace::new()?;
    let remote = remote_with_dotfiles(&ws)?;
    let manager = ws.clone_from(&remote)?;
    ws.write(".bashrc", "local bashrc\n")?;
    ws.write(".dotfiles-backup/.bashrc", "first backup\n")?;

    let result = manager.apply(ws.backup_dir());
    assert!(matches!(result, Err(DotfilesError::Backup(_))));
    assert_eq!(ws.read(".bashrc")?, "local bashrc\n");
    assert_eq!(ws.read(".dotfiles-backup/.bashrc")?, "first backup\n");

    Ok(())
}

#[test]
fn apply_on_empty_repository_does_nothing() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.init()?;
    ws.write(".bashrc", "local bashrc\n")?;

    let report = manager.apply(ws.backup_dir())?;
    assert!(report.updated.is_empty());
    assert!(report.backup.is_empty());
    assert_eq!(ws.read(".bashrc")?, "local bashrc\n");

    Ok(())
}

#[cfg(unix)]
#[test]
fn apply_retries_checkout_only_once() -> Result<()> {
    use baredot::{GitBin, RepositoryBinding};
    use std::os::unix::fs::PermissionsExt;

    let ws = Workspace::new()?;
    let remote = remote_with_dotfiles(&ws)?;
    ws.clone_from(&remote)?;
    ws.write(".bashrc", "local bashrc\n")?;

    // Git stand-in that keeps refusing every checkout.
    let log = ws.root().join("checkout.log");
    let script = ws.root().join("stubborn-git");
    fs::write(
        &script,
        format!(
            concat!(
                "#!/bin/sh\n",
                "for arg in \"$@\"; do\n",
                "  if [ \"$arg\" = checkout ]; then\n",
                "    echo checkout >> '{log}'\n",
                "    echo 'error: The following untracked working tree files would be overwritten by checkout:' >&2\n",
                "    printf '\\t.bashrc\\n' >&2\n",
                "    echo 'Please move or remove them before you switch branches.' >&2\n",
                "    echo 'Aborting' >&2\n",
                "    exit 1\n",
                "  fi\n",
                "done\n",
                "exec git \"$@\"\n",
            ),
            log = log.display()
        ),
    )?;
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;

    let binding = RepositoryBinding::open(ws.storage(), ws.worktree())?;
    let manager = DotfilesManager::new(binding, GitBin::new(&script));

    let result = manager.apply(ws.backup_dir());
    match result {
        Err(DotfilesError::CheckoutFailed { conflicts }) => {
            assert_eq!(conflicts, vec![PathBuf::from(".bashrc")]);
        }
        other => panic!("expected checkout failure, got {other:?}"),
    }

    assert_eq!(fs::read_to_string(&log)?.lines().count(), 2);
    assert_eq!(fs::read_to_string(ws.backup_dir().join(".bashrc"))?, "local bashrc\n");

    Ok(())
}
