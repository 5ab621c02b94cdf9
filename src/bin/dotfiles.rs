// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use baredot::{
    config::Settings,
    manager::{DEFAULT_BACKUP_DIR, DEFAULT_BRANCH},
    path::{default_config_file, default_storage_dir, home_dir},
    version_check, DotfilesError, DotfilesManager, GitBin, RepositoryBinding, MIN_GIT_VERSION,
};

use anyhow::{Context as _, Result};
use clap::{ArgGroup, Parser, Subcommand};
use inquire::Text;
use std::{
    ffi::OsString,
    fs,
    io::IsTerminal,
    path::{absolute, Path, PathBuf},
    process::exit,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  dotfiles [options] <dotfiles-command>\n  dotfiles [options] <git-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to bare storage repository.
    #[arg(long, global = true, env = "DOTFILES_STORAGE", value_name = "path")]
    pub storage: Option<PathBuf>,

    /// Path to work tree alias.
    #[arg(long, global = true, env = "DOTFILES_WORKTREE", value_name = "path")]
    pub worktree: Option<PathBuf>,

    /// Path to settings file.
    #[arg(long, global = true, env = "DOTFILES_CONFIG", value_name = "file")]
    pub config: Option<PathBuf>,

    /// Git executable to invoke.
    #[arg(long, global = true, env = "DOTFILES_GIT", value_name = "program")]
    pub git: Option<String>,

    /// Verify that Git is installed and recent enough, then exit.
    #[arg(long)]
    pub version_check: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    fn run(self) -> Result<()> {
        let settings = load_settings(self.config.as_deref())?;
        let git = GitBin::new(
            self.git
                .clone()
                .or_else(|| settings.repository.git.clone())
                .unwrap_or_else(|| "git".into()),
        );

        let version = version_check(&git)?;
        if self.version_check {
            println!("git {version} (requires {MIN_GIT_VERSION} or newer)");
            return Ok(());
        }

        let Some(command) = self.command.clone() else {
            return Err(DotfilesError::InvalidArguments("no command given, see --help".into()).into());
        };

        let context = Context::resolve(&self, settings, git)?;
        match command {
            Command::Init(opts) => run_init(&context, opts),
            Command::Clone(opts) => run_clone(&context, opts),
            Command::Config(opts) => run_config(&context, opts),
            Command::Track(opts) => run_track(&context, opts),
            Command::Untrack(opts) => run_untrack(&context, opts),
            Command::Commit(opts) => run_commit(&context, opts),
            Command::Apply(opts) => run_apply(&context, opts),
            Command::Sync(opts) => run_sync(&context, opts),
            Command::Status => run_status(&context),
            Command::List => run_list(&context),
            Command::Git(args) => run_git(&context, args),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Initialize new bare storage repository.
    #[command(override_usage = "dotfiles init [options]")]
    Init(InitOptions),

    /// Clone existing dotfiles repository from remote.
    #[command(override_usage = "dotfiles clone <url>")]
    Clone(CloneOptions),

    /// Configure storage repository.
    #[command(override_usage = "dotfiles config (--hide-untracked | --show-untracked)")]
    Config(ConfigOptions),

    /// Stage files in work tree for the next commit.
    #[command(override_usage = "dotfiles track <path>...")]
    Track(PathOptions),

    /// Stop tracking files, keeping them in work tree.
    #[command(override_usage = "dotfiles untrack <path>...")]
    Untrack(PathOptions),

    /// Record staged files as new commit.
    #[command(override_usage = "dotfiles commit [options]")]
    Commit(CommitOptions),

    /// Check out tracked files into work tree, backing up conflicting files.
    #[command(override_usage = "dotfiles apply [options]")]
    Apply(ApplyOptions),

    /// Pull from, then push to remote branch.
    #[command(override_usage = "dotfiles sync [options]")]
    Sync(SyncOptions),

    /// Show status of tracked files.
    Status,

    /// List tracked files.
    List,

    /// Run Git binary directly on storage repository and work tree.
    #[command(external_subcommand)]
    Git(Vec<OsString>),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Reinitialize existing repository in place.
    #[arg(short, long)]
    pub force: bool,

    /// Name of initial branch.
    #[arg(short, long, value_name = "branch")]
    pub branch: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CloneOptions {
    /// URL of remote to clone from.
    #[arg(required = true, value_name = "url")]
    pub url: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
#[command(group(ArgGroup::new("untracked").required(true).args(["hide_untracked", "show_untracked"])))]
struct ConfigOptions {
    /// Hide untracked files from status output.
    #[arg(long)]
    pub hide_untracked: bool,

    /// Show untracked files in status output again.
    #[arg(long)]
    pub show_untracked: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PathOptions {
    /// Paths to files or directories in work tree.
    #[arg(required = true, value_name = "path")]
    pub paths: Vec<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CommitOptions {
    /// Commit message. Prompted for when absent.
    #[arg(short, long, value_name = "message")]
    pub message: Option<String>,

    /// Sign commit.
    #[arg(short = 'S', long)]
    pub sign: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ApplyOptions {
    /// Directory to move conflicting untracked files into.
    #[arg(long, value_name = "path")]
    pub backup_dir: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncOptions {
    /// Name of remote to synchronize with.
    #[arg(short, long, value_name = "name")]
    pub remote: Option<String>,

    /// Remote branch to synchronize with.
    #[arg(short, long, value_name = "branch")]
    pub branch: Option<String>,
}

/// Locations and settings resolved once per invocation.
struct Context {
    storage: PathBuf,
    worktree: PathBuf,
    settings: Settings,
    git: GitBin,
}

impl Context {
    /// Resolve locations: flag or environment first, settings file second,
    /// defaults last.
    fn resolve(cli: &Cli, settings: Settings, git: GitBin) -> Result<Self> {
        let storage = match cli.storage.clone().or_else(|| settings.repository.storage.clone()) {
            Some(path) => path,
            None => default_storage_dir()?,
        };
        let worktree = match cli.worktree.clone().or_else(|| settings.repository.worktree.clone()) {
            Some(path) => path,
            None => home_dir()?,
        };

        Ok(Self {
            storage: absolute(storage)?,
            worktree: absolute(worktree)?,
            settings,
            git,
        })
    }

    fn unchecked_binding(&self) -> RepositoryBinding {
        RepositoryBinding::new(&self.storage, &self.worktree)
    }

    fn manager(&self) -> Result<DotfilesManager> {
        let binding =
            RepositoryBinding::open(&self.storage, &self.worktree).map_err(DotfilesError::from)?;
        Ok(DotfilesManager::new(binding, self.git.clone()))
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(exit_code(&error));
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<DotfilesError>()
        .map_or(1, DotfilesError::exit_code)
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (default_config_file()?, false),
    };

    if !explicit && !path.exists() {
        return Ok(Settings::default());
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings = data
        .parse()
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;

    Ok(settings)
}

fn run_init(context: &Context, opts: InitOptions) -> Result<()> {
    let branch = opts
        .branch
        .or_else(|| context.settings.repository.branch.clone())
        .unwrap_or_else(|| DEFAULT_BRANCH.into());

    let manager = DotfilesManager::init(
        context.unchecked_binding(),
        &branch,
        opts.force,
        context.git.clone(),
    )?;
    info!("bound {}", manager.binding());
    info!("hide untracked files with `dotfiles config --hide-untracked`");

    Ok(())
}

fn run_clone(context: &Context, opts: CloneOptions) -> Result<()> {
    let manager = DotfilesManager::clone_remote(&opts.url, context.unchecked_binding(), context.git.clone())?;
    info!("bound {}", manager.binding());
    info!("check out tracked files with `dotfiles apply`");

    Ok(())
}

fn run_config(context: &Context, opts: ConfigOptions) -> Result<()> {
    context.manager()?.configure(opts.hide_untracked)?;
    Ok(())
}

fn run_track(context: &Context, opts: PathOptions) -> Result<()> {
    for path in context.manager()?.track(opts.paths)? {
        info!("track {}", path.display());
    }

    Ok(())
}

fn run_untrack(context: &Context, opts: PathOptions) -> Result<()> {
    for path in context.manager()?.untrack(opts.paths)? {
        info!("untrack {}", path.display());
    }

    Ok(())
}

fn run_commit(context: &Context, opts: CommitOptions) -> Result<()> {
    let manager = context.manager()?;
    let message = match opts.message {
        Some(message) => message,
        None => Text::new("commit message").prompt().map_err(|error| {
            DotfilesError::InvalidArguments(format!("commit message required ({error})"))
        })?,
    };

    manager.commit(&message, opts.sign || context.settings.commit.sign)?;
    Ok(())
}

fn run_apply(context: &Context, opts: ApplyOptions) -> Result<()> {
    let manager = context.manager()?;
    let backup_dir = match opts
        .backup_dir
        .or_else(|| context.settings.apply.backup_dir.clone())
    {
        Some(path) => absolute(path)?,
        None => context.worktree.join(DEFAULT_BACKUP_DIR),
    };

    let report = manager.apply(&backup_dir)?;
    for path in report.backup.paths() {
        warn!("backed up {} to {}", path.display(), report.backup.root().display());
    }
    info!("applied {} new file(s)", report.updated.len());

    Ok(())
}

fn run_sync(context: &Context, opts: SyncOptions) -> Result<()> {
    let manager = context.manager()?;
    let remote = opts
        .remote
        .unwrap_or_else(|| context.settings.sync.remote.clone());
    let branch = match opts.branch.or_else(|| context.settings.sync.branch.clone()) {
        Some(branch) => branch,
        None => manager.current_branch()?,
    };

    let report = manager.sync(&remote, &branch)?;
    if !report.fast_forwarded && !report.pushed {
        info!("already up to date with {remote}/{branch}");
    }

    Ok(())
}

fn run_status(context: &Context) -> Result<()> {
    print!("{}", context.manager()?.status()?);
    Ok(())
}

fn run_list(context: &Context) -> Result<()> {
    for path in context.manager()?.list_tracked_files()? {
        println!("{}", path.display());
    }

    Ok(())
}

fn run_git(context: &Context, args: Vec<OsString>) -> Result<()> {
    context.manager()?.gitcall_interactive(args)?;
    Ok(())
}
