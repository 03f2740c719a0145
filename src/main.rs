//! drift - headless front end for the driftfile engine.
//!
//! Usage:
//!   drift ls [PATH]            List a directory (remote caches are pulled first)
//!   drift cp SRC... DEST       Copy into a directory
//!   drift mv SRC... DEST       Move into a directory
//!   drift rm PATH...           Delete (through the trash unless --force)
//!   drift remotes              Show configured remotes
//!   drift --help               Show help

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use driftfile_core::{EngineConfig, SortKey};
use driftfile_ops::MountTable;
use driftfile_view::{DisplayLine, Engine, EngineError, NoticeLevel, ViewId};

#[derive(Parser)]
#[command(
    name = "drift",
    version,
    about = "Asynchronous file operations with rclone-backed remotes",
    long_about = "drift runs copies, moves and deletes as background jobs, the way an \
                  editor file manager does, and mirrors remotes through a local cache."
)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Include dot-files
        #[arg(short, long)]
        all: bool,

        /// Sort key: name, size, modified, extension, accessed or changed
        #[arg(short, long)]
        sort: Option<SortKey>,

        /// Reverse the sort direction
        #[arg(short, long)]
        reverse: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Copy files or directories into a directory
    Cp {
        #[arg(required = true, num_args = 1..)]
        sources: Vec<PathBuf>,
        dest: PathBuf,
    },

    /// Move files or directories into a directory
    Mv {
        #[arg(required = true, num_args = 1..)]
        sources: Vec<PathBuf>,
        dest: PathBuf,
    },

    /// Delete files or directories
    Rm {
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,

        /// Delete permanently instead of using the trash
        #[arg(short, long)]
        force: bool,
    },

    /// Show configured remotes and their cache directories
    Remotes,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_default().context("Could not load configuration")?,
    };
    tracing::debug!(remotes = config.remotes.len(), sync = %config.sync_program, "configuration");

    match cli.command {
        Command::Ls {
            path,
            all,
            sort,
            reverse,
            json,
        } => {
            config.show_hidden |= all;
            config.sort_reverse ^= reverse;
            if let Some(key) = sort {
                config.sort_key = key;
            }
            run_ls(config, &path, json).await
        }
        Command::Cp { sources, dest } => run_transfer(config, &sources, &dest, false).await,
        Command::Mv { sources, dest } => run_transfer(config, &sources, &dest, true).await,
        Command::Rm { paths, force } => run_rm(config, &paths, force).await,
        Command::Remotes => {
            run_remotes(&config);
            Ok(())
        }
    }
}

/// List one directory after pulling its remote listing, if any.
async fn run_ls(config: EngineConfig, path: &Path, json: bool) -> Result<()> {
    let mut engine = Engine::new(config);
    let view = engine.open_view(path).context("Invalid path")?;
    engine.wait(view).await?;
    report_notices(&mut engine);

    let lines = engine.render(view)?;
    let modified = |line: &DisplayLine| -> Option<DateTime<Local>> {
        let tree = engine.view(view)?.tree();
        let stat = tree.find_path(&line.path)?.entry.stat?;
        stat.modified.map(DateTime::<Local>::from)
    };

    if json {
        let entries: Vec<_> = lines
            .iter()
            .map(|line| {
                serde_json::json!({
                    "name": line.name,
                    "path": line.path,
                    "dir": line.kind.is_expandable(),
                    "size": line.size,
                    "modified": modified(line).map(|t| t.to_rfc3339()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for line in &lines {
        let size = line.size.map(format_size).unwrap_or_default();
        let time = modified(line)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{:>10}  {:<16}  {}", size, time, line.to_string().trim_start());
    }
    Ok(())
}

async fn run_transfer(
    config: EngineConfig,
    sources: &[PathBuf],
    dest: &Path,
    is_move: bool,
) -> Result<()> {
    let mut engine = Engine::new(config);
    let view = open_cwd(&mut engine)?;

    for source in sources {
        let started = if is_move {
            engine.mv(view, source, dest)
        } else {
            engine.cp(view, source, dest)
        };
        started.with_context(|| format!("Could not start transfer of {}", source.display()))?;
    }
    finish(&mut engine, view).await
}

async fn run_rm(config: EngineConfig, paths: &[PathBuf], force: bool) -> Result<()> {
    let mut engine = Engine::new(config);
    let view = open_cwd(&mut engine)?;

    for path in paths {
        engine
            .remove(view, path, force)
            .with_context(|| format!("Could not delete {}", path.display()))?;
    }
    finish(&mut engine, view).await
}

fn run_remotes(config: &EngineConfig) {
    let mounts = MountTable::from_config(config);
    if mounts.mounts().is_empty() {
        println!("No remotes configured.");
        return;
    }
    for mount in mounts.mounts() {
        println!(
            "{:<12} {:<24} {}",
            mount.name,
            mount.remote_root,
            mount.cache_dir.display()
        );
    }
}

fn open_cwd(engine: &mut Engine) -> Result<ViewId> {
    let cwd = std::env::current_dir().context("No working directory")?;
    Ok(engine.open_view(cwd)?)
}

/// Wait for the view to go quiet and fail if any leg failed.
async fn finish(engine: &mut Engine, view: ViewId) -> Result<()> {
    match engine.wait(view).await {
        Ok(()) => {}
        Err(EngineError::Ops(e)) => bail!("Operations still running: {e}"),
        Err(e) => return Err(e.into()),
    }
    if report_notices(engine) {
        bail!("Some operations failed");
    }
    Ok(())
}

/// Print queued notices to stderr. Returns true if any was an error.
fn report_notices(engine: &mut Engine) -> bool {
    let mut failed = false;
    for notice in engine.take_notices() {
        failed |= notice.level == NoticeLevel::Error;
        eprintln!("{notice}");
    }
    failed
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
