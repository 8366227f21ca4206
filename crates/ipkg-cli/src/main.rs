use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use ipkg_core::{PackageId, SortMethod};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod dispatch;
mod render;

use crate::dispatch::run_cli;
use crate::render::OutputStyle;

#[derive(Parser, Debug)]
#[command(name = "ipkg")]
#[command(about = "Install and manage ira packages", long_about = None)]
struct Cli {
    /// Package root to operate on.
    #[arg(long, global = true, env = "IPKG_ROOT")]
    root: Option<PathBuf>,
    /// Scratch directory for unpacking .ipkg archives.
    #[arg(long, global = true, env = "IPKG_TEMP_DIR")]
    temp_dir: Option<PathBuf>,
    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a package root, or open it when it already exists.
    Root { path: PathBuf },
    /// Install a package directory or .ipkg archive.
    Install {
        path: PathBuf,
        /// Record the package as installed only to satisfy a dependency.
        #[arg(long)]
        dependency: bool,
    },
    Remove {
        package: PackageId,
        /// Keep dependencies that are no longer needed.
        #[arg(long)]
        no_cascade: bool,
    },
    Activate { package: PackageId },
    Deactivate { package: PackageId },
    List {
        #[arg(long, default_value = "name", value_parser = parse_sort_method)]
        sort: SortMethod,
        #[arg(long)]
        reverse: bool,
        #[arg(long)]
        user_only: bool,
    },
    Info { package: PackageId },
    /// Change why a package is recorded as installed.
    Mark {
        package: PackageId,
        #[arg(long, conflicts_with = "dependency", required_unless_present = "dependency")]
        user: bool,
        #[arg(long)]
        dependency: bool,
    },
    /// Report install dirs without a registry entry.
    Doctor {
        #[arg(long)]
        reclaim: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_sort_method(value: &str) -> std::result::Result<SortMethod, String> {
    SortMethod::parse(value)
        .ok_or_else(|| format!("unknown sort method '{value}', expected 'name' or 'version'"))
}

pub(crate) fn default_root_path() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows package root")?;
        return Ok(PathBuf::from(app_data).join("Ira"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve package root")?;
    Ok(PathBuf::from(home).join(".ira"))
}

fn current_output_style(plain: bool) -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    render::resolve_output_style(plain || no_color, std::io::stdout().is_terminal())
}

#[cfg(test)]
mod tests;
