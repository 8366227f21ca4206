use std::path::Path;

use anyhow::{Context, Result};
use ipkg_installer::{InstallReason, Lifecycle, LifecycleConfig, PackageRoot};

use crate::render::{
    format_activation_lines, format_doctor_lines, format_empty_list_lines, format_info_lines,
    format_install_lines, format_list_line, format_mark_lines, format_remove_lines,
    format_root_lines, print_lines,
};
use crate::{current_output_style, default_root_path, Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let style = current_output_style(cli.plain);
    let mut config = LifecycleConfig::default();
    if let Some(temp_dir) = cli.temp_dir {
        config.temp_dir = temp_dir;
    }
    let lifecycle = Lifecycle::default().with_config(config);

    let root_path = match cli.root {
        Some(path) => path,
        None => default_root_path()?,
    };

    match cli.command {
        Commands::Root { path } => {
            let (root, created) = PackageRoot::open_or_create(&path)
                .with_context(|| format!("failed to set up package root {}", path.display()))?;
            print_lines(&format_root_lines(root.path(), created), style);
        }
        Commands::Install { path, dependency } => {
            let root = open_root(&root_path)?;
            let reason = if dependency {
                InstallReason::Dependency
            } else {
                InstallReason::User
            };
            let outcome = lifecycle
                .install(&root, &path, reason)
                .with_context(|| format!("failed to install {}", path.display()))?;
            print_lines(&format_install_lines(&outcome), style);
        }
        Commands::Remove {
            package,
            no_cascade,
        } => {
            let root = open_root(&root_path)?;
            let outcome = lifecycle
                .remove(&root, &package, !no_cascade)
                .with_context(|| format!("failed to remove {package}"))?;
            print_lines(&format_remove_lines(&outcome), style);
        }
        Commands::Activate { package } => {
            let root = open_root(&root_path)?;
            let outcome = lifecycle
                .activate(&root, &package)
                .with_context(|| format!("failed to activate {package}"))?;
            print_lines(&format_activation_lines(&outcome, "activated"), style);
        }
        Commands::Deactivate { package } => {
            let root = open_root(&root_path)?;
            let outcome = lifecycle
                .deactivate(&root, &package)
                .with_context(|| format!("failed to deactivate {package}"))?;
            print_lines(&format_activation_lines(&outcome, "deactivated"), style);
        }
        Commands::List {
            sort,
            reverse,
            user_only,
        } => {
            let root = open_root(&root_path)?;
            let mut records = root.list()?;
            if user_only {
                records.retain(|record| record.installed_by_user);
            }
            if records.is_empty() {
                print_lines(&format_empty_list_lines(), style);
            }
            sort.sort(&mut records, reverse);
            for record in &records {
                let active = lifecycle.is_active(&root, &record.package)?;
                println!("{}", format_list_line(record, active));
            }
        }
        Commands::Info { package } => {
            let root = open_root(&root_path)?;
            let record = root.find(&package)?;
            let active = lifecycle.is_active(&root, &package)?;
            let install_dir = root.layout().package_dir(&package);
            for line in format_info_lines(&record, active, &install_dir) {
                println!("{line}");
            }
        }
        Commands::Mark {
            package,
            user,
            dependency: _,
        } => {
            let root = open_root(&root_path)?;
            let reason = if user {
                InstallReason::User
            } else {
                InstallReason::Dependency
            };
            lifecycle.set_install_reason(&root, &package, reason)?;
            print_lines(&format_mark_lines(&package, reason), style);
        }
        Commands::Doctor { reclaim } => {
            let root = open_root(&root_path)?;
            let orphans = if reclaim {
                root.reclaim_orphans()?
            } else {
                root.find_orphans()?
            };
            print_lines(&format_doctor_lines(root.path(), &orphans, reclaim), style);
        }
    }

    Ok(())
}

fn open_root(path: &Path) -> Result<PackageRoot> {
    let (root, _) = PackageRoot::open_or_create(path)
        .with_context(|| format!("failed to open package root {}", path.display()))?;
    Ok(root)
}
