use ipkg_core::{Dependencies, PackageId};
use tracing::{debug, info, warn};

use crate::activation::release_links;
use crate::error::{Error, IoContext, Result};
use crate::fs_utils::remove_dir_all_if_exists;
use crate::lifecycle::Lifecycle;
use crate::registry::PackageRoot;
use crate::scripts::{ScriptInvocation, ScriptMode};
use crate::types::RemoveOutcome;

impl Lifecycle {
    /// Removes an installed package. With `cascade`, dependencies that were
    /// installed only as dependencies and that nothing else requires anymore
    /// are removed too, recursively.
    pub fn remove(
        &self,
        root: &PackageRoot,
        package: &PackageId,
        cascade: bool,
    ) -> Result<RemoveOutcome> {
        let mut removed_dependencies = Vec::new();
        self.remove_package(root, package, cascade, &mut removed_dependencies)?;
        info!(
            package = %package,
            cascaded = removed_dependencies.len(),
            "removed package"
        );
        Ok(RemoveOutcome {
            package: package.clone(),
            removed_dependencies,
        })
    }

    fn remove_package(
        &self,
        root: &PackageRoot,
        package: &PackageId,
        cascade: bool,
        removed: &mut Vec<PackageId>,
    ) -> Result<()> {
        let record = root.find(package)?;
        if !record.can_be_removed() {
            return Err(Error::StillRequired {
                package: package.clone(),
                used_by: record.used_by,
            });
        }

        let mut released = Vec::new();
        for dependency in record.required_dependencies() {
            if root.contains(dependency)? {
                let used_by = root.decrement_used_by(dependency)?;
                debug!(package = %dependency, used_by, "dependency usage decreased");
                released.push(dependency.clone());
            }
        }

        let result = self
            .remove_dependencies(root, &record.dependencies, cascade, removed)
            .and_then(|()| {
                let report = release_links(root.layout(), package, self.config().replay_policy);
                if !report.failures.is_empty() {
                    warn!(
                        package = %package,
                        failed = report.failures.len(),
                        "some activation links could not be removed"
                    );
                }
                root.delete(package)
            });
        if let Err(err) = result {
            restore_usage(root, &released);
            return Err(err);
        }

        self.run_removal_script(root, package);

        let install_dir = root.layout().package_dir(package);
        remove_dir_all_if_exists(&install_dir)
            .io_context(|| format!("failed to remove {}", install_dir.display()))?;
        debug!(package = %package, dir = %install_dir.display(), "removed install dir");
        Ok(())
    }

    fn remove_dependencies(
        &self,
        root: &PackageRoot,
        dependencies: &Dependencies,
        cascade: bool,
        removed: &mut Vec<PackageId>,
    ) -> Result<()> {
        if !cascade {
            return Ok(());
        }

        for (dependency, _) in dependencies {
            let Some(record) = root.lookup(dependency)? else {
                debug!(package = %dependency, "dependency not installed, skipping");
                continue;
            };
            if !record.is_dependency_only() {
                debug!(package = %dependency, "dependency installed by user, keeping");
                continue;
            }
            if !record.can_be_removed() {
                debug!(
                    package = %dependency,
                    used_by = record.used_by,
                    "dependency still required, keeping"
                );
                continue;
            }

            self.remove_package(root, dependency, true, removed)?;
            removed.push(dependency.clone());
        }
        Ok(())
    }

    fn run_removal_script(&self, root: &PackageRoot, package: &PackageId) {
        let layout = root.layout();
        let script = layout.installed_script_path(package);
        if !script.is_file() {
            debug!(package = %package, "no removal script");
            return;
        }

        let install_dir = layout.package_dir(package);
        let activation_log = layout.activation_log_path(package);
        let invocation = ScriptInvocation {
            script: &script,
            work_dir: None,
            install_dir: &install_dir,
            activation_log: &activation_log,
            mode: ScriptMode::Remove,
        };
        if let Err(err) = self.interpreter().run(&invocation) {
            warn!(package = %package, error = %format!("{err:#}"), "removal script failed");
        }
    }
}

fn restore_usage(root: &PackageRoot, released: &[PackageId]) {
    for dependency in released {
        match root.lookup(dependency) {
            Ok(Some(_)) => {
                if let Err(err) = root.increment_used_by(dependency) {
                    warn!(package = %dependency, error = %err, "failed to restore usage count");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(package = %dependency, error = %err, "failed to restore usage count"),
        }
    }
}
