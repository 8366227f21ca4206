use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ipkg_core::{
    build_script_path, manifest_path, script_path, BundleKind, PackageId, PackageManifest,
    Platform,
};
use tracing::{debug, info, warn};

use crate::activation::{activate_package, deactivate_package, is_active, ReplayPolicy};
use crate::error::{Error, IoContext, Result};
use crate::extract::{extract_archive, prepare_bundle, remove_scratch};
use crate::fs_utils::{copy_file, remove_file_if_exists};
use crate::layout::default_temp_dir;
use crate::registry::{DependencyCheck, PackageRoot};
use crate::scripts::{
    BuildRunner, ProcessBuildRunner, ProcessInterpreter, ScriptInterpreter, ScriptInvocation,
    ScriptMode,
};
use crate::types::{ActivationOutcome, InstallOutcome, InstallReason, SiblingFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Scratch space for unpacking `.ipkg` archives.
    pub temp_dir: PathBuf,
    pub replay_policy: ReplayPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            replay_policy: ReplayPolicy::default(),
        }
    }
}

/// Installs, activates, deactivates and removes packages in a
/// [`PackageRoot`].
pub struct Lifecycle {
    interpreter: Box<dyn ScriptInterpreter>,
    builder: Box<dyn BuildRunner>,
    platform: Platform,
    config: LifecycleConfig,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("platform", &self.platform)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(ProcessInterpreter, ProcessBuildRunner)
    }
}

impl Lifecycle {
    pub fn new(
        interpreter: impl ScriptInterpreter + 'static,
        builder: impl BuildRunner + 'static,
    ) -> Self {
        Self {
            interpreter: Box::new(interpreter),
            builder: Box::new(builder),
            platform: Platform::current(),
            config: LifecycleConfig::default(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub(crate) fn interpreter(&self) -> &dyn ScriptInterpreter {
        self.interpreter.as_ref()
    }

    /// Installs the package at `input`, either an unpacked package directory
    /// or an `.ipkg` archive.
    ///
    /// Nothing is written to the root until the manifest, platform, script
    /// and dependency checks pass. A failure after the install dir is created
    /// leaves that dir behind without a registry row.
    pub fn install(
        &self,
        root: &PackageRoot,
        input: &Path,
        reason: InstallReason,
    ) -> Result<InstallOutcome> {
        match classify_input(input)? {
            BundleKind::Directory => self.install_from_work_dir(root, input, reason),
            BundleKind::Archive => {
                let archive_path = prepare_bundle(input, &self.config.temp_dir)?;
                let result = extract_archive(&archive_path)
                    .and_then(|work_dir| self.install_from_work_dir(root, &work_dir, reason));
                remove_scratch(&archive_path);
                result
            }
        }
    }

    fn install_from_work_dir(
        &self,
        root: &PackageRoot,
        work_dir: &Path,
        reason: InstallReason,
    ) -> Result<InstallOutcome> {
        let work_dir = fs::canonicalize(work_dir)
            .io_context(|| format!("failed to resolve {}", work_dir.display()))?;
        let manifest = PackageManifest::read_from_bundle(&work_dir)?;
        let package = manifest.id.clone();
        debug!(package = %package, work_dir = %work_dir.display(), "read package manifest");

        if !manifest.supports(&self.platform) {
            return Err(Error::UnsupportedPlatform {
                package,
                platform: self.platform.to_string(),
            });
        }
        let script = script_path(&work_dir);
        if !script.is_file() {
            return Err(Error::NoScript(package));
        }
        if root.contains(&package)? {
            return Err(Error::AlreadyInstalled(package));
        }
        if let DependencyCheck::Unsatisfied { missing } = root.check_dependencies(&manifest)? {
            return Err(Error::DependenciesNotSatisfied { package, missing });
        }

        if manifest.build {
            self.run_build(&manifest, &work_dir)?;
        }

        let layout = root.layout();
        let install_dir = layout.package_dir(&package);
        match fs::create_dir(&install_dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                warn!(package = %package, dir = %install_dir.display(), "reusing leftover install dir");
            }
            Err(err) => {
                return Err(err)
                    .io_context(|| format!("failed to create {}", install_dir.display()));
            }
        }
        let metadata_dir = layout.package_metadata_dir(&package);
        fs::create_dir_all(&metadata_dir)
            .io_context(|| format!("failed to create {}", metadata_dir.display()))?;
        let marker = layout.deactivated_marker_path(&package);
        remove_file_if_exists(&marker)
            .io_context(|| format!("failed to remove {}", marker.display()))?;

        let activation_log = layout.activation_log_path(&package);
        let invocation = ScriptInvocation {
            script: &script,
            work_dir: Some(&work_dir),
            install_dir: &install_dir,
            activation_log: &activation_log,
            mode: ScriptMode::Install,
        };
        self.interpreter
            .run(&invocation)
            .map_err(|err| Error::ScriptFailed {
                package: package.clone(),
                mode: ScriptMode::Install,
                reason: format!("{err:#}"),
            })?;

        copy_file(&script, &layout.installed_script_path(&package))?;
        copy_file(
            &manifest_path(&work_dir),
            &layout.installed_manifest_path(&package),
        )?;

        root.insert(&package, &manifest.dependencies, reason)?;
        for dependency in manifest.required_dependencies() {
            let used_by = root.increment_used_by(dependency)?;
            debug!(package = %dependency, used_by, "dependency usage increased");
        }

        // The package is registered now, so sibling trouble is reported, not returned.
        let (deactivated_siblings, sibling_failures) = match self.sweep_siblings(root, &package) {
            Ok(sweep) => sweep,
            Err(err) => {
                warn!(package = %package, error = %err, "failed to list sibling versions");
                (Vec::new(), Vec::new())
            }
        };
        let sibling_failures = sibling_failures
            .into_iter()
            .map(|(sibling, err)| {
                warn!(
                    package = %package,
                    sibling = %sibling,
                    error = %err,
                    "failed to deactivate sibling"
                );
                SiblingFailure {
                    package: sibling,
                    reason: err.to_string(),
                }
            })
            .collect();
        info!(package = %package, reason = reason.as_str(), "installed package");
        Ok(InstallOutcome {
            package,
            install_dir,
            reason,
            deactivated_siblings,
            sibling_failures,
        })
    }

    fn run_build(&self, manifest: &PackageManifest, work_dir: &Path) -> Result<()> {
        let Some(script) = build_script_path(work_dir, &self.platform) else {
            return Err(Error::UnsupportedPlatform {
                package: manifest.id.clone(),
                platform: self.platform.to_string(),
            });
        };
        let output = self
            .builder
            .build(&script, work_dir)
            .map_err(|err| Error::BuildFailed {
                package: manifest.id.clone(),
                reason: format!("{err:#}"),
            })?;
        info!(package = %manifest.id, output = %output.trim(), "build finished");
        Ok(())
    }

    /// Makes `package` the active version of its name, deactivating every
    /// other installed version.
    pub fn activate(&self, root: &PackageRoot, package: &PackageId) -> Result<ActivationOutcome> {
        root.find(package)?;
        let mut outcome = activate_package(root.layout(), package, self.config.replay_policy)?;
        outcome.deactivated_siblings = self.deactivate_siblings(root, package)?;
        Ok(outcome)
    }

    pub fn deactivate(&self, root: &PackageRoot, package: &PackageId) -> Result<ActivationOutcome> {
        root.find(package)?;
        deactivate_package(root.layout(), package, self.config.replay_policy)
    }

    pub fn is_active(&self, root: &PackageRoot, package: &PackageId) -> Result<bool> {
        root.find(package)?;
        Ok(is_active(root.layout(), package))
    }

    pub fn set_install_reason(
        &self,
        root: &PackageRoot,
        package: &PackageId,
        reason: InstallReason,
    ) -> Result<()> {
        root.set_installed_by_user(package, reason.installed_by_user())?;
        info!(package = %package, reason = reason.as_str(), "updated install reason");
        Ok(())
    }

    fn deactivate_siblings(&self, root: &PackageRoot, package: &PackageId) -> Result<Vec<PackageId>> {
        let (deactivated, failures) = self.sweep_siblings(root, package)?;
        match failures.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(deactivated),
        }
    }

    /// Deactivates every other installed version of `package`'s name, trying
    /// each one even when an earlier one fails.
    fn sweep_siblings(
        &self,
        root: &PackageRoot,
        package: &PackageId,
    ) -> Result<(Vec<PackageId>, Vec<(PackageId, Error)>)> {
        let mut deactivated = Vec::new();
        let mut failures = Vec::new();
        for sibling in root.find_all_by_name(package.name())? {
            if sibling.package == *package {
                continue;
            }
            match deactivate_package(root.layout(), &sibling.package, self.config.replay_policy) {
                Ok(outcome) if outcome.changed => deactivated.push(sibling.package),
                Ok(_) => {}
                Err(err) => failures.push((sibling.package, err)),
            }
        }
        Ok((deactivated, failures))
    }
}

fn classify_input(input: &Path) -> Result<BundleKind> {
    let metadata = match fs::metadata(input) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(Error::MissingInput(input.to_path_buf()));
        }
        Err(err) => {
            return Err(err).io_context(|| format!("failed to inspect {}", input.display()));
        }
    };
    BundleKind::infer(input, metadata.is_dir()).ok_or_else(|| Error::NotAPackage(input.to_path_buf()))
}
