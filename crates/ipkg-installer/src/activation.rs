use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ipkg_core::PackageId;
use tracing::{debug, info, warn};

use crate::error::{Error, IoContext, Result};
use crate::fs_utils::remove_file_if_exists;
use crate::layout::RootLayout;
use crate::types::ActivationOutcome;

/// One line of `.ira/activate.log`: a link the install script asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationLogEntry {
    pub link_target: PathBuf,
    pub link_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivationLog {
    pub entries: Vec<ActivationLogEntry>,
    /// Lines that could not be parsed, with their 1-based line number.
    pub malformed: Vec<(usize, String)>,
}

/// How a replay of the activation log reacts to a link it cannot apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Record the failure and keep going.
    #[default]
    ContinueOnFailure,
    /// Stop at the first failure.
    StopOnFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFailure {
    pub entry: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplayReport {
    pub applied: usize,
    /// Links left alone because another installation owns them or they are already gone.
    pub skipped: usize,
    pub failures: Vec<LinkFailure>,
}

impl ReplayReport {
    pub fn attempted(&self) -> usize {
        self.applied + self.skipped + self.failures.len()
    }

    /// No entry could be applied even though some were attempted.
    pub fn is_total_failure(&self) -> bool {
        self.applied == 0 && self.skipped == 0 && !self.failures.is_empty()
    }

    fn record_failure(&mut self, entry: String, reason: String) {
        warn!(entry = %entry, reason = %reason, "activation entry failed");
        self.failures.push(LinkFailure { entry, reason });
    }
}

/// Parses the activation log. Fields are separated by a tab; a single space
/// is accepted when no tab is present. Blank lines are ignored.
pub fn parse_activation_log(raw: &str) -> ActivationLog {
    let mut log = ActivationLog::default();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let fields = line.split_once('\t').or_else(|| line.split_once(' '));
        match fields {
            Some((target, link)) if !target.is_empty() && !link.is_empty() => {
                log.entries.push(ActivationLogEntry {
                    link_target: PathBuf::from(target),
                    link_path: PathBuf::from(link),
                });
            }
            _ => log.malformed.push((index + 1, line.to_string())),
        }
    }
    log
}

/// Reads the activation log at `path`. A missing log is an empty log.
pub fn read_activation_log(path: &Path) -> Result<ActivationLog> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(parse_activation_log(&raw)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(ActivationLog::default()),
        Err(err) => Err(err).io_context(|| format!("failed to read {}", path.display())),
    }
}

pub fn write_activation_log(path: &Path, entries: &[ActivationLogEntry]) -> Result<()> {
    let mut raw = String::new();
    for entry in entries {
        raw.push_str(&format!(
            "{}\t{}\n",
            entry.link_target.display(),
            entry.link_path.display()
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .io_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, raw).io_context(|| format!("failed to write {}", path.display()))
}

pub fn is_active(layout: &RootLayout, package: &PackageId) -> bool {
    !layout.deactivated_marker_path(package).exists()
}

pub(crate) fn activate_package(
    layout: &RootLayout,
    package: &PackageId,
    policy: ReplayPolicy,
) -> Result<ActivationOutcome> {
    let marker = layout.deactivated_marker_path(package);
    if !marker.exists() {
        debug!(package = %package, "already active");
        return Ok(unchanged(package));
    }

    let log = read_activation_log(&layout.activation_log_path(package))?;
    let report = replay(&log, policy, create_link);
    if report.is_total_failure() {
        return Err(Error::ActivationFailed {
            package: package.clone(),
            action: "activate",
            attempted: report.attempted(),
        });
    }

    remove_file_if_exists(&marker)
        .io_context(|| format!("failed to remove {}", marker.display()))?;
    info!(
        package = %package,
        applied = report.applied,
        failed = report.failures.len(),
        "activated package"
    );
    Ok(changed(package, report))
}

pub(crate) fn deactivate_package(
    layout: &RootLayout,
    package: &PackageId,
    policy: ReplayPolicy,
) -> Result<ActivationOutcome> {
    let marker = layout.deactivated_marker_path(package);
    if marker.exists() {
        debug!(package = %package, "already inactive");
        return Ok(unchanged(package));
    }

    let log = read_activation_log(&layout.activation_log_path(package))?;
    let report = replay(&log, policy, remove_link);
    if report.is_total_failure() {
        return Err(Error::ActivationFailed {
            package: package.clone(),
            action: "deactivate",
            attempted: report.attempted(),
        });
    }

    if let Some(parent) = marker.parent() {
        fs::create_dir_all(parent)
            .io_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&marker, b"").io_context(|| format!("failed to write {}", marker.display()))?;
    info!(
        package = %package,
        removed = report.applied,
        skipped = report.skipped,
        failed = report.failures.len(),
        "deactivated package"
    );
    Ok(changed(package, report))
}

/// Removes the links of a package that is going away. Link failures are
/// logged and reported but never fail the teardown.
pub(crate) fn release_links(
    layout: &RootLayout,
    package: &PackageId,
    policy: ReplayPolicy,
) -> ReplayReport {
    if !is_active(layout, package) {
        return ReplayReport::default();
    }

    let log = match read_activation_log(&layout.activation_log_path(package)) {
        Ok(log) => log,
        Err(err) => {
            warn!(package = %package, error = %err, "failed to read activation log");
            return ReplayReport::default();
        }
    };
    let report = replay(&log, policy, remove_link);
    debug!(
        package = %package,
        removed = report.applied,
        skipped = report.skipped,
        failed = report.failures.len(),
        "released activation links"
    );
    report
}

fn unchanged(package: &PackageId) -> ActivationOutcome {
    ActivationOutcome {
        package: package.clone(),
        changed: false,
        report: ReplayReport::default(),
        deactivated_siblings: Vec::new(),
    }
}

fn changed(package: &PackageId, report: ReplayReport) -> ActivationOutcome {
    ActivationOutcome {
        package: package.clone(),
        changed: true,
        report,
        deactivated_siblings: Vec::new(),
    }
}

enum LinkStep {
    Applied,
    Skipped,
}

fn replay<F>(log: &ActivationLog, policy: ReplayPolicy, mut step: F) -> ReplayReport
where
    F: FnMut(&ActivationLogEntry) -> std::result::Result<LinkStep, String>,
{
    let mut report = ReplayReport::default();
    for (line, content) in &log.malformed {
        report.record_failure(content.clone(), format!("malformed activation log line {line}"));
        if policy == ReplayPolicy::StopOnFailure {
            return report;
        }
    }

    for entry in &log.entries {
        match step(entry) {
            Ok(LinkStep::Applied) => report.applied += 1,
            Ok(LinkStep::Skipped) => report.skipped += 1,
            Err(reason) => {
                report.record_failure(describe(entry), reason);
                if policy == ReplayPolicy::StopOnFailure {
                    break;
                }
            }
        }
    }
    report
}

fn describe(entry: &ActivationLogEntry) -> String {
    format!(
        "{} -> {}",
        entry.link_path.display(),
        entry.link_target.display()
    )
}

fn create_link(entry: &ActivationLogEntry) -> std::result::Result<LinkStep, String> {
    let link_path = &entry.link_path;
    match fs::symlink_metadata(link_path) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            fs::remove_file(link_path)
                .map_err(|err| format!("failed to replace existing link: {err}"))?;
        }
        Ok(_) => return Err("path exists and is not a symlink".to_string()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(format!("failed to inspect link path: {err}")),
    }

    if let Some(parent) = link_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {err}", parent.display()))?;
    }
    symlink(&entry.link_target, link_path)
        .map_err(|err| format!("failed to create symlink: {err}"))?;
    Ok(LinkStep::Applied)
}

fn remove_link(entry: &ActivationLogEntry) -> std::result::Result<LinkStep, String> {
    let link_path = &entry.link_path;
    match fs::symlink_metadata(link_path) {
        Ok(metadata) if metadata.file_type().is_symlink() => {}
        Ok(_) => return Err("path is not a symlink".to_string()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(LinkStep::Skipped),
        Err(err) => return Err(format!("failed to inspect link path: {err}")),
    }

    let current = fs::read_link(link_path).map_err(|err| format!("failed to read link: {err}"))?;
    if current != entry.link_target {
        debug!(
            link = %link_path.display(),
            target = %current.display(),
            "link points elsewhere, leaving it"
        );
        return Ok(LinkStep::Skipped);
    }

    remove_symlink(link_path, &entry.link_target)
        .map_err(|err| format!("failed to remove symlink: {err}"))?;
    Ok(LinkStep::Applied)
}

fn symlink(target: &Path, link_path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link_path)
    }

    #[cfg(windows)]
    {
        if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link_path)
        } else {
            std::os::windows::fs::symlink_file(target, link_path)
        }
    }
}

fn remove_symlink(link_path: &Path, target: &Path) -> io::Result<()> {
    #[cfg(windows)]
    if target.is_dir() {
        return fs::remove_dir(link_path);
    }
    #[cfg(not(windows))]
    let _ = target;

    fs::remove_file(link_path)
}
