use std::path::PathBuf;

use ipkg_core::PackageId;

use crate::activation::ReplayReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    User,
    Dependency,
}

impl InstallReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Dependency => "dependency",
        }
    }

    pub(crate) fn installed_by_user(self) -> bool {
        matches!(self, Self::User)
    }

    pub(crate) fn from_installed_by_user(installed_by_user: bool) -> Self {
        if installed_by_user {
            Self::User
        } else {
            Self::Dependency
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub package: PackageId,
    pub install_dir: PathBuf,
    pub reason: InstallReason,
    /// Other installed versions of the same name that were deactivated.
    pub deactivated_siblings: Vec<PackageId>,
    /// Siblings that could not be deactivated. The install itself stands.
    pub sibling_failures: Vec<SiblingFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingFailure {
    pub package: PackageId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationOutcome {
    pub package: PackageId,
    /// False when the package was already in the requested state.
    pub changed: bool,
    pub report: ReplayReport,
    pub deactivated_siblings: Vec<PackageId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub package: PackageId,
    /// Dependencies removed by the cascade, deepest first.
    pub removed_dependencies: Vec<PackageId>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Orphan {
    pub package: PackageId,
    pub path: PathBuf,
}
