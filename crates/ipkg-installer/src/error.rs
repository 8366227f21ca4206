use std::io;
use std::path::PathBuf;

use ipkg_core::{ManifestError, PackageId};
use thiserror::Error;

use crate::scripts::ScriptMode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("package {0} is not installed")]
    NotFound(PackageId),

    #[error("package {0} is already installed")]
    AlreadyInstalled(PackageId),

    #[error("directory {} is not a package root", .0.display())]
    NotARoot(PathBuf),

    #[error("incorrect path {}: expected dir, found file", .0.display())]
    NotADirectory(PathBuf),

    #[error("package {} doesn't exist", .0.display())]
    MissingInput(PathBuf),

    #[error("file {} is not an ipkg package", .0.display())]
    NotAPackage(PathBuf),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("package {0} has no install script")]
    NoScript(PackageId),

    #[error("package {package} does not support {platform}")]
    UnsupportedPlatform { package: PackageId, platform: String },

    #[error(
        "not all required dependencies of {package} are satisfied, missing: {}",
        join_ids(.missing)
    )]
    DependenciesNotSatisfied {
        package: PackageId,
        missing: Vec<PackageId>,
    },

    #[error("build script of {package} failed: {reason}")]
    BuildFailed { package: PackageId, reason: String },

    #[error("{mode} script of {package} failed: {reason}")]
    ScriptFailed {
        package: PackageId,
        mode: ScriptMode,
        reason: String,
    },

    #[error("archive entry '{entry}' escapes extraction directory {}", destination.display())]
    PathTraversal { entry: String, destination: PathBuf },

    #[error("package {package} is still required by {used_by} installed package(s)")]
    StillRequired { package: PackageId, used_by: u32 },

    #[error("failed to {action} {package}: none of its {attempted} activation link(s) applied")]
    ActivationFailed {
        package: PackageId,
        action: &'static str,
        attempted: usize,
    },

    #[error("{context}: permission denied")]
    PermissionDenied {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}")]
    Registry {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{context}")]
    Archive {
        context: String,
        #[source]
        source: zip::result::ZipError,
    },
}

impl Error {
    /// True when the error only says the package is absent, as opposed to
    /// the registry or filesystem being broken.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

fn join_ids(ids: &[PackageId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) trait IoContext<T> {
    fn io_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for std::result::Result<T, io::Error> {
    fn io_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| {
            let context = context().into();
            if source.kind() == io::ErrorKind::PermissionDenied {
                Error::PermissionDenied { context, source }
            } else {
                Error::Io { context, source }
            }
        })
    }
}

pub(crate) trait RegistryContext<T> {
    fn registry_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> RegistryContext<T> for rusqlite::Result<T> {
    fn registry_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| Error::Registry {
            context: context().into(),
            source,
        })
    }
}

pub(crate) trait ArchiveContext<T> {
    fn archive_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ArchiveContext<T> for zip::result::ZipResult<T> {
    fn archive_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| Error::Archive {
            context: context().into(),
            source,
        })
    }
}
