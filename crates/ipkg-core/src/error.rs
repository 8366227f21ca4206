use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("package has no manifest: {}", .0.display())]
    NoManifest(PathBuf),

    #[error("failed to read manifest {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed manifest {origin}: {reason}")]
    MalformedManifest { origin: String, reason: String },

    #[error("invalid package id '{id}': {reason}")]
    InvalidPackageId { id: String, reason: &'static str },

    #[error("malformed dependency list '{serialized}': {reason}")]
    MalformedDependencies { serialized: String, reason: String },
}
