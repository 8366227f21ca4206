use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bundle::manifest_path;
use crate::dependencies::{Dependencies, DependencyKind};
use crate::error::ManifestError;
use crate::id::PackageId;
use crate::platform::Platform;

/// A package's declared identity, platform support, build flag and
/// dependency set, as read from `.ira/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ManifestDocument", into = "ManifestDocument")]
pub struct PackageManifest {
    pub id: PackageId,
    pub dependencies: Dependencies,
    pub support_windows: bool,
    pub support_linux: bool,
    pub build: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDocument {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: BTreeMap<String, bool>,
    #[serde(default, alias = "supportsWindows")]
    support_windows: bool,
    #[serde(default, alias = "supportsLinux")]
    support_linux: bool,
    #[serde(default)]
    build: bool,
}

impl TryFrom<ManifestDocument> for PackageManifest {
    type Error = ManifestError;

    fn try_from(document: ManifestDocument) -> Result<Self, Self::Error> {
        let id = PackageId::new(document.name, document.version)?;
        let mut dependencies = Dependencies::new();
        for (raw_id, required) in document.dependencies {
            let dependency = PackageId::parse(&raw_id)?;
            dependencies.insert(dependency, DependencyKind::from(required));
        }

        Ok(Self {
            id,
            dependencies,
            support_windows: document.support_windows,
            support_linux: document.support_linux,
            build: document.build,
        })
    }
}

impl From<PackageManifest> for ManifestDocument {
    fn from(manifest: PackageManifest) -> Self {
        Self {
            name: manifest.id.name().to_string(),
            version: manifest.id.version().to_string(),
            dependencies: manifest
                .dependencies
                .into_iter()
                .map(|(id, kind)| (id.to_string(), kind.is_required()))
                .collect(),
            support_windows: manifest.support_windows,
            support_linux: manifest.support_linux,
            build: manifest.build,
        }
    }
}

impl PackageManifest {
    pub fn from_json_str(input: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(input).map_err(|err| ManifestError::MalformedManifest {
            origin: "inline manifest".to_string(),
            reason: err.to_string(),
        })
    }

    pub fn read_from(path: &Path) -> Result<Self, ManifestError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ManifestError::NoManifest(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ManifestError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|err| ManifestError::MalformedManifest {
            origin: path.display().to_string(),
            reason: err.to_string(),
        })
    }

    /// Reads the manifest of an unpacked bundle rooted at `package_root`.
    pub fn read_from_bundle(package_root: &Path) -> Result<Self, ManifestError> {
        Self::read_from(&manifest_path(package_root))
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn version(&self) -> &str {
        self.id.version()
    }

    pub fn supports(&self, platform: &Platform) -> bool {
        match platform {
            Platform::Linux => self.support_linux,
            Platform::Windows => self.support_windows,
            Platform::Other(_) => false,
        }
    }

    pub fn required_dependencies(&self) -> impl Iterator<Item = &PackageId> + '_ {
        self.dependencies
            .iter()
            .filter(|(_, kind)| kind.is_required())
            .map(|(id, _)| id)
    }

    /// Applies `visitor` to every declared dependency, stopping at the first
    /// error it returns.
    pub fn for_each_dependency<E, F>(&self, mut visitor: F) -> Result<(), E>
    where
        F: FnMut(&PackageId, DependencyKind) -> Result<(), E>,
    {
        for (id, kind) in &self.dependencies {
            visitor(id, *kind)?;
        }
        Ok(())
    }
}
