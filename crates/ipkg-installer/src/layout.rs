use std::path::{Path, PathBuf};

use ipkg_core::{PackageId, MANIFEST_FILE, METADATA_DIR, SCRIPT_FILE};

pub const DATABASE_FILE: &str = "db.sqlite3";
pub const ACTIVATION_LOG_FILE: &str = "activate.log";
pub const DEACTIVATED_MARKER_FILE: &str = "deactivated";

/// On-disk layout of a package root.
///
/// ```text
/// <root>/db.sqlite3
/// <root>/<name>@<version>/...            installed payload
/// <root>/<name>@<version>/.ira/iscript
/// <root>/<name>@<version>/.ira/config.json
/// <root>/<name>@<version>/.ira/activate.log
/// <root>/<name>@<version>/.ira/deactivated
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootLayout {
    root: PathBuf,
}

impl RootLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn package_dir(&self, package: &PackageId) -> PathBuf {
        self.root.join(package.to_string())
    }

    pub fn package_metadata_dir(&self, package: &PackageId) -> PathBuf {
        self.package_dir(package).join(METADATA_DIR)
    }

    pub fn installed_script_path(&self, package: &PackageId) -> PathBuf {
        self.package_metadata_dir(package).join(SCRIPT_FILE)
    }

    pub fn installed_manifest_path(&self, package: &PackageId) -> PathBuf {
        self.package_metadata_dir(package).join(MANIFEST_FILE)
    }

    pub fn activation_log_path(&self, package: &PackageId) -> PathBuf {
        self.package_metadata_dir(package).join(ACTIVATION_LOG_FILE)
    }

    pub fn deactivated_marker_path(&self, package: &PackageId) -> PathBuf {
        self.package_metadata_dir(package)
            .join(DEACTIVATED_MARKER_FILE)
    }
}

/// Scratch directory used to unpack `.ipkg` archives.
pub fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("ira").join("ipkg").join("install")
}
