use std::path::{Path, PathBuf};

use crate::platform::Platform;

pub const BUNDLE_EXTENSION: &str = "ipkg";
pub const METADATA_DIR: &str = ".ira";
pub const MANIFEST_FILE: &str = "config.json";
pub const SCRIPT_FILE: &str = "iscript";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    Directory,
    Archive,
}

impl BundleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Archive => "archive",
        }
    }

    /// Classifies an install input. Anything that is neither a directory nor
    /// a `.ipkg` file is not a package.
    pub fn infer(path: &Path, is_dir: bool) -> Option<Self> {
        if is_dir {
            return Some(Self::Directory);
        }

        let extension = path.extension().and_then(|value| value.to_str())?;
        extension
            .eq_ignore_ascii_case(BUNDLE_EXTENSION)
            .then_some(Self::Archive)
    }
}

pub fn metadata_dir(package_root: &Path) -> PathBuf {
    package_root.join(METADATA_DIR)
}

pub fn manifest_path(package_root: &Path) -> PathBuf {
    metadata_dir(package_root).join(MANIFEST_FILE)
}

pub fn script_path(package_root: &Path) -> PathBuf {
    metadata_dir(package_root).join(SCRIPT_FILE)
}

pub fn build_script_path(package_root: &Path, platform: &Platform) -> Option<PathBuf> {
    platform
        .build_script_name()
        .map(|name| metadata_dir(package_root).join(name))
}
