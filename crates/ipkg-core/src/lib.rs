mod bundle;
mod dependencies;
mod error;
mod id;
mod manifest;
mod platform;
mod sort;

pub use bundle::{
    build_script_path, manifest_path, metadata_dir, script_path, BundleKind, BUNDLE_EXTENSION,
    MANIFEST_FILE, METADATA_DIR, SCRIPT_FILE,
};
pub use dependencies::{
    deserialize_dependencies, serialize_dependencies, Dependencies, DependencyKind,
};
pub use error::ManifestError;
pub use id::{PackageId, ID_SEPARATOR};
pub use manifest::PackageManifest;
pub use platform::Platform;
pub use sort::{compare_versions, lenient_semver, PackageKey, SortMethod};

#[cfg(test)]
mod tests;
