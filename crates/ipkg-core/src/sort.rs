use std::cmp::Ordering;

use semver::Version;

use crate::id::PackageId;
use crate::manifest::PackageManifest;

/// Anything that can be ordered for presentation by name and version.
pub trait PackageKey {
    fn package_name(&self) -> &str;
    fn package_version(&self) -> &str;
}

impl PackageKey for PackageId {
    fn package_name(&self) -> &str {
        self.name()
    }

    fn package_version(&self) -> &str {
        self.version()
    }
}

impl PackageKey for PackageManifest {
    fn package_name(&self) -> &str {
        self.id.name()
    }

    fn package_version(&self) -> &str {
        self.id.version()
    }
}

/// Listing order. Only used for display, never for dependency resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMethod {
    ByName,
    ByVersion,
}

impl SortMethod {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "name" => Some(Self::ByName),
            "version" => Some(Self::ByVersion),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ByName => "name",
            Self::ByVersion => "version",
        }
    }

    pub fn compare<T: PackageKey + ?Sized>(self, first: &T, second: &T) -> Ordering {
        let by_name = || first.package_name().cmp(second.package_name());
        let by_version = || compare_versions(first.package_version(), second.package_version());
        match self {
            Self::ByName => by_name().then_with(by_version),
            Self::ByVersion => by_version().then_with(by_name),
        }
    }

    pub fn sort<T: PackageKey>(self, items: &mut [T], reverse: bool) {
        items.sort_by(|first, second| {
            let ordering = self.compare(first, second);
            if reverse {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

/// Semantic-version ordering. Versions that cannot be read as semver sort
/// before every valid version and tie with each other.
pub fn compare_versions(first: &str, second: &str) -> Ordering {
    match (lenient_semver(first), lenient_semver(second)) {
        (Some(first), Some(second)) => first.cmp(&second),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Parses `v1.2`, `1.2` or `1` as if the missing components were zero.
pub fn lenient_semver(input: &str) -> Option<Version> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);
    let parts = core.split('.').collect::<Vec<_>>();
    if parts.len() > 3
        || parts
            .iter()
            .any(|part| part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()))
    {
        return None;
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);
    Version::parse(&padded).ok()
}
