use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

/// Separator between name and version in the flat `name@version` form.
pub const ID_SEPARATOR: char = '@';

/// Exact identity of one package version.
///
/// The flat form produced by [`fmt::Display`] is the only serialization used
/// for install directory names and dependency keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId {
    name: String,
    version: String,
}

impl PackageId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self, ManifestError> {
        let name = name.into();
        let version = version.into();
        let flat = format!("{name}{ID_SEPARATOR}{version}");
        validate_component(&flat, &name, "name must not be empty")?;
        validate_component(&flat, &version, "version must not be empty")?;
        Ok(Self { name, version })
    }

    pub fn parse(input: &str) -> Result<Self, ManifestError> {
        let Some((name, version)) = input.rsplit_once(ID_SEPARATOR) else {
            return Err(ManifestError::InvalidPackageId {
                id: input.to_string(),
                reason: "expected name@version",
            });
        };
        Self::new(name, version)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

fn validate_component(
    id: &str,
    value: &str,
    empty_reason: &'static str,
) -> Result<(), ManifestError> {
    let invalid = |reason: &'static str| ManifestError::InvalidPackageId {
        id: id.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid(empty_reason));
    }
    if value == "." || value == ".." {
        return Err(invalid("'.' and '..' are reserved"));
    }
    if value.chars().any(|ch| {
        ch.is_whitespace()
            || ch.is_control()
            || matches!(ch, ID_SEPARATOR | ';' | '(' | ')' | '/' | '\\')
    }) {
        return Err(invalid(
            "must not contain whitespace, control characters or any of @ ; ( ) / \\",
        ));
    }
    Ok(())
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, ID_SEPARATOR, self.version)
    }
}

impl FromStr for PackageId {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageId {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageId> for String {
    fn from(value: PackageId) -> Self {
        value.to_string()
    }
}
