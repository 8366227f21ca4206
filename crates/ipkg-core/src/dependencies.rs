use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::id::PackageId;

const REQUIRED_FLAG: &str = "(!)";
const OPTIONAL_FLAG: &str = "(?)";

/// Whether a dependency has to be installed before its dependent.
///
/// Manifests spell this as a JSON boolean, `true` meaning required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum DependencyKind {
    Required,
    Optional,
}

impl DependencyKind {
    pub fn is_required(self) -> bool {
        self == Self::Required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
        }
    }

    fn flag(self) -> &'static str {
        match self {
            Self::Required => REQUIRED_FLAG,
            Self::Optional => OPTIONAL_FLAG,
        }
    }
}

impl From<bool> for DependencyKind {
    fn from(value: bool) -> Self {
        if value {
            Self::Required
        } else {
            Self::Optional
        }
    }
}

impl From<DependencyKind> for bool {
    fn from(value: DependencyKind) -> Self {
        value.is_required()
    }
}

pub type Dependencies = BTreeMap<PackageId, DependencyKind>;

/// Flattens a dependency set into the registry column format
/// `id(!);id(?);...`. An empty set becomes the empty string.
pub fn serialize_dependencies(dependencies: &Dependencies) -> String {
    dependencies
        .iter()
        .map(|(id, kind)| format!("{id}{}", kind.flag()))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn deserialize_dependencies(serialized: &str) -> Result<Dependencies, ManifestError> {
    let mut dependencies = Dependencies::new();
    if serialized.is_empty() {
        return Ok(dependencies);
    }

    let malformed = |reason: String| ManifestError::MalformedDependencies {
        serialized: serialized.to_string(),
        reason,
    };

    for entry in serialized.split(';') {
        let (raw_id, kind) = if let Some(raw_id) = entry.strip_suffix(REQUIRED_FLAG) {
            (raw_id, DependencyKind::Required)
        } else if let Some(raw_id) = entry.strip_suffix(OPTIONAL_FLAG) {
            (raw_id, DependencyKind::Optional)
        } else {
            return Err(malformed(format!(
                "entry '{entry}' does not end with {REQUIRED_FLAG} or {OPTIONAL_FLAG}"
            )));
        };

        let id = PackageId::parse(raw_id).map_err(|err| malformed(err.to_string()))?;
        if dependencies.insert(id, kind).is_some() {
            return Err(malformed(format!("duplicate entry '{raw_id}'")));
        }
    }

    Ok(dependencies)
}
