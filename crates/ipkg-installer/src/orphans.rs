use std::fs;

use ipkg_core::PackageId;
use tracing::{info, warn};

use crate::error::{IoContext, Result};
use crate::fs_utils::remove_dir_all_if_exists;
use crate::registry::PackageRoot;
use crate::types::Orphan;

impl PackageRoot {
    /// Install dirs under the root that have no registry row, typically left
    /// behind by an install that failed after its dir was created.
    pub fn find_orphans(&self) -> Result<Vec<Orphan>> {
        let root = self.path();
        let entries =
            fs::read_dir(root).io_context(|| format!("failed to read {}", root.display()))?;

        let mut orphans = Vec::new();
        for entry in entries {
            let entry = entry.io_context(|| format!("failed to read {}", root.display()))?;
            let file_type = entry
                .file_type()
                .io_context(|| format!("failed to inspect {}", entry.path().display()))?;
            if !file_type.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(package) = PackageId::parse(&name) else {
                continue;
            };
            if !self.contains(&package)? {
                orphans.push(Orphan {
                    package,
                    path: entry.path(),
                });
            }
        }
        orphans.sort();
        Ok(orphans)
    }

    /// Deletes every orphaned install dir and returns what was reclaimed.
    pub fn reclaim_orphans(&self) -> Result<Vec<Orphan>> {
        let mut reclaimed = Vec::new();
        for orphan in self.find_orphans()? {
            match remove_dir_all_if_exists(&orphan.path) {
                Ok(_) => {
                    info!(package = %orphan.package, dir = %orphan.path.display(), "reclaimed orphaned install dir");
                    reclaimed.push(orphan);
                }
                Err(err) => {
                    warn!(dir = %orphan.path.display(), error = %err, "failed to reclaim orphaned install dir");
                }
            }
        }
        Ok(reclaimed)
    }
}
