use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ipkg_core::{
    deserialize_dependencies, serialize_dependencies, Dependencies, PackageId, PackageKey,
    PackageManifest,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::error::{Error, IoContext, RegistryContext, Result};
use crate::layout::RootLayout;
use crate::types::InstallReason;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    dependencies TEXT NOT NULL,
    installed_by_user INTEGER NOT NULL,
    used_by INTEGER NOT NULL DEFAULT 0,
    UNIQUE (name, version)
);
";

const SELECT_COLUMNS: &str =
    "SELECT id, name, version, dependencies, installed_by_user, used_by FROM packages";

/// One installed package as the registry stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRecord {
    pub id: i64,
    pub package: PackageId,
    pub dependencies: Dependencies,
    pub installed_by_user: bool,
    /// Number of installed packages that require this one.
    pub used_by: u32,
}

impl RegistryRecord {
    pub fn install_reason(&self) -> InstallReason {
        InstallReason::from_installed_by_user(self.installed_by_user)
    }

    pub fn is_dependency_only(&self) -> bool {
        !self.installed_by_user
    }

    pub fn can_be_removed(&self) -> bool {
        self.used_by == 0
    }

    pub fn required_dependencies(&self) -> impl Iterator<Item = &PackageId> {
        self.dependencies
            .iter()
            .filter(|(_, kind)| kind.is_required())
            .map(|(id, _)| id)
    }
}

impl PackageKey for RegistryRecord {
    fn package_name(&self) -> &str {
        self.package.name()
    }

    fn package_version(&self) -> &str {
        self.package.version()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyCheck {
    Satisfied,
    Unsatisfied { missing: Vec<PackageId> },
}

impl DependencyCheck {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

struct RawRecord {
    id: i64,
    name: String,
    version: String,
    dependencies: String,
    installed_by_user: bool,
    used_by: u32,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            version: row.get(2)?,
            dependencies: row.get(3)?,
            installed_by_user: row.get(4)?,
            used_by: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<RegistryRecord> {
        Ok(RegistryRecord {
            id: self.id,
            package: PackageId::new(self.name, self.version)?,
            dependencies: deserialize_dependencies(&self.dependencies)?,
            installed_by_user: self.installed_by_user,
            used_by: self.used_by,
        })
    }
}

/// A package root: a directory holding installed packages and the
/// registry database that describes them.
#[derive(Debug)]
pub struct PackageRoot {
    layout: RootLayout,
    conn: Connection,
}

impl PackageRoot {
    /// Creates the root directory and registry when missing. Reuses an
    /// existing registry as is.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(Error::NotADirectory(path)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&path)
                    .io_context(|| format!("failed to create package root {}", path.display()))?;
            }
            Err(err) => {
                return Err(err).io_context(|| format!("failed to inspect {}", path.display()));
            }
        }
        Self::connect(RootLayout::new(path))
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(Error::NotADirectory(path)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotARoot(path));
            }
            Err(err) => {
                return Err(err).io_context(|| format!("failed to inspect {}", path.display()));
            }
        }

        let layout = RootLayout::new(path);
        if !layout.database_path().is_file() {
            return Err(Error::NotARoot(layout.root().to_path_buf()));
        }
        Self::connect(layout)
    }

    /// Opens the root at `path`, creating it first when it is not a root yet.
    /// The flag reports whether a new registry was created.
    pub fn open_or_create(path: impl Into<PathBuf>) -> Result<(Self, bool)> {
        let path = path.into();
        let created = !RootLayout::new(&path).database_path().is_file();
        let root = if created {
            Self::create(path)?
        } else {
            Self::open(path)?
        };
        Ok((root, created))
    }

    fn connect(layout: RootLayout) -> Result<Self> {
        let db_path = layout.database_path();
        let conn = Connection::open(&db_path)
            .registry_context(|| format!("failed to open registry {}", db_path.display()))?;
        conn.execute_batch(SCHEMA)
            .registry_context(|| format!("failed to initialize registry {}", db_path.display()))?;
        debug!(root = %layout.root().display(), "opened package root");
        Ok(Self { layout, conn })
    }

    pub fn layout(&self) -> &RootLayout {
        &self.layout
    }

    pub fn path(&self) -> &Path {
        self.layout.root()
    }

    pub fn lookup(&self, package: &PackageId) -> Result<Option<RegistryRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE name = ?1 AND version = ?2"),
                params![package.name(), package.version()],
                RawRecord::from_row,
            )
            .optional()
            .registry_context(|| format!("failed to look up {package}"))?;
        raw.map(RawRecord::into_record).transpose()
    }

    pub fn find(&self, package: &PackageId) -> Result<RegistryRecord> {
        self.lookup(package)?
            .ok_or_else(|| Error::NotFound(package.clone()))
    }

    pub fn contains(&self, package: &PackageId) -> Result<bool> {
        Ok(self.lookup(package)?.is_some())
    }

    /// All installed versions of `name`, in installation order.
    pub fn find_all_by_name(&self, name: &str) -> Result<Vec<RegistryRecord>> {
        self.query_records(
            &format!("{SELECT_COLUMNS} WHERE name = ?1 ORDER BY id"),
            params![name],
        )
    }

    pub fn list(&self) -> Result<Vec<RegistryRecord>> {
        self.query_records(&format!("{SELECT_COLUMNS} ORDER BY id"), params![])
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<RegistryRecord>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .registry_context(|| "failed to prepare registry query")?;
        let rows = stmt
            .query_map(params, RawRecord::from_row)
            .registry_context(|| "failed to query registry")?;

        let mut records = Vec::new();
        for row in rows {
            let raw = row.registry_context(|| "failed to read registry row")?;
            records.push(raw.into_record()?);
        }
        Ok(records)
    }

    pub fn insert(
        &self,
        package: &PackageId,
        dependencies: &Dependencies,
        reason: InstallReason,
    ) -> Result<RegistryRecord> {
        let result = self.conn.execute(
            "INSERT INTO packages (name, version, dependencies, installed_by_user, used_by)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![
                package.name(),
                package.version(),
                serialize_dependencies(dependencies),
                reason.installed_by_user(),
            ],
        );
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(Error::AlreadyInstalled(package.clone()));
            }
            Err(source) => {
                return Err(Error::Registry {
                    context: format!("failed to register {package}"),
                    source,
                });
            }
        }

        Ok(RegistryRecord {
            id: self.conn.last_insert_rowid(),
            package: package.clone(),
            dependencies: dependencies.clone(),
            installed_by_user: reason.installed_by_user(),
            used_by: 0,
        })
    }

    pub fn delete(&self, package: &PackageId) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM packages WHERE name = ?1 AND version = ?2",
                params![package.name(), package.version()],
            )
            .registry_context(|| format!("failed to unregister {package}"))?;
        if changed == 0 {
            return Err(Error::NotFound(package.clone()));
        }
        Ok(())
    }

    pub fn set_installed_by_user(&self, package: &PackageId, installed_by_user: bool) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE packages SET installed_by_user = ?3 WHERE name = ?1 AND version = ?2",
                params![package.name(), package.version(), installed_by_user],
            )
            .registry_context(|| format!("failed to update install reason of {package}"))?;
        if changed == 0 {
            return Err(Error::NotFound(package.clone()));
        }
        Ok(())
    }

    /// Returns the new count.
    pub fn increment_used_by(&self, package: &PackageId) -> Result<u32> {
        let changed = self
            .conn
            .execute(
                "UPDATE packages SET used_by = used_by + 1 WHERE name = ?1 AND version = ?2",
                params![package.name(), package.version()],
            )
            .registry_context(|| format!("failed to update usage count of {package}"))?;
        if changed == 0 {
            return Err(Error::NotFound(package.clone()));
        }
        Ok(self.find(package)?.used_by)
    }

    /// Returns the new count. The count never drops below zero.
    pub fn decrement_used_by(&self, package: &PackageId) -> Result<u32> {
        let changed = self
            .conn
            .execute(
                "UPDATE packages SET used_by = used_by - 1
                 WHERE name = ?1 AND version = ?2 AND used_by > 0",
                params![package.name(), package.version()],
            )
            .registry_context(|| format!("failed to update usage count of {package}"))?;
        let record = self.find(package)?;
        if changed == 0 {
            warn!(package = %package, "usage count is already zero");
        }
        Ok(record.used_by)
    }

    pub fn is_dependency_only(&self, package: &PackageId) -> Result<bool> {
        Ok(self.find(package)?.is_dependency_only())
    }

    pub fn can_be_removed(&self, package: &PackageId) -> Result<bool> {
        Ok(self.find(package)?.can_be_removed())
    }

    /// Checks that every required dependency of `manifest` is installed.
    /// Optional dependencies are never checked.
    pub fn check_dependencies(&self, manifest: &PackageManifest) -> Result<DependencyCheck> {
        let mut missing = Vec::new();
        for dependency in manifest.required_dependencies() {
            if !self.contains(dependency)? {
                missing.push(dependency.clone());
            }
        }

        if missing.is_empty() {
            Ok(DependencyCheck::Satisfied)
        } else {
            Ok(DependencyCheck::Unsatisfied { missing })
        }
    }
}
