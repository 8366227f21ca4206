use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{ArchiveContext, Error, IoContext, Result};
use crate::fs_utils::{remove_dir_all_if_exists, remove_file_if_exists};

const SCRATCH_EXTENSION: &str = "zip";

/// Copies `bundle` into `temp_dir` as `<stem>.zip` and returns the copy.
pub fn prepare_bundle(bundle: &Path, temp_dir: &Path) -> Result<PathBuf> {
    let Some(stem) = bundle.file_stem() else {
        return Err(Error::NotAPackage(bundle.to_path_buf()));
    };
    fs::create_dir_all(temp_dir)
        .io_context(|| format!("failed to create temporary dir {}", temp_dir.display()))?;

    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(SCRATCH_EXTENSION);
    let archive_path = temp_dir.join(file_name);

    fs::copy(bundle, &archive_path).io_context(|| {
        format!(
            "failed to copy package {} to temporary place {}",
            bundle.display(),
            archive_path.display()
        )
    })?;
    debug!(archive = %archive_path.display(), "prepared package archive");
    Ok(archive_path)
}

/// Unpacks `archive_path` into a sibling directory named like the archive
/// without its extension, and returns that directory.
///
/// Any entry resolving outside the destination aborts extraction with
/// [`Error::PathTraversal`] before it is written.
pub fn extract_archive(archive_path: &Path) -> Result<PathBuf> {
    let archive_path = fs::canonicalize(archive_path)
        .io_context(|| format!("failed to resolve archive path {}", archive_path.display()))?;
    let destination = scratch_destination(&archive_path)?;

    let file = File::open(&archive_path)
        .io_context(|| format!("failed to open archive {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .archive_context(|| format!("failed to read archive {}", archive_path.display()))?;

    if remove_dir_all_if_exists(&destination)
        .io_context(|| format!("failed to clear stale {}", destination.display()))?
    {
        debug!(destination = %destination.display(), "cleared stale extraction dir");
    }
    fs::create_dir_all(&destination)
        .io_context(|| format!("failed to create {}", destination.display()))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).archive_context(|| {
            format!("failed to read entry {index} of {}", archive_path.display())
        })?;
        let name = entry.name().to_string();
        let target = resolve_entry_path(&destination, &name)?;

        if entry.is_dir() {
            fs::create_dir_all(&target)
                .io_context(|| format!("failed to create {}", target.display()))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .io_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mode = entry.unix_mode();
        write_entry(&mut entry, &target, mode)?;
    }

    debug!(
        archive = %archive_path.display(),
        destination = %destination.display(),
        entries = archive.len(),
        "extracted archive"
    );
    Ok(destination)
}

/// Removes the archive copy made by [`prepare_bundle`] and whatever was
/// extracted from it. Failures are logged and otherwise ignored.
pub(crate) fn remove_scratch(archive_path: &Path) {
    if let Ok(destination) = scratch_destination(archive_path) {
        if let Err(err) = remove_dir_all_if_exists(&destination) {
            warn!(path = %destination.display(), error = %err, "failed to remove extraction dir");
        }
    }
    if let Err(err) = remove_file_if_exists(archive_path) {
        warn!(path = %archive_path.display(), error = %err, "failed to remove archive copy");
    }
}

fn scratch_destination(archive_path: &Path) -> Result<PathBuf> {
    if archive_path.extension() != Some(OsStr::new(SCRATCH_EXTENSION)) {
        return Err(Error::NotAPackage(archive_path.to_path_buf()));
    }
    Ok(archive_path.with_extension(""))
}

fn resolve_entry_path(destination: &Path, entry: &str) -> Result<PathBuf> {
    let relative = Path::new(entry);
    let candidate = normalize_lexically(&destination.join(relative));
    let escapes = relative.has_root()
        || candidate == destination
        || !candidate.starts_with(destination);
    if escapes {
        return Err(Error::PathTraversal {
            entry: entry.to_string(),
            destination: destination.to_path_buf(),
        });
    }
    Ok(candidate)
}

/// Resolves `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                }
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component.as_os_str());
            }
        }
    }
    normalized
}

fn write_entry(reader: &mut impl Read, target: &Path, mode: Option<u32>) -> Result<()> {
    let mut output =
        File::create(target).io_context(|| format!("failed to create {}", target.display()))?;
    io::copy(reader, &mut output)
        .io_context(|| format!("failed to write {}", target.display()))?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(target, fs::Permissions::from_mode(mode & 0o7777))
            .io_context(|| format!("failed to set permissions on {}", target.display()))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
