//! Install pipeline: download, unpack, swap into place
//!
//! The new version is unpacked into a hidden scratch directory inside the
//! plugins directory so the final move is a same-filesystem rename. An
//! existing install is renamed aside to `<folder>.bak.<unix-seconds>` first
//! and renamed back if the move-in fails. A crash between those two renames
//! leaves the backup in place for the operator to restore or re-run.

pub mod download;
pub mod extract;

pub use download::download;
pub use extract::{extractor_for, ArchiveExtractor, UnzipCommand, ZipExtractor};

use crate::errors::{InstallError, UpdateError};
use jbup_manifest::scanner::backup_folder_name;
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of the scratch directory; the leading dot keeps scans away from it
const SCRATCH_PREFIX: &str = ".jbup-extract-";

/// Resource-fork folder added by macOS archivers
const MACOS_METADATA_DIR: &str = "__MACOSX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub installed_to: PathBuf,
    pub backup: Option<PathBuf>,
}

/// Unpack `archive` and install it as `dest_dir`.
///
/// `now` (unix seconds) names the backup of any existing install.
pub fn extract_and_install(
    extractor: &dyn ArchiveExtractor,
    archive: &Path,
    dest_dir: &Path,
    now: i64,
) -> Result<InstallReport, UpdateError> {
    let parent = dest_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| InstallError::InvalidDestination(dest_dir.to_path_buf()))?;
    fs::create_dir_all(parent).map_err(|source| InstallError::Prepare {
        path: parent.to_path_buf(),
        source,
    })?;

    let scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(parent)
        .map_err(|source| InstallError::Prepare {
            path: parent.to_path_buf(),
            source,
        })?;

    jbup_logger::step(&format!(
        "Extracting {} with {}",
        archive.display(),
        extractor.name()
    ));
    extractor.extract(archive, scratch.path())?;

    let root = resolve_install_root(scratch.path()).map_err(|source| InstallError::Prepare {
        path: scratch.path().to_path_buf(),
        source,
    })?;
    let backup = replace_with_backup(&root, dest_dir, now)?;

    Ok(InstallReport {
        installed_to: dest_dir.to_path_buf(),
        backup,
    })
}

/// The directory whose contents become the plugin folder.
///
/// A lone top-level directory is unwrapped; anything else installs the
/// scratch directory as-is.
fn resolve_install_root(scratch: &Path) -> std::io::Result<PathBuf> {
    let metadata_dir = scratch.join(MACOS_METADATA_DIR);
    if metadata_dir.is_dir() {
        fs::remove_dir_all(&metadata_dir)?;
    }

    let entries: Vec<PathBuf> = fs::read_dir(scratch)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();

    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Ok(scratch.to_path_buf()),
    }
}

fn replace_with_backup(root: &Path, dest: &Path, now: i64) -> Result<Option<PathBuf>, InstallError> {
    let backup = if dest.symlink_metadata().is_ok() {
        let backup = unique_backup_path(dest, now);
        fs::rename(dest, &backup).map_err(|source| InstallError::Backup {
            from: dest.to_path_buf(),
            to: backup.clone(),
            source,
        })?;
        jbup_logger::info(&format!(
            "Backed up: {} -> {}",
            dest.display(),
            backup.display()
        ));
        Some(backup)
    } else {
        None
    };

    if let Err(source) = fs::rename(root, dest) {
        let restored = backup
            .as_ref()
            .is_some_and(|backup| fs::rename(backup, dest).is_ok());
        return Err(InstallError::MoveIn {
            from: root.to_path_buf(),
            to: dest.to_path_buf(),
            source,
            backup,
            restored,
        });
    }

    Ok(backup)
}

fn unique_backup_path(dest: &Path, now: i64) -> PathBuf {
    let folder = dest
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut attempt = 0;
    loop {
        let candidate = dest.with_file_name(backup_folder_name(&folder, now, attempt));
        if candidate.symlink_metadata().is_err() {
            return candidate;
        }
        attempt += 1;
    }
}
