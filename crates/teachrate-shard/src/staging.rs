//! Staged output directories with rename-based promotion.
//!
//! A build writes into a hidden sibling of the output directory. Only a
//! fully successful build is promoted; a dropped, unpromoted staging area is
//! removed with everything in it. An existing output is only replaced when it
//! is empty or holds a previous build (it has a manifest).
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use teachrate_core::error::{Error, Result};

use crate::schema::MANIFEST_FILE;

const STAGING_PREFIX: &str = ".teachrate-staging-";

#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    target: PathBuf,
}

impl StagingArea {
    /// Creates the staging directory next to `target` so the final rename
    /// never crosses a filesystem boundary.
    pub fn create(target: &Path) -> Result<Self> {
        ensure_replaceable(target)?;
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| Error::write_failure(&parent, e))?;
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| Error::write_failure(&parent, e))?;
        debug!(staging = %dir.path().display(), target = %target.display(), "staging area created");
        Ok(Self { dir, target: target.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Swaps the staged tree into place. An existing output is moved aside
    /// first and restored if the swap fails.
    pub fn promote(self) -> Result<PathBuf> {
        let target = self.target.clone();
        ensure_replaceable(&target)?;
        let backup = backup_path(&target);

        if backup.exists() {
            fs::remove_dir_all(&backup).map_err(|e| Error::write_failure(&backup, e))?;
        }
        let had_previous = target.exists();
        if had_previous {
            fs::rename(&target, &backup).map_err(|e| Error::write_failure(&target, e))?;
        }

        if let Err(e) = fs::rename(self.dir.path(), &target) {
            if had_previous {
                if let Err(restore) = fs::rename(&backup, &target) {
                    warn!(error = %restore, backup = %backup.display(), "failed to restore previous output");
                }
            }
            return Err(Error::write_failure(&target, e));
        }

        if had_previous {
            if let Err(e) = fs::remove_dir_all(&backup) {
                warn!(error = %e, backup = %backup.display(), "failed to remove previous output");
            }
        }
        // The TempDir no longer points at anything; its drop is a no-op.
        drop(self.dir);
        info!(output = %target.display(), "output promoted");
        Ok(target)
    }
}

/// Refuses to replace anything that is not a previous build.
fn ensure_replaceable(target: &Path) -> Result<()> {
    if !target.exists() {
        return Ok(());
    }
    let refuse = |reason: &str| -> Result<()> {
        Err(Error::write_failure(target, io::Error::new(io::ErrorKind::AlreadyExists, reason)))
    };
    if !target.is_dir() {
        return refuse("output path exists and is not a directory");
    }
    if target.join(MANIFEST_FILE).is_file() {
        return Ok(());
    }
    let mut entries = fs::read_dir(target).map_err(|e| Error::write_failure(target, e))?;
    if entries.next().is_some() {
        return refuse("output directory is not empty and holds no previous build");
    }
    Ok(())
}

fn backup_path(target: &Path) -> PathBuf {
    let name = target.file_name().map_or_else(|| "output".into(), |n| n.to_string_lossy().into_owned());
    target.with_file_name(format!(".{name}.previous"))
}

/// Serializes `value` to `path`, compact unless `pretty`. Output ends with
/// a newline.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let encoded = if pretty { serde_json::to_vec_pretty(value) } else { serde_json::to_vec(value) };
    let mut bytes = encoded.map_err(|e| Error::write_failure(path, e))?;
    bytes.push(b'\n');
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::write_failure(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| Error::write_failure(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_replaces_existing_output() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("out");
        fs::create_dir(&target).unwrap();
        fs::write(target.join(MANIFEST_FILE), "{}").unwrap();
        fs::write(target.join("stale.json"), "{}").unwrap();

        let staging = StagingArea::create(&target).unwrap();
        fs::write(staging.path().join("fresh.json"), "{}").unwrap();
        staging.promote().unwrap();

        assert!(target.join("fresh.json").exists());
        assert!(!target.join("stale.json").exists());
        assert!(!backup_path(&target).exists());
        let leftovers: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn dropped_staging_area_leaves_nothing() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("out");
        let staging = StagingArea::create(&target).unwrap();
        let staged = staging.path().to_path_buf();
        fs::write(staged.join("x.json"), "{}").unwrap();
        drop(staging);

        assert!(!staged.exists());
        assert!(!target.exists());
    }

    #[test]
    fn write_json_is_compact_by_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/v.json");
        write_json(&path, &serde_json::json!({"a": [1, 2]}), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":[1,2]}\n");
    }

    #[test]
    fn foreign_directories_are_never_replaced() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("home");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("notes.txt"), "keep me").unwrap();

        let err = StagingArea::create(&target).unwrap_err();
        assert_eq!(err.code(), "write_failure");
        assert_eq!(fs::read_to_string(target.join("notes.txt")).unwrap(), "keep me");
        let leftovers: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn foreign_files_appearing_before_promotion_are_kept() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("out");
        let staging = StagingArea::create(&target).unwrap();
        fs::write(staging.path().join(MANIFEST_FILE), "{}").unwrap();
        fs::create_dir(&target).unwrap();
        fs::write(target.join("notes.txt"), "keep me").unwrap();

        assert!(staging.promote().is_err());
        assert_eq!(fs::read_to_string(target.join("notes.txt")).unwrap(), "keep me");
        assert!(!target.join(MANIFEST_FILE).exists());
    }

    #[test]
    fn empty_existing_directory_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("out");
        fs::create_dir(&target).unwrap();

        let staging = StagingArea::create(&target).unwrap();
        fs::write(staging.path().join(MANIFEST_FILE), "{}").unwrap();
        staging.promote().unwrap();
        assert!(target.join(MANIFEST_FILE).exists());
    }
}
