//! Local filesystem primitives used by the sync engine and archiver.

use anyhow::{Context, Result};
use filetime::{set_file_times, FileTime};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Create the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Copy `src` to `dst`, keeping permissions, access time, and modification
/// time so later size + mtime checks see the two as unchanged.
///
/// Returns the number of bytes copied.
pub fn copy_with_metadata(src: &Path, dst: &Path) -> Result<u64> {
    ensure_parent(dst)?;
    make_writable(dst)?;

    let bytes = fs::copy(src, dst)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;

    let metadata = fs::metadata(src)
        .with_context(|| format!("Failed to stat {}", src.display()))?;
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    set_file_times(dst, atime, mtime)
        .with_context(|| format!("Failed to set times on {}", dst.display()))?;

    Ok(bytes)
}

/// A previous copy of a read-only source is itself read-only; clear that so
/// it can be overwritten. Permissions are restored by the copy.
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) -> Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to stat {}", path.display()));
        }
    };

    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to make {} writable", path.display()))?;
    }
    Ok(())
}

/// Move a file, falling back to copy + delete across filesystems.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    ensure_parent(dst)?;

    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            copy_with_metadata(src, dst)?;
            fs::remove_file(src)
                .with_context(|| format!("Failed to remove source file: {}", src.display()))?;
            Ok(())
        }
        Err(e) => Err(e)
            .with_context(|| format!("Failed to move {} to {}", src.display(), dst.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    #[test]
    fn test_copy_creates_parents_and_keeps_mtime() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("a/b/dst.txt");
        fs::write(&src, "payload").unwrap();

        let past = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(3600));
        filetime::set_file_mtime(&src, past).unwrap();

        let bytes = copy_with_metadata(&src, &dst).unwrap();

        assert_eq!(bytes, 7);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "payload");
        let dst_mtime = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(dst_mtime, past);
    }

    #[test]
    #[allow(clippy::permissions_set_readonly_false)]
    fn test_copy_overwrites_readonly_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, "v1").unwrap();
        let mut perms = fs::metadata(&src).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&src, perms).unwrap();

        copy_with_metadata(&src, &dst).unwrap();
        assert!(fs::metadata(&dst).unwrap().permissions().readonly());

        let mut perms = fs::metadata(&src).unwrap().permissions();
        perms.set_readonly(false);
        fs::set_permissions(&src, perms).unwrap();
        fs::write(&src, "v2").unwrap();

        copy_with_metadata(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "v2");
    }

    #[test]
    fn test_move_file() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("f.txt");
        let dst = dir.path().join("history/ts/f.txt");
        fs::write(&src, "data").unwrap();

        move_file(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "data");
    }

    #[test]
    fn test_copy_missing_source_fails_with_context() {
        let dir = tempdir().unwrap();
        let err = copy_with_metadata(&dir.path().join("nope"), &dir.path().join("out")).unwrap_err();
        assert!(err.to_string().contains("Failed to copy"));
    }
}
