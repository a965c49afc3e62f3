use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// `<file><suffix>`, next to the original.
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Copy `path` aside before it is modified. An existing backup is replaced.
pub fn backup_file(path: &Path, suffix: &str) -> io::Result<PathBuf> {
    let backup = backup_path(path, suffix);
    std::fs::copy(path, &backup)?;
    Ok(backup)
}

/// Write `content` through a sibling temp file so a failed write never
/// leaves the target half-written. Symlinks are followed to the real file,
/// and its permissions carry over to the new content.
pub fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let permissions = std::fs::metadata(&target).ok().map(|meta| meta.permissions());
    let tmp = backup_path(&target, ".code-rescue.tmp");

    let result = std::fs::write(&tmp, content)
        .and_then(|()| match permissions {
            Some(permissions) => std::fs::set_permissions(&tmp, permissions),
            None => Ok(()),
        })
        .and_then(|()| std::fs::rename(&tmp, &target));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("pkg/mod.py"), ".bak"),
            PathBuf::from("pkg/mod.py.bak")
        );
    }

    #[test]
    fn test_backup_file_copies_content() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("mod.py");
        fs::write(&file, "x = 1\n").unwrap();

        let backup = backup_file(&file, ".orig").unwrap();
        assert_eq!(backup, tmp.path().join("mod.py.orig"));
        assert_eq!(fs::read_to_string(backup).unwrap(), "x = 1\n");
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("mod.py");
        fs::write(&file, "old\n").unwrap();

        write_atomic(&file, "new\n").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "new\n");
        assert!(!tmp.path().join("mod.py.code-rescue.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("run.py");
        fs::write(&file, "old\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o755)).unwrap();

        write_atomic(&file, "new\n").unwrap();
        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(fs::read_to_string(&file).unwrap(), "new\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_follows_symlink() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("real.py");
        let link = tmp.path().join("link.py");
        fs::write(&real, "old\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        write_atomic(&link, "new\n").unwrap();
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "new\n");
    }
}
