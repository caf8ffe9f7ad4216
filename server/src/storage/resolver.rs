//! Name resolution against the served directory
//!
//! Every client-supplied file name goes through [`RootDirectory::resolve`]
//! before it reaches the filesystem. Resolution is purely lexical: symlinks
//! inside the root are not followed or checked.

use std::fs;
use std::path::{Component, Path, PathBuf};

use super::StorageError;

/// The single directory exposed by the server.
///
/// Always absolute and lexically normalized, fixed for the process lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootDirectory {
    path: PathBuf,
}

impl RootDirectory {
    /// Make `path` absolute, normalize it and create it if missing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let root = Self {
            path: normalize(&absolute),
        };
        fs::create_dir_all(&root.path)?;
        Ok(root)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Map a client-supplied file name onto a path directly inside the root.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty() || name == "." || name == ".." {
            return Err(StorageError::InvalidName);
        }
        if name.contains(['/', '\\', '\0']) {
            return Err(StorageError::InvalidName);
        }

        let resolved = normalize(&self.path.join(name));
        if resolved == self.path || !resolved.starts_with(&self.path) {
            return Err(StorageError::InvalidName);
        }
        Ok(resolved)
    }
}

/// Final `/`-separated element of a client-declared filename, ignoring
/// trailing slashes. Backslashes are kept so the resolver can reject them.
pub fn base_name(client_name: &str) -> &str {
    let trimmed = client_name.trim_end_matches('/');
    if trimmed.is_empty() {
        return if client_name.is_empty() { "." } else { "/" };
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Lexically collapse `.`, `..` and redundant separators without touching
/// the filesystem. `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !path.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn root() -> (tempfile::TempDir, RootDirectory) {
        let temp = tempdir().unwrap();
        let root = RootDirectory::create(temp.path()).unwrap();
        (temp, root)
    }

    #[test]
    fn test_rejects_reserved_names() {
        let (_temp, root) = root();
        for name in ["", ".", ".."] {
            assert!(root.resolve(name).is_err(), "accepted {:?}", name);
        }
    }

    #[test]
    fn test_rejects_separators() {
        let (_temp, root) = root();
        for name in [
            "/",
            "\\",
            "a/b",
            "a\\b",
            "../etc/passwd",
            "..\\secret",
            "/etc/passwd",
            "C:\\Windows",
            "trailing/",
            "./file",
        ] {
            assert!(root.resolve(name).is_err(), "accepted {:?}", name);
        }
    }

    #[test]
    fn test_rejects_null_bytes() {
        let (_temp, root) = root();
        assert!(root.resolve("foo\0bar").is_err());
    }

    #[test]
    fn test_resolves_directly_under_root() {
        let (_temp, root) = root();
        for name in ["report.txt", "...", "..hidden", ".env", "with space.bin", "ünïcödé"] {
            let resolved = root.resolve(name).unwrap();
            assert_eq!(resolved.parent(), Some(root.path()), "name {:?}", name);
            assert_eq!(resolved.file_name().unwrap(), name);
        }
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("report.txt"), "report.txt");
        assert_eq!(base_name("/home/user/report.txt"), "report.txt");
        assert_eq!(base_name("../../etc/passwd"), "passwd");
        assert_eq!(base_name("dir/sub/"), "sub");
        assert_eq!(base_name("C:\\Users\\me\\x.txt"), "C:\\Users\\me\\x.txt");
        assert_eq!(base_name("a/.."), "..");
        assert_eq!(base_name("///"), "/");
        assert_eq!(base_name(""), ".");
    }

    #[test]
    fn test_base_name_then_resolve() {
        let (_temp, root) = root();
        assert!(root.resolve(base_name("../../etc/passwd")).is_ok());
        for client_name in ["", "/", "a/..", "x/.", "C:\\evil.txt"] {
            assert!(root.resolve(base_name(client_name)).is_err(), "accepted {:?}", client_name);
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b//c/../d")), PathBuf::from("/a/b/d"));
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_create_makes_missing_directory() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("nested").join("served");
        let root = RootDirectory::create(&target).unwrap();
        assert!(root.path().is_dir());
        assert!(root.path().is_absolute());
    }

    #[test]
    fn test_create_normalizes_root() {
        let temp = tempdir().unwrap();
        let messy = temp.path().join("x").join("..").join("served");
        let root = RootDirectory::create(&messy).unwrap();
        assert_eq!(root.path(), temp.path().join("served"));
    }
}
