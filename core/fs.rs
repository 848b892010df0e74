//! Filesystem capabilities the walker needs: `stat`, `read_dir`, `read_file`.
//!
//! The walker never calls `std::fs` directly so that tests can substitute
//! [`MemoryFileSystem`] for the real disk.

use indexmap::IndexMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub is_dir: bool,
    pub len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: OsString,
    pub path: PathBuf,
    /// Taken from the listing itself; symlinks are not followed.
    pub is_dir: bool,
}

pub trait FileSystem {
    fn stat(&self, path: &Path) -> io::Result<Metadata>;

    /// Lists the direct children of `path`. Order is unspecified.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        let meta = fs::metadata(path)?;
        Ok(Metadata {
            is_dir: meta.is_dir(),
            len: meta.len(),
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let is_dir = entry.file_type()?.is_dir();
            entries.push(DirEntry {
                name: entry.file_name(),
                path: entry.path(),
                is_dir,
            });
        }
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Dir { listable: bool },
    File { data: Vec<u8>, readable: bool },
}

/// In-memory filesystem. Listings come back in insertion order, so callers
/// that need a stable order must sort for themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    nodes: IndexMap<PathBuf, Node>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        self.ensure_parents(path);
        self.nodes
            .entry(path.to_path_buf())
            .or_insert(Node::Dir { listable: true });
        self
    }

    /// Adds a directory that can be stat'ed but fails to list.
    pub fn add_unlistable_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        self.ensure_parents(path);
        self.nodes
            .insert(path.to_path_buf(), Node::Dir { listable: false });
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.insert_file(path.as_ref(), data.into(), true)
    }

    /// Adds a file that can be listed and stat'ed but fails to read with
    /// `PermissionDenied`.
    pub fn add_unreadable_file(
        &mut self,
        path: impl AsRef<Path>,
        data: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.insert_file(path.as_ref(), data.into(), false)
    }

    fn insert_file(&mut self, path: &Path, data: Vec<u8>, readable: bool) -> &mut Self {
        self.ensure_parents(path);
        self.nodes
            .insert(path.to_path_buf(), Node::File { data, readable });
        self
    }

    fn ensure_parents(&mut self, path: &Path) {
        let mut ancestors: Vec<&Path> = path
            .ancestors()
            .skip(1)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        ancestors.reverse();
        for dir in ancestors {
            self.nodes
                .entry(dir.to_path_buf())
                .or_insert(Node::Dir { listable: true });
        }
    }

    fn node(&self, path: &Path) -> io::Result<&Node> {
        self.nodes.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file or directory: {}", path.display()),
            )
        })
    }
}

impl FileSystem for MemoryFileSystem {
    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        Ok(match self.node(path)? {
            Node::Dir { .. } => Metadata {
                is_dir: true,
                len: 0,
            },
            Node::File { data, .. } => Metadata {
                is_dir: false,
                len: data.len() as u64,
            },
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        match self.node(path)? {
            Node::Dir { listable: true } => {}
            Node::Dir { listable: false } => {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "permission denied",
                ));
            }
            Node::File { .. } => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("not a directory: {}", path.display()),
                ));
            }
        }
        let entries = self
            .nodes
            .iter()
            .filter(|(child, _)| child.parent() == Some(path))
            .filter_map(|(child, node)| {
                let name = match child.components().next_back()? {
                    Component::Normal(name) => name.to_os_string(),
                    _ => return None,
                };
                Some(DirEntry {
                    name,
                    path: child.clone(),
                    is_dir: matches!(node, Node::Dir { .. }),
                })
            })
            .collect();
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.node(path)? {
            Node::File {
                data,
                readable: true,
            } => Ok(data.clone()),
            Node::File {
                readable: false, ..
            } => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            )),
            Node::Dir { .. } => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("is a directory: {}", path.display()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_creates_parent_directories() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/src/lib.rs", "fn main() {}");

        assert!(fs.stat(Path::new("/proj")).unwrap().is_dir);
        assert!(fs.stat(Path::new("/proj/src")).unwrap().is_dir);
        let meta = fs.stat(Path::new("/proj/src/lib.rs")).unwrap();
        assert!(!meta.is_dir);
        assert_eq!(meta.len, 12);
    }

    #[test]
    fn memory_fs_lists_direct_children_in_insertion_order() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/proj/b.txt", "b")
            .add_file("/proj/a/nested.txt", "n")
            .add_file("/proj/c.txt", "c");

        let names: Vec<_> = fs
            .read_dir(Path::new("/proj"))
            .unwrap()
            .into_iter()
            .map(|e| (e.name.to_string_lossy().into_owned(), e.is_dir))
            .collect();
        assert_eq!(
            names,
            vec![
                ("b.txt".to_string(), false),
                ("a".to_string(), true),
                ("c.txt".to_string(), false),
            ]
        );
    }

    #[test]
    fn memory_fs_unreadable_file_fails_only_on_read() {
        let mut fs = MemoryFileSystem::new();
        fs.add_unreadable_file("/proj/locked.txt", "secret");

        assert_eq!(fs.stat(Path::new("/proj/locked.txt")).unwrap().len, 6);
        let err = fs.read_file(Path::new("/proj/locked.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn memory_fs_missing_path_is_not_found() {
        let fs = MemoryFileSystem::new();
        let err = fs.stat(Path::new("/nowhere")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(fs.read_dir(Path::new("/nowhere")).is_err());
    }

    #[test]
    fn memory_fs_unlistable_dir_fails_to_list() {
        let mut fs = MemoryFileSystem::new();
        fs.add_unlistable_dir("/proj/private");

        assert!(fs.stat(Path::new("/proj/private")).unwrap().is_dir);
        let err = fs.read_dir(Path::new("/proj/private")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn os_fs_reads_real_directory() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        std::fs::create_dir(tmp.path().join("sub")).expect("mkdir");
        std::fs::write(tmp.path().join("a.txt"), "hello").expect("write");

        let fs = OsFileSystem;
        let mut entries = fs.read_dir(tmp.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert!(!entries[0].is_dir);
        assert_eq!(entries[1].name, "sub");
        assert!(entries[1].is_dir);
        assert_eq!(fs.read_file(&tmp.path().join("a.txt")).unwrap(), b"hello");
        assert_eq!(fs.stat(&tmp.path().join("a.txt")).unwrap().len, 5);
    }
}
