//! Output file access.
//!
//! The exporter never touches `std::fs` directly so that tests can run
//! against [`MemoryFileSystem`].

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::{Arc, RwLock};

pub trait FileSystem: Sync {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
    /// Moves `from` to `to`, replacing `to` if it exists.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        std::fs::write(path, data)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Keeps all files in a shared map keyed by their lossy path string.
#[derive(Default, Clone)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.get(path).cloned()
    }

    /// Sorted list of every stored path.
    pub fn list_files(&self) -> Vec<String> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.keys().cloned().collect()
    }
}

fn key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("File not found: {path}"))
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path_str = key(path);
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.get(&path_str).cloned().ok_or_else(|| not_found(&path_str))
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files.insert(key(path), data.to_vec());
        Ok(())
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.contains_key(&key(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_str = key(from);
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        let data = files.remove(&from_str).ok_or_else(|| not_found(&from_str))?;
        files.insert(key(to), data);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let path_str = key(path);
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files
            .remove(&path_str)
            .map(|_| ())
            .ok_or_else(|| not_found(&path_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(not(target_family = "wasm"))]
    use testdir::testdir;

    #[test]
    fn test_memory_fs_write_read() {
        let fs = MemoryFileSystem::new();
        let path = Path::new("/out/scene.gltf");

        fs.write_file(path, b"{}").unwrap();

        assert!(fs.exists(path));
        assert_eq!(fs.read_file(path).unwrap(), b"{}");
    }

    #[test]
    fn test_memory_fs_rename_replaces_target() {
        let fs = MemoryFileSystem::new();
        fs.write_file(Path::new("/a.partial"), b"new").unwrap();
        fs.write_file(Path::new("/a"), b"old").unwrap();

        fs.rename(Path::new("/a.partial"), Path::new("/a")).unwrap();

        assert!(!fs.exists(Path::new("/a.partial")));
        assert_eq!(fs.get_file("/a"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_memory_fs_rename_missing_file() {
        let fs = MemoryFileSystem::new();
        let error = fs
            .rename(Path::new("/missing"), Path::new("/b"))
            .unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_memory_fs_remove_file() {
        let fs = MemoryFileSystem::new();
        fs.write_file(Path::new("/x.bin"), &[1, 2, 3]).unwrap();
        fs.remove_file(Path::new("/x.bin")).unwrap();
        assert!(fs.list_files().is_empty());
    }

    #[test]
    #[cfg(not(target_family = "wasm"))]
    fn test_real_fs_write_rename_remove() {
        let test_dir = testdir!();
        let fs = RealFileSystem;
        let staged = test_dir.join("scene.glb.partial");
        let target = test_dir.join("scene.glb");

        fs.write_file(&staged, b"glTF").unwrap();
        fs.rename(&staged, &target).unwrap();
        assert!(!fs.exists(&staged));
        assert_eq!(fs.read_file(&target).unwrap(), b"glTF");

        fs.remove_file(&target).unwrap();
        assert!(!fs.exists(&target));
    }
}
