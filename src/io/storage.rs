use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Byte storage behind the block store. The block store only tracks which
/// blocks a path occupies; contents live here.
pub trait Storage {
    fn write(&mut self, path: &str, bytes: &[u8]) -> io::Result<()>;

    /// `Ok(None)` when nothing is stored at `path`.
    fn read(&self, path: &str) -> io::Result<Option<Vec<u8>>>;

    /// Removing a missing path is not an error.
    fn remove(&mut self, path: &str) -> io::Result<()>;
}

/// Stores each path as a file under `base_dir`, creating directories as needed.
#[derive(Debug, Clone)]
pub struct DirStorage {
    base_dir: PathBuf,
}

impl DirStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> DirStorage {
        DirStorage {
            base_dir: base_dir.into(),
        }
    }

    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));

        if path.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path {:?} must be relative and stay inside the drive", path),
            ));
        }

        Ok(self.base_dir.join(relative))
    }
}

impl Storage for DirStorage {
    fn write(&mut self, path: &str, bytes: &[u8]) -> io::Result<()> {
        let full_path = self.resolve(path)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full_path, bytes)
    }

    fn read(&self, path: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.resolve(path)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn remove(&mut self, path: &str) -> io::Result<()> {
        match fs::remove_file(self.resolve(path)?) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// Keeps contents in a map. Used by tests and by runs that should not touch disk.
#[derive(Debug, Clone, Default)]
pub struct MemStorage {
    files: HashMap<String, Vec<u8>>,
}

impl MemStorage {
    pub fn new() -> MemStorage {
        MemStorage::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Storage for MemStorage {
    fn write(&mut self, path: &str, bytes: &[u8]) -> io::Result<()> {
        self.files.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, path: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }

    fn remove(&mut self, path: &str) -> io::Result<()> {
        self.files.remove(path);
        Ok(())
    }
}
