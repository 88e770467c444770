use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::VfsError;
use crate::source::FileSource;
use crate::stream::{InputStream, MemoryInputStream, OutputStream};

type FileMap = Arc<RwLock<HashMap<String, Vec<u8>>>>;

/// In-memory file source for tests and embedded assets.
///
/// Thread-safe and mutable even after being registered: clones share the
/// same storage, so keep one to insert files after handing the other to
/// the [`Vfs`](crate::Vfs).
///
/// # Example
///
/// ```ignore
/// let mem = MemorySource::new();
/// mem.insert("config/settings.json", b"{}".to_vec());
///
/// let vfs = Vfs::new();
/// vfs.register_scheme("builtin", mem.clone())?;
/// ```
#[derive(Clone, Default)]
pub struct MemorySource {
    files: FileMap,
}

impl MemorySource {
    /// Create an empty in-memory source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file at the given path, overwriting any existing file.
    pub fn insert(&self, path: impl Into<String>, data: Vec<u8>) {
        self.files.write().insert(path.into(), data);
    }

    /// Remove a file at the given path, returning its data if it existed.
    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        self.files.write().remove(path)
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl FileSource for MemorySource {
    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }

    fn open(&self, path: &str) -> Result<Box<dyn InputStream>, VfsError> {
        let data = self.load(path)?;
        Ok(Box::new(MemoryInputStream::new(data)))
    }

    fn load(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(path.to_owned()))
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn write(&self, path: &str, append: bool) -> Result<Box<dyn OutputStream>, VfsError> {
        let data = {
            let mut files = self.files.write();
            let existing = files.entry(path.to_owned()).or_default();
            if append {
                existing.clone()
            } else {
                existing.clear();
                Vec::new()
            }
        };
        Ok(Box::new(MemoryOutputStream {
            files: self.files.clone(),
            path: path.to_owned(),
            data,
        }))
    }
}

/// Buffers writes and publishes them on flush and on drop.
struct MemoryOutputStream {
    files: FileMap,
    path: String,
    data: Vec<u8>,
}

impl OutputStream for MemoryOutputStream {
    fn write(&mut self, src: &[u8]) -> Result<usize, VfsError> {
        self.data.extend_from_slice(src);
        Ok(src.len())
    }

    fn flush(&mut self) -> Result<(), VfsError> {
        self.files.write().insert(self.path.clone(), self.data.clone());
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.data.len() as u64
    }
}

impl Drop for MemoryOutputStream {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.files.write().insert(std::mem::take(&mut self.path), data);
    }
}
