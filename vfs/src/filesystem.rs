use std::path::PathBuf;

use crate::error::VfsError;
use crate::source::FileSource;
use crate::stream::{FileInputStream, FileOutputStream, InputStream, OutputStream};

/// File source backed by the native filesystem.
///
/// Without a root, VFS paths are used as real paths verbatim, so
/// `file:///tmp/a.txt` reads `/tmp/a.txt`. With a root the VFS path is
/// joined onto it. Aliases are the usual way to give a rooted view:
///
/// ```ignore
/// let vfs = Vfs::new();
/// vfs.register_scheme("file", FilesystemSource::new())?;
/// vfs.register_scheme_alias("assets", Url::new("file", "./assets"))?;
///
/// // Reads ./assets/textures/brick.png
/// let bytes = vfs.load(&"assets:textures/brick.png".into());
/// ```
pub struct FilesystemSource {
    root: Option<PathBuf>,
}

impl FilesystemSource {
    /// Create a source that uses VFS paths as real paths.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Create a source rooted at the given directory.
    ///
    /// The directory does not need to exist yet; it is checked at
    /// read/write time.
    ///
    /// The root is a prefix, not a sandbox. Paths are joined verbatim, so
    /// `..` segments can reach files outside the root, and so can an
    /// absolute path on Windows with a drive prefix.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.trim_start_matches('/')),
            None => PathBuf::from(path),
        }
    }
}

impl Default for FilesystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSource for FilesystemSource {
    fn exists(&self, path: &str) -> bool {
        std::fs::metadata(self.resolve(path)).is_ok_and(|m| m.is_file())
    }

    fn open(&self, path: &str) -> Result<Box<dyn InputStream>, VfsError> {
        Ok(Box::new(FileInputStream::open(self.resolve(path))?))
    }

    fn load(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        Ok(std::fs::read(self.resolve(path))?)
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn write(&self, path: &str, append: bool) -> Result<Box<dyn OutputStream>, VfsError> {
        Ok(Box::new(FileOutputStream::create(self.resolve(path), append)?))
    }
}
