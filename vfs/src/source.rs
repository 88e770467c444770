use crate::error::VfsError;
use crate::stream::{InputStream, OutputStream};

/// Trait for storage backends registered under a scheme.
///
/// Sources implement byte-level I/O for paths that have already been
/// resolved by the [`Vfs`](crate::Vfs): the scheme prefix and every alias
/// have been stripped, so `path` is relative to the source.
///
/// # Capabilities
///
/// All sources implement the read operations (`exists`, `open`, `load`).
/// [`write`](FileSource::write) defaults to [`VfsError::ReadOnly`]. Sources
/// that accept writes override it and return `false` from
/// [`is_read_only()`](FileSource::is_read_only).
///
/// # Validity
///
/// A source that failed to initialize (for example an archive whose
/// central directory could not be parsed) reports `valid() == false`. The
/// registry refuses to register invalid sources.
pub trait FileSource: Send + Sync + 'static {
    /// Whether the source initialized successfully.
    fn valid(&self) -> bool {
        true
    }

    /// Check whether a file exists at the given path.
    fn exists(&self, path: &str) -> bool;

    /// Open a file for streaming reads.
    fn open(&self, path: &str) -> Result<Box<dyn InputStream>, VfsError>;

    /// Read the entire contents of a file.
    fn load(&self, path: &str) -> Result<Vec<u8>, VfsError>;

    /// Whether this source is read-only.
    fn is_read_only(&self) -> bool {
        true
    }

    /// Open a file for writing, creating it if missing.
    ///
    /// Existing content is truncated unless `append` is set.
    fn write(&self, _path: &str, _append: bool) -> Result<Box<dyn OutputStream>, VfsError> {
        Err(VfsError::ReadOnly)
    }
}
