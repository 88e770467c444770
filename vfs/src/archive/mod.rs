//! ZIP archive file source.
//!
//! An [`ArchiveSource`] presents the entries of a ZIP archive as files. The
//! archive can come from any [`InputStream`]: a file on disk, an in-memory
//! bundle, or a stream opened through another scheme of the same VFS.

mod entry_stream;
#[cfg(test)]
pub(crate) mod testing;
mod zip;

use std::path::Path;
use std::sync::Arc;

pub use entry_stream::ArchiveEntryStream;

use self::zip::ZipArchive;
use crate::error::VfsError;
use crate::source::FileSource;
use crate::stream::{FileInputStream, InputStream, MemoryInputStream, read_tail};

/// Read-only file source over a ZIP archive.
///
/// Construction parses the central directory and never fails outright: if
/// the archive cannot be opened the source is left invalid (see
/// [`valid()`](FileSource::valid)) and every lookup soft-fails. The
/// [`Vfs`](crate::Vfs) refuses to register invalid sources.
///
/// Entry names are matched exactly and case-sensitively.
///
/// # Streams
///
/// [`open`](FileSource::open) returns an [`ArchiveEntryStream`] that shares
/// ownership of the archive, so it keeps working after the source itself
/// is unregistered or dropped. Unlike other sources, opening a missing
/// entry is an error ([`VfsError::NoSuchEntry`]), not an empty result.
///
/// # Example
///
/// ```ignore
/// let vfs = Vfs::new();
/// vfs.register_scheme("pack", ArchiveSource::from_path("data/pack.zip"))?;
/// let bytes = vfs.load(&"pack:textures/brick.png".into());
/// ```
pub struct ArchiveSource {
    archive: Option<Arc<ZipArchive>>,
}

impl ArchiveSource {
    /// Open an archive read from `stream`.
    ///
    /// The stream must report its full [`length()`](InputStream::length) and
    /// support absolute seeks.
    pub fn new(stream: Box<dyn InputStream>) -> Self {
        match ZipArchive::open(stream) {
            Ok(archive) => Self {
                archive: Some(Arc::new(archive)),
            },
            Err(e) => {
                log::warn!("Failed to open archive: {e}");
                Self { archive: None }
            }
        }
    }

    /// Open the archive file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match FileInputStream::open(path.as_ref()) {
            Ok(stream) => Self::new(Box::new(stream)),
            Err(e) => {
                log::warn!("Failed to open archive {}: {e}", path.as_ref().display());
                Self { archive: None }
            }
        }
    }

    /// Open an archive held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(Box::new(MemoryInputStream::new(bytes)))
    }

    /// Names of all entries in central-directory order.
    ///
    /// Empty for an invalid source.
    pub fn entry_names(&self) -> Vec<String> {
        self.archive
            .as_ref()
            .map(|a| a.entries().iter().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }

    fn archive(&self) -> Result<&Arc<ZipArchive>, VfsError> {
        self.archive
            .as_ref()
            .ok_or_else(|| VfsError::InvalidSource("archive failed to open".into()))
    }
}

impl FileSource for ArchiveSource {
    fn valid(&self) -> bool {
        self.archive.is_some()
    }

    fn exists(&self, path: &str) -> bool {
        self.archive
            .as_ref()
            .is_some_and(|a| a.entry(path).is_some())
    }

    fn open(&self, path: &str) -> Result<Box<dyn InputStream>, VfsError> {
        let archive = self.archive()?.clone();
        Ok(Box::new(ArchiveEntryStream::open(archive, path)?))
    }

    fn load(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        let archive = self.archive()?.clone();
        let mut stream = ArchiveEntryStream::open(archive, path)?;
        read_tail(&mut stream)
    }
}
