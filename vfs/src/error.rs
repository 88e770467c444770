use thiserror::Error;

use crate::url::Url;

/// Errors that can occur during virtual file system operations.
#[derive(Debug, Error)]
pub enum VfsError {
    /// The requested path was not found in the source.
    #[error("not found: {0}")]
    NotFound(String),
    /// An IO error occurred while accessing a source.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
    /// No source is registered for the scheme.
    #[error("no such scheme: {0}")]
    NoSuchScheme(String),
    /// A source is already registered under this scheme.
    #[error("scheme already registered: {0}")]
    SchemeAlreadyRegistered(String),
    /// An alias is already registered under this scheme.
    #[error("scheme alias already registered: {0}")]
    AliasAlreadyRegistered(String),
    /// The source failed to initialize and cannot serve requests.
    #[error("invalid file source: {0}")]
    InvalidSource(String),
    /// The alias chain starting at this URL is too deep or cyclic.
    #[error("scheme alias resolution exceeded depth {depth} for {url}")]
    AliasDepthExceeded { url: Url, depth: usize },
    /// The source does not support write operations.
    #[error("file source is read-only")]
    ReadOnly,
    /// The stream is forward-only.
    #[error("seek is not supported by this stream")]
    SeekUnsupported,
    /// The archive has no entry with this exact name.
    #[error("no such archive entry: {0}")]
    NoSuchEntry(String),
    /// The archive directory or an entry header is corrupt.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),
    /// The archive uses a feature this reader does not handle.
    #[error("unsupported archive feature: {0}")]
    UnsupportedArchive(String),
    /// Extracted bytes do not match the stored CRC-32.
    #[error("checksum mismatch in archive entry: {0}")]
    ChecksumMismatch(String),
    /// The configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl VfsError {
    /// Whether this error is a protocol violation rather than a soft
    /// "not found" or I/O failure.
    ///
    /// The [`Vfs`](crate::Vfs) facade turns soft failures into `false` or
    /// `None`, but passes operation errors through to the caller of
    /// [`Vfs::open`](crate::Vfs::open).
    pub fn is_operation_error(&self) -> bool {
        matches!(
            self,
            VfsError::AliasDepthExceeded { .. }
                | VfsError::SeekUnsupported
                | VfsError::NoSuchEntry(_)
                | VfsError::MalformedArchive(_)
                | VfsError::UnsupportedArchive(_)
                | VfsError::ChecksumMismatch(_)
                | VfsError::InvalidSource(_)
        )
    }
}

impl From<std::io::Error> for VfsError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            VfsError::NotFound(err.to_string())
        } else {
            VfsError::Io(err)
        }
    }
}
