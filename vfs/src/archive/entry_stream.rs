use std::io::Read;
use std::sync::Arc;

use flate2::Crc;
use flate2::read::DeflateDecoder;

use super::zip::{METHOD_DEFLATE, ZipArchive};
use crate::error::VfsError;
use crate::stream::InputStream;

/// Reader over the raw (still compressed) bytes of one entry.
///
/// Holds the shared archive handle, so the archive and its backing stream
/// outlive every extraction stream built on top of this reader.
struct RawEntryReader {
    archive: Arc<ZipArchive>,
    pos: u64,
    end: u64,
}

impl Read for RawEntryReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.end.saturating_sub(self.pos);
        let n = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        if n == 0 {
            return Ok(0);
        }
        self.archive
            .read_at(self.pos, &mut buf[..n])
            .map_err(std::io::Error::other)?;
        self.pos += n as u64;
        Ok(n)
    }
}

enum EntryReader {
    Stored(RawEntryReader),
    Deflated(DeflateDecoder<RawEntryReader>),
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            EntryReader::Stored(raw) => raw.read(buf),
            EntryReader::Deflated(decoder) => decoder.read(buf),
        }
    }
}

/// Recover the archive error wrapped by [`RawEntryReader`], or describe a
/// decompression failure.
fn pull_error(name: &str, err: std::io::Error) -> VfsError {
    if err.get_ref().is_some_and(|inner| inner.is::<VfsError>()) {
        if let Some(inner) = err.into_inner()
            && let Ok(vfs_err) = inner.downcast::<VfsError>()
        {
            return *vfs_err;
        }
        return VfsError::MalformedArchive(name.to_owned());
    }
    VfsError::MalformedArchive(format!("{name}: {err}"))
}

/// Forward-only decompressing stream over one archive entry.
///
/// Bytes are pulled from the archive on demand as [`read`](InputStream::read)
/// is called. [`seek`](InputStream::seek) always fails with
/// [`VfsError::SeekUnsupported`]; load the entry into memory instead when
/// random access is needed.
///
/// The CRC-32 of the entry is checked once the last byte has been read.
pub struct ArchiveEntryStream {
    reader: EntryReader,
    name: String,
    pos: u64,
    len: u64,
    crc: Crc,
    expected_crc: u32,
}

impl ArchiveEntryStream {
    /// Open the entry `name` of `archive`.
    ///
    /// Fails with [`VfsError::NoSuchEntry`] if the name is not in the
    /// central directory, or with an archive error if the entry cannot be
    /// located or uses an unsupported feature.
    pub(crate) fn open(archive: Arc<ZipArchive>, name: &str) -> Result<Self, VfsError> {
        let entry = archive
            .entry(name)
            .cloned()
            .ok_or_else(|| VfsError::NoSuchEntry(name.to_owned()))?;
        let (start, end) = archive.data_range(&entry)?;

        let raw = RawEntryReader {
            archive,
            pos: start,
            end,
        };
        let reader = if entry.method == METHOD_DEFLATE {
            EntryReader::Deflated(DeflateDecoder::new(raw))
        } else {
            EntryReader::Stored(raw)
        };

        Ok(Self {
            reader,
            name: entry.name,
            pos: 0,
            len: entry.uncompressed_size,
            crc: Crc::new(),
            expected_crc: entry.crc32,
        })
    }

    /// Name of the archive entry this stream reads.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn verify_crc(&self) -> Result<(), VfsError> {
        if self.crc.sum() != self.expected_crc {
            return Err(VfsError::ChecksumMismatch(self.name.clone()));
        }
        Ok(())
    }
}

impl InputStream for ArchiveEntryStream {
    fn read(&mut self, dst: &mut [u8]) -> Result<usize, VfsError> {
        let remaining = self.len - self.pos;
        let want = dst.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        if want == 0 {
            return Ok(0);
        }

        let n = self
            .reader
            .read(&mut dst[..want])
            .map_err(|e| pull_error(&self.name, e))?;
        if n == 0 {
            return Err(VfsError::MalformedArchive(format!(
                "{}: ended after {} of {} bytes",
                self.name, self.pos, self.len
            )));
        }

        self.crc.update(&dst[..n]);
        self.pos += n as u64;
        if self.pos == self.len {
            self.verify_crc()?;
        }
        Ok(n)
    }

    fn seek(&mut self, _offset: i64, _relative: bool) -> Result<u64, VfsError> {
        Err(VfsError::SeekUnsupported)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn length(&self) -> u64 {
        self.len
    }
}
