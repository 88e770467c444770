use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::VfsError;

/// Chunk size used when draining a stream of unknown remaining length.
const DRAIN_CHUNK: usize = 8 * 1024;

/// A readable byte stream produced by a [`FileSource`](crate::FileSource).
///
/// Positions are absolute byte offsets from the start of the stream.
/// Streams that cannot reposition (archive extraction streams) return
/// [`VfsError::SeekUnsupported`] from [`seek`](InputStream::seek).
pub trait InputStream: Send {
    /// Read up to `dst.len()` bytes, returning how many were read.
    ///
    /// `Ok(0)` means end of stream (or an empty `dst`).
    fn read(&mut self, dst: &mut [u8]) -> Result<usize, VfsError>;

    /// Move the cursor to `offset`, measured from the current position when
    /// `relative` is set and from the start otherwise. Returns the new position.
    fn seek(&mut self, offset: i64, relative: bool) -> Result<u64, VfsError>;

    /// Current cursor position.
    fn tell(&self) -> u64;

    /// Total stream length in bytes.
    fn length(&self) -> u64;
}

/// A writable byte stream produced by [`FileSource::write`](crate::FileSource::write).
pub trait OutputStream: Send {
    /// Write up to `src.len()` bytes, returning how many were written.
    fn write(&mut self, src: &[u8]) -> Result<usize, VfsError>;

    /// Push buffered bytes to the underlying storage.
    fn flush(&mut self) -> Result<(), VfsError>;

    /// Number of bytes in the stream after the last write.
    fn tell(&self) -> u64;
}

fn seek_target(pos: u64, offset: i64, relative: bool) -> Result<u64, VfsError> {
    let base = if relative { pos as i128 } else { 0 };
    let target = base + offset as i128;
    u64::try_from(target).map_err(|_| {
        VfsError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("seek to negative position {target}"),
        ))
    })
}

/// Read-only stream over a file on disk.
pub struct FileInputStream {
    file: File,
    pos: u64,
    len: u64,
}

impl FileInputStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VfsError> {
        let file = File::open(path.as_ref())?;
        let metadata = file.metadata()?;
        if metadata.is_dir() {
            return Err(VfsError::NotFound(format!(
                "{} is a directory",
                path.as_ref().display()
            )));
        }
        Ok(Self {
            file,
            pos: 0,
            len: metadata.len(),
        })
    }
}

impl InputStream for FileInputStream {
    fn read(&mut self, dst: &mut [u8]) -> Result<usize, VfsError> {
        let n = self.file.read(dst)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: i64, relative: bool) -> Result<u64, VfsError> {
        let target = seek_target(self.pos, offset, relative)?;
        self.pos = self.file.seek(SeekFrom::Start(target))?;
        Ok(self.pos)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn length(&self) -> u64 {
        self.len
    }
}

/// Write stream over a file on disk.
///
/// Missing parent directories are created on open.
pub struct FileOutputStream {
    file: File,
    pos: u64,
}

impl FileOutputStream {
    /// Open `path` for writing, truncating it unless `append` is set.
    pub fn create(path: impl AsRef<Path>, append: bool) -> Result<Self, VfsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options.open(path)?;
        let pos = if append { file.metadata()?.len() } else { 0 };
        Ok(Self { file, pos })
    }
}

impl OutputStream for FileOutputStream {
    fn write(&mut self, src: &[u8]) -> Result<usize, VfsError> {
        let n = self.file.write(src)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), VfsError> {
        self.file.flush()?;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.pos
    }
}

/// Seekable stream over an owned byte buffer.
///
/// Useful for opening archives that are already in memory (embedded assets,
/// downloaded bundles).
pub struct MemoryInputStream {
    data: Vec<u8>,
    pos: u64,
}

impl MemoryInputStream {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl InputStream for MemoryInputStream {
    fn read(&mut self, dst: &mut [u8]) -> Result<usize, VfsError> {
        let start = (self.pos as usize).min(self.data.len());
        let n = dst.len().min(self.data.len() - start);
        dst[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: i64, relative: bool) -> Result<u64, VfsError> {
        self.pos = seek_target(self.pos, offset, relative)?;
        Ok(self.pos)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn length(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Read everything from the current position to the end of the stream.
pub fn read_tail(stream: &mut dyn InputStream) -> Result<Vec<u8>, VfsError> {
    let remaining = stream.length().saturating_sub(stream.tell());
    let mut out = Vec::with_capacity(usize::try_from(remaining).unwrap_or(0));
    let mut chunk = [0u8; DRAIN_CHUNK];
    loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(out)
}

/// Fill `dst` with the bytes at absolute `offset`.
///
/// Fails with an `UnexpectedEof` IO error if the stream ends first.
pub fn read_exact_at(
    stream: &mut dyn InputStream,
    offset: u64,
    dst: &mut [u8],
) -> Result<(), VfsError> {
    let offset = i64::try_from(offset).map_err(|_| {
        VfsError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "offset out of range",
        ))
    })?;
    stream.seek(offset, false)?;
    let mut filled = 0;
    while filled < dst.len() {
        let n = stream.read(&mut dst[filled..])?;
        if n == 0 {
            return Err(VfsError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("stream ended after {filled} of {} bytes", dst.len()),
            )));
        }
        filled += n;
    }
    Ok(())
}

/// Write all of `src`, retrying short writes.
pub fn write_all(stream: &mut dyn OutputStream, mut src: &[u8]) -> Result<(), VfsError> {
    while !src.is_empty() {
        let n = stream.write(src)?;
        if n == 0 {
            return Err(VfsError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "stream accepted no bytes",
            )));
        }
        src = &src[n..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scheme_vfs_stream_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn memory_read_and_tell() {
        let mut stream = MemoryInputStream::new(b"hello world".to_vec());
        let mut buf = [0u8; 5];
        assert_eq!(stream.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(stream.tell(), 5);
        assert_eq!(stream.length(), 11);
    }

    #[test]
    fn memory_seek_absolute_and_relative() {
        let mut stream = MemoryInputStream::new(b"0123456789".to_vec());
        assert_eq!(stream.seek(4, false).unwrap(), 4);
        assert_eq!(stream.seek(-2, true).unwrap(), 2);
        assert_eq!(read_tail(&mut stream).unwrap(), b"23456789");
    }

    #[test]
    fn memory_seek_negative_fails() {
        let mut stream = MemoryInputStream::new(b"abc".to_vec());
        assert!(stream.seek(-1, false).is_err());
        assert_eq!(stream.tell(), 0);
    }

    #[test]
    fn memory_read_past_end_returns_zero() {
        let mut stream = MemoryInputStream::new(b"abc".to_vec());
        stream.seek(10, false).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn read_exact_at_reads_window() {
        let mut stream = MemoryInputStream::new(b"0123456789".to_vec());
        let mut buf = [0u8; 3];
        read_exact_at(&mut stream, 6, &mut buf).unwrap();
        assert_eq!(&buf, b"678");
    }

    #[test]
    fn read_exact_at_short_read_fails() {
        let mut stream = MemoryInputStream::new(b"0123".to_vec());
        let mut buf = [0u8; 3];
        let err = read_exact_at(&mut stream, 2, &mut buf).unwrap_err();
        assert!(matches!(err, VfsError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn file_write_then_read() {
        let dir = temp_dir("write_read");
        let path = dir.join("nested/out.bin");

        let mut out = FileOutputStream::create(&path, false).unwrap();
        write_all(&mut out, b"payload").unwrap();
        out.flush().unwrap();
        assert_eq!(out.tell(), 7);
        drop(out);

        let mut input = FileInputStream::open(&path).unwrap();
        assert_eq!(input.length(), 7);
        assert_eq!(read_tail(&mut input).unwrap(), b"payload");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_append_keeps_existing_bytes() {
        let dir = temp_dir("append");
        let path = dir.join("log.txt");
        std::fs::write(&path, b"one").unwrap();

        let mut out = FileOutputStream::create(&path, true).unwrap();
        assert_eq!(out.tell(), 3);
        write_all(&mut out, b"two").unwrap();
        drop(out);

        assert_eq!(std::fs::read(&path).unwrap(), b"onetwo");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_open_missing_is_not_found() {
        let dir = temp_dir("missing");
        let result = FileInputStream::open(dir.join("nope.txt"));
        assert!(matches!(result, Err(VfsError::NotFound(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_open_directory_fails() {
        let dir = temp_dir("dir_open");
        assert!(FileInputStream::open(&dir).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
