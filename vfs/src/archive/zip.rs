//! Zip32 central-directory reader over an arbitrary [`InputStream`].
//!
//! The archive never holds the whole file in memory. Every byte it needs is
//! pulled from the backing stream through [`ZipArchive::read_at`], which
//! seeks to an absolute offset and fills the destination buffer.
//!
//! # Supported
//! - Zip32 (EOCD + central directory), single disk.
//! - Entries: stored (method 0) and deflate (method 8).
//!
//! # Not Supported
//! - Zip64 (sentinel 0xFFFF/0xFFFFFFFF fields).
//! - Encrypted entries (flag bit 0).

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::VfsError;
use crate::stream::{InputStream, read_exact_at};

const SIG_EOCD: u32 = 0x0605_4b50;
const SIG_CDFH: u32 = 0x0201_4b50;
const SIG_LFH: u32 = 0x0403_4b50;

const EOCD_MIN_LEN: usize = 22;
const EOCD_SEARCH_MAX: usize = 66 * 1024; // 64 KiB comment + header margin

/// Central directory fixed header length.
const CDFH_LEN: usize = 46;
/// Local file header fixed length.
const LFH_LEN: usize = 30;

const METHOD_STORED: u16 = 0;
pub(crate) const METHOD_DEFLATE: u16 = 8;

const FLAG_ENCRYPTED: u16 = 0x0001;

#[inline]
fn le_u16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

#[inline]
fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn malformed(msg: impl Into<String>) -> VfsError {
    VfsError::MalformedArchive(msg.into())
}

/// Central-directory metadata for a single entry.
#[derive(Debug, Clone)]
pub(crate) struct ZipEntry {
    pub name: String,
    pub flags: u16,
    pub method: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
}

impl ZipEntry {
    fn is_encrypted(&self) -> bool {
        (self.flags & FLAG_ENCRYPTED) != 0
    }
}

/// Parsed central directory plus the stream it was read from.
///
/// Shared behind an `Arc` by the [`ArchiveSource`](super::ArchiveSource)
/// and every extraction stream, so the backing stream lives as long as
/// the last reader.
pub(crate) struct ZipArchive {
    stream: Mutex<Box<dyn InputStream>>,
    len: u64,
    entries: Vec<ZipEntry>,
    by_name: HashMap<String, usize>,
}

impl ZipArchive {
    /// Parse the central directory of the archive held by `stream`.
    pub fn open(stream: Box<dyn InputStream>) -> Result<Self, VfsError> {
        let len = stream.length();
        let archive = Self {
            stream: Mutex::new(stream),
            len,
            entries: Vec::new(),
            by_name: HashMap::new(),
        };
        archive.read_directory()
    }

    fn read_directory(mut self) -> Result<Self, VfsError> {
        if self.len < EOCD_MIN_LEN as u64 {
            return Err(malformed(format!("{} bytes is too short", self.len)));
        }

        // Read tail window and find the EOCD record.
        let win_len = usize::try_from(self.len).map_or(EOCD_SEARCH_MAX, |l| l.min(EOCD_SEARCH_MAX));
        let win_off = self.len - win_len as u64;
        let mut win = vec![0u8; win_len];
        self.read_at(win_off, &mut win)?;

        let eocd_rel = find_eocd(&win).ok_or_else(|| malformed("end of central directory not found"))?;
        let eocd = &win[eocd_rel..];

        let disk_no = le_u16(&eocd[4..6]);
        let cd_disk = le_u16(&eocd[6..8]);
        let entries_disk = le_u16(&eocd[8..10]);
        let entries_total = le_u16(&eocd[10..12]);
        let cd_size = le_u32(&eocd[12..16]);
        let cd_off = le_u32(&eocd[16..20]);

        if disk_no != 0 || cd_disk != 0 || entries_disk != entries_total {
            return Err(VfsError::UnsupportedArchive("multi-disk archive".into()));
        }
        if entries_total == 0xFFFF || cd_size == 0xFFFF_FFFF || cd_off == 0xFFFF_FFFF {
            return Err(VfsError::UnsupportedArchive("zip64 archive".into()));
        }

        let cd_off = u64::from(cd_off);
        let cd_end = cd_off + u64::from(cd_size);
        if cd_end > win_off + eocd_rel as u64 {
            return Err(malformed("central directory overlaps end record"));
        }

        let mut cd = vec![0u8; cd_size as usize];
        self.read_at(cd_off, &mut cd)?;

        self.entries.reserve(entries_total as usize);
        let mut pos = 0usize;
        for _ in 0..entries_total {
            let (entry, rec_len) = parse_cdfh(&cd[pos..], self.len)?;
            pos += rec_len;
            // The first record wins when names repeat.
            let index = self.entries.len();
            self.by_name.entry(entry.name.clone()).or_insert(index);
            self.entries.push(entry);
        }

        log::debug!(
            "Opened archive: {} entries, central directory at {cd_off}",
            self.entries.len()
        );
        Ok(self)
    }

    /// Pull `dst.len()` bytes from the backing stream at absolute `offset`.
    pub fn read_at(&self, offset: u64, dst: &mut [u8]) -> Result<(), VfsError> {
        let mut stream = self.stream.lock();
        read_exact_at(stream.as_mut(), offset, dst)
    }

    pub fn entry(&self, name: &str) -> Option<&ZipEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Locate the payload of `entry` as an absolute `[start, end)` range.
    ///
    /// Reads the local header, since its name and extra lengths may differ
    /// from the central directory copy.
    pub fn data_range(&self, entry: &ZipEntry) -> Result<(u64, u64), VfsError> {
        if entry.is_encrypted() {
            return Err(VfsError::UnsupportedArchive(format!(
                "{} is encrypted",
                entry.name
            )));
        }
        if entry.method != METHOD_STORED && entry.method != METHOD_DEFLATE {
            return Err(VfsError::UnsupportedArchive(format!(
                "{} uses compression method {}",
                entry.name, entry.method
            )));
        }
        if entry.method == METHOD_STORED && entry.compressed_size != entry.uncompressed_size {
            return Err(malformed(format!("{}: stored sizes differ", entry.name)));
        }

        let mut lfh = [0u8; LFH_LEN];
        self.read_at(entry.local_header_offset, &mut lfh)?;
        if le_u32(&lfh[0..4]) != SIG_LFH {
            return Err(malformed(format!("{}: bad local header", entry.name)));
        }

        let name_len = u64::from(le_u16(&lfh[26..28]));
        let extra_len = u64::from(le_u16(&lfh[28..30]));
        let start = entry.local_header_offset + LFH_LEN as u64 + name_len + extra_len;
        let end = start + entry.compressed_size;
        if end > self.len {
            return Err(malformed(format!("{}: payload past end of archive", entry.name)));
        }
        Ok((start, end))
    }
}

/// Find the EOCD record in the tail window, scanning backward.
///
/// A record whose comment ends exactly at the end of the window is
/// preferred, which skips false signatures inside a trailing comment.
/// Failing that, the last record that fits the window is taken, so bytes
/// appended after the archive (padding, signatures) are tolerated.
fn find_eocd(win: &[u8]) -> Option<usize> {
    if win.len() < EOCD_MIN_LEN {
        return None;
    }
    let record_end = |i: usize| i + EOCD_MIN_LEN + le_u16(&win[i + 20..i + 22]) as usize;
    let candidates = || {
        (0..=win.len() - EOCD_MIN_LEN)
            .rev()
            .filter(|&i| le_u32(&win[i..i + 4]) == SIG_EOCD)
    };
    candidates()
        .find(|&i| record_end(i) == win.len())
        .or_else(|| candidates().find(|&i| record_end(i) <= win.len()))
}

/// Parse one central-directory record, returning it and its total length.
fn parse_cdfh(rec: &[u8], archive_len: u64) -> Result<(ZipEntry, usize), VfsError> {
    if rec.len() < CDFH_LEN {
        return Err(malformed("central directory truncated"));
    }
    if le_u32(&rec[0..4]) != SIG_CDFH {
        return Err(malformed("bad central directory signature"));
    }

    let flags = le_u16(&rec[8..10]);
    let method = le_u16(&rec[10..12]);
    let crc32 = le_u32(&rec[16..20]);
    let comp_size = le_u32(&rec[20..24]);
    let uncomp_size = le_u32(&rec[24..28]);
    let name_len = le_u16(&rec[28..30]) as usize;
    let extra_len = le_u16(&rec[30..32]) as usize;
    let comment_len = le_u16(&rec[32..34]) as usize;
    let lfh_off = le_u32(&rec[42..46]);

    if comp_size == 0xFFFF_FFFF || uncomp_size == 0xFFFF_FFFF || lfh_off == 0xFFFF_FFFF {
        return Err(VfsError::UnsupportedArchive("zip64 entry".into()));
    }

    let rec_len = CDFH_LEN + name_len + extra_len + comment_len;
    if rec.len() < rec_len {
        return Err(malformed("central directory record truncated"));
    }
    if u64::from(lfh_off) + LFH_LEN as u64 > archive_len {
        return Err(malformed("local header offset out of range"));
    }

    let name = String::from_utf8_lossy(&rec[CDFH_LEN..CDFH_LEN + name_len]).into_owned();

    Ok((
        ZipEntry {
            name,
            flags,
            method,
            crc32,
            compressed_size: u64::from(comp_size),
            uncompressed_size: u64::from(uncomp_size),
            local_header_offset: u64::from(lfh_off),
        },
        rec_len,
    ))
}
