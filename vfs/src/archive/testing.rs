//! Deterministic in-memory zip builder for tests.
//!
//! Output is Zip32-only with fixed timestamps and explicit sizes (no data
//! descriptors). The unit tests and the integration tests both build their
//! archives with this file, so it depends on nothing but `flate2`.

use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

const SIG_LFH: u32 = 0x0403_4b50;
const SIG_CDFH: u32 = 0x0201_4b50;
const SIG_EOCD: u32 = 0x0605_4b50;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

pub(crate) fn deflate(payload: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap()
}

pub(crate) fn crc32(payload: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(payload);
    crc.sum()
}

struct Entry {
    name: Vec<u8>,
    method: u16,
    data: Vec<u8>,
    uncompressed_size: u32,
    crc: u32,
}

#[derive(Default)]
pub(crate) struct ZipBuilder {
    entries: Vec<Entry>,
    comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, payload: &[u8]) -> Self {
        self.raw_entry(
            name,
            METHOD_STORED,
            payload,
            payload.len() as u32,
            crc32(payload),
        )
    }

    pub fn deflated(self, name: &str, payload: &[u8]) -> Self {
        self.raw_entry(
            name,
            METHOD_DEFLATE,
            &deflate(payload),
            payload.len() as u32,
            crc32(payload),
        )
    }

    /// Add an entry with caller-controlled header fields.
    pub fn raw_entry(
        mut self,
        name: &str,
        method: u16,
        data: &[u8],
        uncompressed_size: u32,
        crc: u32,
    ) -> Self {
        self.entries.push(Entry {
            name: name.as_bytes().to_vec(),
            method,
            data: data.to_vec(),
            uncompressed_size,
            crc,
        });
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn finish(self) -> Vec<u8> {
        fn u16le(v: u16) -> [u8; 2] {
            v.to_le_bytes()
        }
        fn u32le(v: u32) -> [u8; 4] {
            v.to_le_bytes()
        }

        let mut out = Vec::new();
        let mut cd = Vec::new();

        for entry in &self.entries {
            let local_off = out.len() as u32;

            out.extend_from_slice(&u32le(SIG_LFH));
            out.extend_from_slice(&u16le(20));
            out.extend_from_slice(&u16le(0));
            out.extend_from_slice(&u16le(entry.method));
            out.extend_from_slice(&u16le(0));
            out.extend_from_slice(&u16le(0));
            out.extend_from_slice(&u32le(entry.crc));
            out.extend_from_slice(&u32le(entry.data.len() as u32));
            out.extend_from_slice(&u32le(entry.uncompressed_size));
            out.extend_from_slice(&u16le(entry.name.len() as u16));
            out.extend_from_slice(&u16le(0));
            out.extend_from_slice(&entry.name);
            out.extend_from_slice(&entry.data);

            cd.extend_from_slice(&u32le(SIG_CDFH));
            cd.extend_from_slice(&u16le(20));
            cd.extend_from_slice(&u16le(20));
            cd.extend_from_slice(&u16le(0));
            cd.extend_from_slice(&u16le(entry.method));
            cd.extend_from_slice(&u16le(0));
            cd.extend_from_slice(&u16le(0));
            cd.extend_from_slice(&u32le(entry.crc));
            cd.extend_from_slice(&u32le(entry.data.len() as u32));
            cd.extend_from_slice(&u32le(entry.uncompressed_size));
            cd.extend_from_slice(&u16le(entry.name.len() as u16));
            cd.extend_from_slice(&u16le(0));
            cd.extend_from_slice(&u16le(0));
            cd.extend_from_slice(&u16le(0));
            cd.extend_from_slice(&u16le(0));
            cd.extend_from_slice(&u32le(0));
            cd.extend_from_slice(&u32le(local_off));
            cd.extend_from_slice(&entry.name);
        }

        let cd_start = out.len() as u32;
        out.extend_from_slice(&cd);

        out.extend_from_slice(&u32le(SIG_EOCD));
        out.extend_from_slice(&u16le(0));
        out.extend_from_slice(&u16le(0));
        out.extend_from_slice(&u16le(self.entries.len() as u16));
        out.extend_from_slice(&u16le(self.entries.len() as u16));
        out.extend_from_slice(&u32le(cd.len() as u32));
        out.extend_from_slice(&u32le(cd_start));
        out.extend_from_slice(&u16le(self.comment.len() as u16));
        out.extend_from_slice(&self.comment);

        out
    }
}
