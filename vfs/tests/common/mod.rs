//! Shared helpers for VFS integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

#[path = "../../src/archive/testing.rs"]
mod zip_writer;

pub(crate) use zip_writer::ZipBuilder;

/// Route `log` output through env_logger; safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fresh scratch directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scheme_vfs_it_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
