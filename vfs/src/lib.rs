//! Scheme-based virtual file system.
//!
//! Files are addressed by [`Url`]s of the form `scheme://path`. Each scheme
//! is served by a [`FileSource`] registered on a [`Vfs`]; a scheme can also
//! be an alias that rewrites URLs onto another scheme and base path.
//!
//! ```ignore
//! let vfs = Vfs::new();
//! vfs.register_scheme("assets", FilesystemSource::rooted("./assets"))?;
//! vfs.register_scheme("pack", ArchiveSource::from_path("./assets/pack.zip"))?;
//! vfs.register_scheme_alias("tex", Url::new("pack", "textures"))?;
//!
//! let bytes = vfs.load(&"tex://brick.png".into());
//! let pending = vfs.load_async(&"assets://level1.json".into());
//! ```
//!
//! # Sources
//!
//! - [`FilesystemSource`]: Native filesystem access (read-write, native only)
//! - [`ArchiveSource`]: Entries of a ZIP archive (read-only)
//! - [`MemorySource`]: In-memory storage for tests and embedded assets (read-write)
//!
//! Custom sources implement the [`FileSource`] trait. Write support is
//! optional and defaults to [`VfsError::ReadOnly`].
//!
//! # Threading
//!
//! Every `Vfs` operation is synchronous and may be called from any thread.
//! [`Vfs::load_async`] queues the load on a single background thread per
//! `Vfs` and returns a [`TaskHandle`] that can be polled, waited on, or
//! awaited.
//!
//! # Configuration
//!
//! A `Vfs` can be described in TOML and built with [`load_config`] and
//! [`build_vfs`]. See [`VfsConfig`] for the format.

mod archive;
mod config;
mod error;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
mod filesystem;
mod memory;
pub mod path;
mod registry;
mod source;
mod stream;
mod url;
mod vfs;
mod worker;

pub use archive::{ArchiveEntryStream, ArchiveSource};
pub use config::{AliasConfig, SchemeConfig, VfsConfig, build_vfs, load_config, load_or_default};
pub use error::VfsError;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
pub use filesystem::FilesystemSource;
pub use memory::MemorySource;
pub use registry::{MAX_ALIAS_DEPTH, SchemeRegistry};
pub use source::FileSource;
pub use stream::{
    FileInputStream, FileOutputStream, InputStream, MemoryInputStream, OutputStream, read_tail,
    write_all,
};
pub use url::{DEFAULT_SCHEME, Url};
pub use vfs::Vfs;
pub use worker::{TaskHandle, WorkerPool};
