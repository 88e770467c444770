use std::sync::{Arc, OnceLock};

use crate::error::VfsError;
use crate::registry::SchemeRegistry;
use crate::source::FileSource;
use crate::stream::{InputStream, OutputStream, read_tail};
use crate::url::Url;
use crate::worker::{TaskHandle, WorkerPool};

/// Virtual file system that routes URLs to registered file sources.
///
/// A URL's scheme selects the source; aliases rewrite one scheme into a
/// URL on another (see [`register_scheme_alias`](Self::register_scheme_alias)).
/// Registration can happen at any time, from any thread.
///
/// `Clone` is cheap (Arc internals). Thread-safe (`Send + Sync`).
///
/// # Failures
///
/// Lookups are forgiving: a missing scheme, a missing file, or an I/O error
/// make [`exists`](Self::exists) return `false` and [`load`](Self::load) or
/// [`write`](Self::write) return `None`. [`open`](Self::open) additionally
/// surfaces operation errors (a missing archive entry, a corrupt archive,
/// an alias chain that is too deep) as `Err`.
///
/// # Example
///
/// ```ignore
/// let vfs = Vfs::new();
/// vfs.register_scheme("assets", FilesystemSource::rooted("./assets"))?;
/// vfs.register_scheme("pack", ArchiveSource::from_path("./data.zip"))?;
/// vfs.register_scheme_alias("tex", Url::new("pack", "textures"))?;
///
/// // Reads entry "textures/brick.png" of ./data.zip
/// let bytes = vfs.load(&"tex://brick.png".into());
///
/// // Same, on the background loader
/// let bytes = vfs.load_async(&"tex://brick.png".into()).recv().flatten();
/// ```
#[derive(Clone)]
pub struct Vfs {
    inner: Arc<VfsInner>,
}

struct VfsInner {
    registry: Arc<SchemeRegistry>,
    // Spawned on first `load_async`. Tasks only capture the registry, so
    // dropping the last `Vfs` can always join the loader thread.
    loader: OnceLock<Option<WorkerPool>>,
}

impl Vfs {
    /// Create an empty VFS with no registered schemes.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(VfsInner {
                registry: Arc::new(SchemeRegistry::new()),
                loader: OnceLock::new(),
            }),
        }
    }

    /// Register `source` under `scheme`.
    ///
    /// Fails with [`VfsError::InvalidSource`] if the source did not
    /// initialize, or [`VfsError::SchemeAlreadyRegistered`] if the scheme
    /// is taken. Unregister first to replace a source.
    pub fn register_scheme(&self, scheme: &str, source: impl FileSource) -> Result<(), VfsError> {
        if let Err(e) = self.inner.registry.register_scheme(scheme, Arc::new(source)) {
            log::warn!("VFS scheme \"{scheme}\" rejected: {e}");
            return Err(e);
        }
        log::info!("VFS scheme registered: \"{scheme}\"");
        Ok(())
    }

    /// Remove the source registered under `scheme`.
    ///
    /// Streams already opened from it stay usable. Returns `false` if the
    /// scheme had no source.
    pub fn unregister_scheme(&self, scheme: &str) -> bool {
        let removed = self.inner.registry.unregister_scheme(scheme);
        if removed {
            log::info!("VFS scheme unregistered: \"{scheme}\"");
        }
        removed
    }

    /// Make `scheme:rest` resolve to `target / rest`.
    ///
    /// The target may itself use an aliased scheme; chains are followed up
    /// to [`MAX_ALIAS_DEPTH`](crate::MAX_ALIAS_DEPTH) hops.
    pub fn register_scheme_alias(&self, scheme: &str, target: Url) -> Result<(), VfsError> {
        let text = target.to_string();
        if let Err(e) = self.inner.registry.register_alias(scheme, target) {
            log::warn!("VFS alias \"{scheme}\" rejected: {e}");
            return Err(e);
        }
        log::info!("VFS alias registered: \"{scheme}\" -> {text}");
        Ok(())
    }

    pub fn unregister_scheme_alias(&self, scheme: &str) -> bool {
        self.inner.registry.unregister_alias(scheme)
    }

    /// Whether a file exists at `url`.
    pub fn exists(&self, url: &Url) -> bool {
        self.source_for(url)
            .is_some_and(|(source, resolved)| source.exists(resolved.path()))
    }

    /// Open the file at `url` for streaming reads.
    ///
    /// Returns `Ok(None)` if there is no such file or no source for its
    /// scheme. Operation errors are returned as `Err`; see
    /// [`VfsError::is_operation_error`].
    pub fn open(&self, url: &Url) -> Result<Option<Box<dyn InputStream>>, VfsError> {
        open_with(&self.inner.registry, url)
    }

    /// Read the entire contents of the file at `url`.
    pub fn load(&self, url: &Url) -> Option<Vec<u8>> {
        let (source, resolved) = self.source_for(url)?;
        match source.load(resolved.path()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::debug!("VFS load of {url} failed: {e}");
                None
            }
        }
    }

    /// Open the file at `url` for writing.
    ///
    /// The file is truncated unless `append` is set. Returns `None` when the
    /// source is read-only or the file cannot be created.
    pub fn write(&self, url: &Url, append: bool) -> Option<Box<dyn OutputStream>> {
        let (source, resolved) = self.source_for(url)?;
        match source.write(resolved.path(), append) {
            Ok(stream) => Some(stream),
            Err(e) => {
                log::debug!("VFS write to {url} failed: {e}");
                None
            }
        }
    }

    /// Load the file at `url` on the background loader thread.
    ///
    /// Both the lookup and the read happen on the loader, one request at a
    /// time in submission order. The handle resolves to `None` on any
    /// failure.
    pub fn load_async(&self, url: &Url) -> TaskHandle<Option<Vec<u8>>> {
        let Some(loader) = self.loader() else {
            return TaskHandle::closed();
        };
        let registry = self.inner.registry.clone();
        let url = url.clone();
        loader.submit(move || load_stream(&registry, &url))
    }

    /// Follow every alias in `url` and return the final URL.
    pub fn resolve_scheme_aliases(&self, url: &Url) -> Result<Url, VfsError> {
        self.inner.registry.resolve(url)
    }

    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.inner.registry.has_scheme(scheme)
    }

    pub fn has_scheme_alias(&self, scheme: &str) -> bool {
        self.inner.registry.has_alias(scheme)
    }

    /// Names registered both as a scheme and as an alias.
    ///
    /// The alias shadows the source for these names.
    pub fn scheme_conflicts(&self) -> Vec<String> {
        self.inner.registry.conflicts()
    }

    /// The underlying registry, for listing schemes and alias targets.
    pub fn registry(&self) -> &SchemeRegistry {
        &self.inner.registry
    }

    /// Check if the source serving `url` is read-only.
    ///
    /// Returns `Err` if the URL cannot be resolved to a source.
    pub fn is_read_only(&self, url: &Url) -> Result<bool, VfsError> {
        let (source, _) = self
            .inner
            .registry
            .lookup(url)?
            .ok_or_else(|| VfsError::NoSuchScheme(url.scheme().to_owned()))?;
        Ok(source.is_read_only())
    }

    fn source_for(&self, url: &Url) -> Option<(Arc<dyn FileSource>, Url)> {
        match self.inner.registry.lookup(url) {
            Ok(Some(found)) => Some(found),
            Ok(None) => {
                log::debug!("VFS has no scheme for {url}");
                None
            }
            Err(e) => {
                log::warn!("{e}");
                None
            }
        }
    }

    fn loader(&self) -> Option<&WorkerPool> {
        self.inner
            .loader
            .get_or_init(|| match WorkerPool::new("vfs-loader", 1) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    log::error!("Failed to start VFS loader thread: {e}");
                    None
                }
            })
            .as_ref()
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

fn open_with(
    registry: &SchemeRegistry,
    url: &Url,
) -> Result<Option<Box<dyn InputStream>>, VfsError> {
    let Some((source, resolved)) = registry.lookup(url)? else {
        log::debug!("VFS has no scheme for {url}");
        return Ok(None);
    };
    match source.open(resolved.path()) {
        Ok(stream) => Ok(Some(stream)),
        Err(e) if e.is_operation_error() => Err(e),
        Err(e) => {
            log::debug!("VFS open of {url} failed: {e}");
            Ok(None)
        }
    }
}

fn load_stream(registry: &SchemeRegistry, url: &Url) -> Option<Vec<u8>> {
    match open_with(registry, url) {
        Ok(Some(mut stream)) => match read_tail(stream.as_mut()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("VFS async load of {url} failed: {e}");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            log::warn!("VFS async load of {url} failed: {e}");
            None
        }
    }
}
