use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::VfsError;
use crate::source::FileSource;
use crate::url::Url;

/// Maximum number of alias hops followed while resolving a URL.
pub const MAX_ALIAS_DEPTH: usize = 32;

#[derive(Default)]
struct RegistryState {
    aliases: HashMap<String, Url>,
    schemes: HashMap<String, Arc<dyn FileSource>>,
}

impl RegistryState {
    /// Follow aliases until the scheme has none.
    ///
    /// More than [`MAX_ALIAS_DEPTH`] hops is an error, which also catches
    /// cycles of any length.
    fn resolve(&self, url: &Url) -> Result<Url, VfsError> {
        let mut current = url.clone();
        for _ in 0..=MAX_ALIAS_DEPTH {
            match self.aliases.get(current.scheme()) {
                Some(target) => current = target / current.path(),
                None => return Ok(current),
            }
        }
        Err(VfsError::AliasDepthExceeded {
            url: url.clone(),
            depth: MAX_ALIAS_DEPTH,
        })
    }
}

/// Thread-safe mapping from scheme names to file sources and alias targets.
///
/// Sources and aliases live in separate namespaces. When a scheme has both,
/// the alias wins during resolution; such schemes are reported by
/// [`conflicts()`](Self::conflicts) and logged as a warning when the second
/// entry is registered.
///
/// Every operation takes the same lock for its whole duration. Lookups
/// clone the matched source out so that I/O happens after the lock is
/// released.
#[derive(Default)]
pub struct SchemeRegistry {
    state: Mutex<RegistryState>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under `scheme`.
    ///
    /// Fails if the source is not [`valid`](FileSource::valid) or if the
    /// scheme already has a source. The existing source is left in place.
    pub fn register_scheme(
        &self,
        scheme: &str,
        source: Arc<dyn FileSource>,
    ) -> Result<(), VfsError> {
        if !source.valid() {
            return Err(VfsError::InvalidSource(scheme.to_owned()));
        }
        let mut state = self.state.lock();
        if state.schemes.contains_key(scheme) {
            return Err(VfsError::SchemeAlreadyRegistered(scheme.to_owned()));
        }
        if state.aliases.contains_key(scheme) {
            log::warn!("Scheme \"{scheme}\" also has an alias; the alias takes precedence");
        }
        state.schemes.insert(scheme.to_owned(), source);
        Ok(())
    }

    /// Remove the source registered under `scheme`.
    ///
    /// Returns `false` if there was none. Streams and in-flight operations
    /// that already hold the source keep it alive until they finish.
    pub fn unregister_scheme(&self, scheme: &str) -> bool {
        self.state.lock().schemes.remove(scheme).is_some()
    }

    /// Register `scheme` as an alias for `target`.
    ///
    /// `scheme:rest` then resolves to `target / rest`.
    pub fn register_alias(&self, scheme: &str, target: Url) -> Result<(), VfsError> {
        let mut state = self.state.lock();
        if state.aliases.contains_key(scheme) {
            return Err(VfsError::AliasAlreadyRegistered(scheme.to_owned()));
        }
        if state.schemes.contains_key(scheme) {
            log::warn!("Alias \"{scheme}\" shadows a registered scheme of the same name");
        }
        state.aliases.insert(scheme.to_owned(), target);
        Ok(())
    }

    /// Remove the alias registered under `scheme`. Returns `false` if there was none.
    pub fn unregister_alias(&self, scheme: &str) -> bool {
        self.state.lock().aliases.remove(scheme).is_some()
    }

    /// Resolve every alias in `url`.
    pub fn resolve(&self, url: &Url) -> Result<Url, VfsError> {
        self.state.lock().resolve(url)
    }

    /// Resolve `url` and fetch the source for the resolved scheme.
    ///
    /// Returns `Ok(None)` if no source is registered for it.
    pub fn lookup(&self, url: &Url) -> Result<Option<(Arc<dyn FileSource>, Url)>, VfsError> {
        let state = self.state.lock();
        let resolved = state.resolve(url)?;
        Ok(state
            .schemes
            .get(resolved.scheme())
            .cloned()
            .map(|source| (source, resolved)))
    }

    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.state.lock().schemes.contains_key(scheme)
    }

    pub fn has_alias(&self, scheme: &str) -> bool {
        self.state.lock().aliases.contains_key(scheme)
    }

    /// The URL `scheme` is aliased to, if any.
    pub fn alias_target(&self, scheme: &str) -> Option<Url> {
        self.state.lock().aliases.get(scheme).cloned()
    }

    /// Sorted names of schemes with a registered source.
    pub fn scheme_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().schemes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted names of registered aliases.
    pub fn alias_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().aliases.keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted names that have both a source and an alias.
    pub fn conflicts(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state
            .aliases
            .keys()
            .filter(|name| state.schemes.contains_key(*name))
            .cloned()
            .collect();
        names.sort();
        names
    }
}
