//! Backend Registry module.
//!
//! Provides thread-safe in-memory storage of storage backends and their
//! declared capabilities.

mod backend;
mod error;
pub mod region;

pub use backend::*;
pub use error::*;
pub use region::GeoPoint;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// The Backend Registry stores all known storage backends.
///
/// Uses a sharded concurrent map (DashMap) so the read-mostly selection path
/// never waits on a single global lock.
///
/// # Examples
///
/// ```
/// use conduit::registry::{BackendCapabilities, Registry};
///
/// let registry = Registry::new();
/// registry.register("ipfs", BackendCapabilities::default()).unwrap();
/// registry.register("s3", BackendCapabilities::default()).unwrap();
///
/// assert_eq!(registry.list_available(&[]).unwrap(), vec!["ipfs", "s3"]);
/// ```
pub struct Registry {
    backends: DashMap<String, Backend>,
}

impl Registry {
    /// Create a new empty Registry.
    pub fn new() -> Self {
        Self {
            backends: DashMap::new(),
        }
    }

    /// Register a new backend.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateBackend` if the id is already registered,
    /// `EmptyBackendId` for a blank id, or `InvalidCapabilities` when declared
    /// values are out of range.
    pub fn register(
        &self,
        id: &str,
        capabilities: BackendCapabilities,
    ) -> Result<(), RegistryError> {
        let id = Self::checked_id(id)?;
        capabilities
            .validate()
            .map_err(|message| RegistryError::InvalidCapabilities {
                id: id.to_string(),
                message,
            })?;

        match self.backends.entry(id.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateBackend(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Backend::new(id, capabilities, RegistrationSource::Manual));
                tracing::info!(backend_id = %id, "Registered backend");
                Ok(())
            }
        }
    }

    /// Insert or replace a backend's capabilities.
    ///
    /// Used by configuration reloads. Returns `true` if the backend was newly
    /// created. A lazily created backend is promoted to `Manual`.
    pub fn upsert(&self, id: &str, capabilities: BackendCapabilities) -> Result<bool, RegistryError> {
        let id = Self::checked_id(id)?;
        capabilities
            .validate()
            .map_err(|message| RegistryError::InvalidCapabilities {
                id: id.to_string(),
                message,
            })?;

        match self.backends.entry(id.to_string()) {
            Entry::Occupied(mut existing) => {
                let backend = existing.get_mut();
                backend.capabilities = capabilities;
                backend.source = RegistrationSource::Manual;
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(Backend::new(id, capabilities, RegistrationSource::Manual));
                Ok(true)
            }
        }
    }

    /// Remove a backend from the registry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::BackendNotFound` if no backend with the given ID exists.
    pub fn deregister(&self, id: &str) -> Result<Backend, RegistryError> {
        let backend = self
            .backends
            .remove(id)
            .map(|(_, backend)| backend)
            .ok_or_else(|| RegistryError::BackendNotFound(id.to_string()))?;

        tracing::info!(backend_id = %id, "Deregistered backend");
        Ok(backend)
    }

    /// Make sure a backend exists, creating a lazy entry if it does not.
    ///
    /// Returns `true` if the backend was created by this call.
    pub fn ensure_registered(&self, id: &str) -> Result<bool, RegistryError> {
        let id = Self::checked_id(id)?;
        match self.backends.entry(id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(Backend::lazy(id));
                Ok(true)
            }
        }
    }

    /// List registered backend ids, lexicographically ordered.
    ///
    /// An empty `filter` returns every registered id. A non-empty filter
    /// returns the registered subset of it and fails with
    /// `RegistryError::NoAvailableBackends` when that subset is empty.
    pub fn list_available(&self, filter: &[String]) -> Result<Vec<String>, RegistryError> {
        let mut ids: Vec<String> = if filter.is_empty() {
            self.backends.iter().map(|entry| entry.key().clone()).collect()
        } else {
            filter
                .iter()
                .filter(|id| self.backends.contains_key(id.as_str()))
                .cloned()
                .collect()
        };
        ids.sort();
        ids.dedup();

        if !filter.is_empty() && ids.is_empty() {
            return Err(RegistryError::NoAvailableBackends {
                requested: filter.to_vec(),
            });
        }
        Ok(ids)
    }

    /// Get a backend by ID (cloned).
    pub fn get(&self, id: &str) -> Option<Backend> {
        self.backends.get(id).map(|entry| entry.value().clone())
    }

    /// Declared capabilities of a backend (cloned).
    pub fn capabilities(&self, id: &str) -> Option<BackendCapabilities> {
        self.backends
            .get(id)
            .map(|entry| entry.value().capabilities.clone())
    }

    /// Whether a backend with this id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.backends.contains_key(id)
    }

    /// All registered backends, ordered by id.
    pub fn all(&self) -> Vec<Backend> {
        let mut backends: Vec<Backend> = self
            .backends
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        backends.sort_by(|a, b| a.id.cmp(&b.id));
        backends
    }

    /// Get the number of registered backends.
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    fn checked_id(id: &str) -> Result<&str, RegistryError> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            Err(RegistryError::EmptyBackendId)
        } else {
            Ok(trimmed)
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
