use crate::GalleryError;
use std::collections::HashMap;
use std::sync::RwLock;

/// Key-value storage behind a [`crate::Gallery`].
///
/// Keys are identity ids, values are records in the versioned storage form
/// produced by [`crate::codec::encode_record`].
pub trait GalleryBackend: Send + Sync {
    /// Insert or replace the value for `key`.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), GalleryError>;
    /// Retrieve a value by key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, GalleryError>;
    /// Delete a key; deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), GalleryError>;
    /// Visit every stored `(key, value)` pair.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), GalleryError>,
    ) -> Result<(), GalleryError>;
    /// Flush any buffered writes.
    fn flush(&self) -> Result<(), GalleryError> {
        Ok(())
    }
}

/// Selects and builds a backend.
///
/// ```
/// use gallery::BackendConfig;
///
/// let ephemeral = BackendConfig::in_memory();
/// let on_disk = BackendConfig::redb("/var/lib/rollcall/gallery.redb");
/// # let _ = (ephemeral, on_disk);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// Ephemeral `HashMap` storage; the gallery is lost when the process exits.
    #[default]
    InMemory,
    /// Redb file at `path`. Requires the `backend-redb` feature.
    Redb { path: String },
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Box<dyn GalleryBackend>, GalleryError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(GalleryError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// An in-memory backend using a `RwLock` around a `HashMap`.
#[derive(Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GalleryBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), GalleryError> {
        self.records
            .write()
            .map_err(|_| GalleryError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, GalleryError> {
        let guard = self
            .records
            .read()
            .map_err(|_| GalleryError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), GalleryError> {
        self.records
            .write()
            .map_err(|_| GalleryError::backend("poisoned lock"))?
            .remove(key);
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), GalleryError>,
    ) -> Result<(), GalleryError> {
        let guard = self
            .records
            .read()
            .map_err(|_| GalleryError::backend("poisoned lock"))?;
        for (key, value) in guard.iter() {
            visitor(key, value)?;
        }
        Ok(())
    }
}

#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbBackend;
