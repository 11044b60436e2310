//! Redb backend for persistent galleries.
//!
//! Every mutation is its own write transaction, so a record is either fully
//! committed or absent after a crash.

use crate::{GalleryBackend, GalleryError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const GALLERY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("rollcall_gallery");

/// Redb-backed key-value storage. Redb does its own locking (MVCC), so the
/// handle is shared through an `Arc` without extra synchronization.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create a database at `path`.
    ///
    /// ```no_run
    /// use gallery::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/gallery.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GalleryError> {
        let db = Database::create(path).map_err(GalleryError::backend)?;

        let write_txn = db.begin_write().map_err(GalleryError::backend)?;
        {
            // Opening the table inside a write txn creates it.
            let _table = write_txn
                .open_table(GALLERY_TABLE)
                .map_err(GalleryError::backend)?;
        }
        write_txn.commit().map_err(GalleryError::backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl GalleryBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), GalleryError> {
        let write_txn = self.db.begin_write().map_err(GalleryError::backend)?;
        {
            let mut table = write_txn
                .open_table(GALLERY_TABLE)
                .map_err(GalleryError::backend)?;
            table.insert(key, value).map_err(GalleryError::backend)?;
        }
        write_txn.commit().map_err(GalleryError::backend)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, GalleryError> {
        let read_txn = self.db.begin_read().map_err(GalleryError::backend)?;
        let table = read_txn
            .open_table(GALLERY_TABLE)
            .map_err(GalleryError::backend)?;

        match table.get(key).map_err(GalleryError::backend)? {
            Some(value) => Ok(Some(value.value().to_vec())),
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<(), GalleryError> {
        let write_txn = self.db.begin_write().map_err(GalleryError::backend)?;
        {
            let mut table = write_txn
                .open_table(GALLERY_TABLE)
                .map_err(GalleryError::backend)?;
            table.remove(key).map_err(GalleryError::backend)?;
        }
        write_txn.commit().map_err(GalleryError::backend)?;
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), GalleryError>,
    ) -> Result<(), GalleryError> {
        let read_txn = self.db.begin_read().map_err(GalleryError::backend)?;
        let table = read_txn
            .open_table(GALLERY_TABLE)
            .map_err(GalleryError::backend)?;

        for item in table.iter().map_err(GalleryError::backend)? {
            let (key, value) = item.map_err(GalleryError::backend)?;
            visitor(key.value(), value.value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn redb_roundtrip_and_delete() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(temp_file.path()).unwrap();

        backend.put("S001", b"value1").unwrap();
        assert_eq!(backend.get("S001").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(backend.get("S404").unwrap(), None);

        backend.delete("S001").unwrap();
        assert_eq!(backend.get("S001").unwrap(), None);
    }

    #[test]
    fn redb_scan_yields_keys_in_order() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(temp_file.path()).unwrap();

        backend.put("S002", b"b").unwrap();
        backend.put("S001", b"a").unwrap();

        let mut keys = Vec::new();
        backend
            .scan(&mut |key, _| {
                keys.push(key.to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(keys, vec!["S001", "S002"]);
    }

    #[test]
    fn reopen_sees_committed_data() {
        let temp_file = NamedTempFile::new().unwrap();
        {
            let backend = RedbBackend::open(temp_file.path()).unwrap();
            backend.put("S001", b"persisted").unwrap();
        }
        let backend = RedbBackend::open(temp_file.path()).unwrap();
        assert_eq!(backend.get("S001").unwrap(), Some(b"persisted".to_vec()));
    }
}
