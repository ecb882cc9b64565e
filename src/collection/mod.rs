// Collection I/O - one JSON file holds the whole ordered record sequence

use crate::error::Result;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A file-backed collection of records. The whole file is the unit of
/// durability: persisting writes a staging file and atomically renames it
/// over the live one, so a reader never observes a partial collection.
///
/// `update` is the single mutation path: it holds the collection's write
/// lock across the load -> mutate -> persist cycle, so concurrent logical
/// operations against the same collection are linearized instead of
/// overwriting each other's effects.
pub struct Collection<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Collection {
            path: dir.join(file_name),
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// Load every record, preserving file order. A collection whose backing
    /// file does not exist yet (or is empty) is an empty collection, not an
    /// error.
    pub fn load(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Replace the whole collection. All-or-nothing: the records are written
    /// to a staging file in the same directory and swapped into place.
    pub fn persist(&self, records: &[T]) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut staging = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut staging, records)?;
        staging.flush()?;
        staging.persist(&self.path).map_err(|e| e.error)?;

        log::debug!("persisted {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Run one logical load -> mutate -> persist cycle under the collection's
    /// write lock. Persists only if `f` succeeds; on error nothing is written.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<T>) -> Result<R>) -> Result<R> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;
        let out = f(&mut records)?;
        self.persist(&records)?;
        Ok(out)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: String,
        n: u32,
    }

    fn row(id: &str, n: u32) -> Row {
        Row { id: id.into(), n }
    }

    #[test]
    fn test_missing_file_is_empty_collection() {
        let tmp = TempDir::new().unwrap();
        let col: Collection<Row> = Collection::new(tmp.path(), "rows.json");
        assert_eq!(col.load().unwrap(), vec![]);
    }

    #[test]
    fn test_empty_file_is_empty_collection() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("rows.json"), "  \n").unwrap();
        let col: Collection<Row> = Collection::new(tmp.path(), "rows.json");
        assert_eq!(col.load().unwrap(), vec![]);
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let col: Collection<Row> = Collection::new(tmp.path(), "rows.json");

        col.persist(&[row("a", 1), row("b", 2)]).unwrap();
        assert_eq!(col.load().unwrap(), vec![row("a", 1), row("b", 2)]);
    }

    #[test]
    fn test_load_preserves_order() {
        let tmp = TempDir::new().unwrap();
        let col: Collection<Row> = Collection::new(tmp.path(), "rows.json");

        let rows: Vec<Row> = (0..50).map(|n| row(&format!("r{n}"), n)).collect();
        col.persist(&rows).unwrap();
        assert_eq!(col.load().unwrap(), rows);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("rows.json"), "{not json").unwrap();
        let col: Collection<Row> = Collection::new(tmp.path(), "rows.json");
        assert!(col.load().is_err());
    }

    #[test]
    fn test_update_persists_on_ok() {
        let tmp = TempDir::new().unwrap();
        let col: Collection<Row> = Collection::new(tmp.path(), "rows.json");

        col.update(|rows| {
            rows.push(row("a", 1));
            Ok(())
        })
        .unwrap();

        assert_eq!(col.load().unwrap(), vec![row("a", 1)]);
    }

    #[test]
    fn test_update_writes_nothing_on_error() {
        let tmp = TempDir::new().unwrap();
        let col: Collection<Row> = Collection::new(tmp.path(), "rows.json");
        col.persist(&[row("a", 1)]).unwrap();

        let result: Result<()> = col.update(|rows| {
            rows.push(row("b", 2));
            Err(crate::error::StoreError::Conflict("nope".into()))
        });
        assert!(result.is_err());

        // The failed mutation must not be visible
        assert_eq!(col.load().unwrap(), vec![row("a", 1)]);
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        use std::sync::Arc;

        let tmp = TempDir::new().unwrap();
        let col: Arc<Collection<Row>> = Arc::new(Collection::new(tmp.path(), "rows.json"));
        col.persist(&[row("a", 0)]).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let col = Arc::clone(&col);
                std::thread::spawn(move || {
                    col.update(|rows| {
                        rows[0].n += 1;
                        Ok(())
                    })
                    .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Lost updates would leave n below 8
        assert_eq!(col.load().unwrap()[0].n, 8);
    }
}
