use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use polars::prelude::DataFrame;
use tracing::debug;

use crate::utils::logging::{self, FileIOType, OperationCategory};

/// Identity of a loaded source: where it is, what it looked like on disk when
/// it was read, and which filter (state, sheet) was applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    path: PathBuf,
    modified: Option<SystemTime>,
    len: u64,
    variant: String,
}

impl SourceKey {
    /// Keys a file by its metadata, or a directory by the newest modification
    /// time and total size of the files directly inside it.
    pub fn for_path(path: &Path, variant: impl Into<String>) -> io::Result<Self> {
        let path = fs::canonicalize(path)?;
        let metadata = fs::metadata(&path)?;

        let (modified, len) = if metadata.is_dir() {
            let mut newest = metadata.modified().ok();
            let mut total = 0u64;
            for entry in fs::read_dir(&path)? {
                let entry_meta = entry?.metadata()?;
                if entry_meta.is_file() {
                    total += entry_meta.len();
                    newest = newest.max(entry_meta.modified().ok());
                }
            }
            (newest, total)
        } else {
            (metadata.modified().ok(), metadata.len())
        };

        Ok(Self {
            path,
            modified,
            len,
            variant: variant.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Loaded tables shared across passes. Entries are never mutated; a changed
/// source produces a different key.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: RwLock<HashMap<SourceKey, Arc<DataFrame>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SourceKey) -> Option<Arc<DataFrame>> {
        self.entries.read().get(key).cloned()
    }

    /// Returns the cached table for `key`, loading and storing it on a miss.
    pub fn get_or_load<F, E>(&self, key: SourceKey, load: F) -> Result<Arc<DataFrame>, E>
    where
        F: FnOnce() -> Result<DataFrame, E>,
    {
        let _timing = logging::start_timing("cache_get_or_load",
            OperationCategory::FileIO { subcategory: FileIOType::CacheLookup });

        if let Some(table) = self.get(&key) {
            debug!("Cache hit for {}", key.path.display());
            return Ok(table);
        }

        debug!("Cache miss for {}", key.path.display());
        let table = Arc::new(load()?);
        let mut entries = self.entries.write();
        Ok(entries.entry(key).or_insert(table).clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use std::cell::Cell;

    fn one_row_frame(value: f64) -> DataFrame {
        df!["ano" => ["2020"], "v" => [value]].unwrap()
    }

    #[test]
    fn loads_once_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dados.csv");
        fs::write(&file, "ano;v\n2020;1\n").unwrap();

        let cache = TableCache::new();
        let loads = Cell::new(0);
        for _ in 0..3 {
            let key = SourceKey::for_path(&file, "MS").unwrap();
            let table = cache
                .get_or_load(key, || -> Result<DataFrame, io::Error> {
                    loads.set(loads.get() + 1);
                    Ok(one_row_frame(1.0))
                })
                .unwrap();
            assert_eq!(table.height(), 1);
        }
        assert_eq!(loads.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn variant_and_size_change_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dados.csv");
        fs::write(&file, "a").unwrap();

        let ms = SourceKey::for_path(&file, "MS").unwrap();
        assert_ne!(ms, SourceKey::for_path(&file, "MT").unwrap());

        fs::write(&file, "abc").unwrap();
        assert_ne!(ms, SourceKey::for_path(&file, "MS").unwrap());
    }

    #[test]
    fn failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let key = SourceKey::for_path(dir.path(), "").unwrap();
        let cache = TableCache::new();
        let result = cache.get_or_load(key, || Err::<DataFrame, _>("broken"));
        assert_eq!(result.unwrap_err(), "broken");
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_path_has_no_key() {
        assert!(SourceKey::for_path(Path::new("/nonexistent/file.csv"), "").is_err());
    }
}
