//! Durable key/value storage backends.
//!
//! Keys are fixed strings (`store.json`, `store.wal`, flag names). A backend
//! must have flushed a write to durable storage before returning `Ok`.

use crate::Result;
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Storage backend trait
pub trait Storage: Send {
    /// Read the value under `key`, `None` when absent
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Atomically replace the value under `key`
    fn write(&mut self, key: &str, contents: &str) -> Result<()>;

    /// Append one line to the value under `key`, creating it if needed
    fn append_line(&mut self, key: &str, line: &str) -> Result<()>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.read(key)?.is_some())
    }
}

// ============================================================================
// File storage
// ============================================================================

/// One file per key inside a data directory, guarded by file locks
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `dir` (created lazily on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key {:?}", key),
            )
            .into());
        }
        Ok(self.dir.join(key))
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Acquire shared lock for reading
        file.lock_shared()?;
        let mut contents = String::new();
        let read = io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        tracing::trace!("Read {} bytes from {:?}", contents.len(), path);
        Ok(Some(contents))
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<()> {
        let path = self.path_for(key)?;
        self.ensure_dir()?;

        // Temp file in the same directory so the rename stays atomic
        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = io::BufWriter::new(temp.as_file());
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&path).map_err(|e| e.error)?;

        tracing::debug!("Wrote {:?}", path);
        Ok(())
    }

    fn append_line(&mut self, key: &str, line: &str) -> Result<()> {
        let path = self.path_for(key)?;
        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        file.lock_exclusive()?;

        let result = (|| -> io::Result<()> {
            // A torn tail from an earlier crash must not swallow this line
            let torn = ends_without_newline(&file)?;
            let mut writer = io::BufWriter::new(&file);
            if torn {
                writer.write_all(b"\n")?;
            }
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            drop(writer);
            file.sync_data()
        })();

        file.unlock()?;
        result?;

        tracing::debug!("Appended {} bytes to {:?}", line.len() + 1, path);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Removed {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key)?.exists())
    }
}

fn ends_without_newline(mut file: &File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

// ============================================================================
// Memory storage
// ============================================================================

/// In-memory storage; clones share the same contents
///
/// Opening a second store over a clone behaves like reloading the app.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as a full or disabled disk would
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "storage quota exceeded").into());
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<()> {
        self.check_writable()?;
        self.lock().insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn append_line(&mut self, key: &str, line: &str) -> Result<()> {
        self.check_writable()?;
        let mut entries = self.lock();
        let value = entries.entry(key.to_string()).or_default();
        if !value.is_empty() && !value.ends_with('\n') {
            value.push('\n');
        }
        value.push_str(line);
        value.push('\n');
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_file_write_and_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(temp_dir.path().join("data"));

        assert_eq!(storage.read("store.json").unwrap(), None);
        storage.write("store.json", "{}").unwrap();
        assert_eq!(storage.read("store.json").unwrap().as_deref(), Some("{}"));
        assert!(storage.contains("store.json").unwrap());
    }

    #[test]
    fn test_file_write_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(temp_dir.path());

        storage.write("store.json", "first").unwrap();
        storage.write("store.json", "second").unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "store.json")
            .collect();
        assert!(extras.is_empty(), "Unexpected files: {:?}", extras);
        assert_eq!(storage.read("store.json").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_append_after_torn_tail() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("store.wal"), "{\"op\":\"wor").unwrap();
        let mut storage = FileStorage::new(temp_dir.path());

        storage.append_line("store.wal", "next").unwrap();

        let contents = storage.read("store.wal").unwrap().unwrap();
        assert_eq!(contents.lines().last(), Some("next"));
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_file_append_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(temp_dir.path());

        for i in 0..3 {
            storage.append_line("store.wal", &format!("line {}", i)).unwrap();
        }

        let contents = storage.read("store.wal").unwrap().unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.ends_with("line 2\n"));
    }

    #[test]
    fn test_file_remove_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(temp_dir.path());

        storage.write("FLAG", "1").unwrap();
        storage.remove("FLAG").unwrap();
        storage.remove("FLAG").unwrap();
        assert!(!storage.contains("FLAG").unwrap());
    }

    #[test]
    fn test_file_rejects_path_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(temp_dir.path());

        let err = storage.write("../escape", "x").unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)));
    }

    #[test]
    fn test_memory_clones_share_contents() {
        let mut a = MemoryStorage::new();
        let b = a.clone();

        a.write("k", "v").unwrap();
        assert_eq!(b.read("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_memory_unavailable_fails_writes() {
        let mut storage = MemoryStorage::new();
        storage.write("k", "v").unwrap();
        storage.set_unavailable(true);

        assert!(matches!(
            storage.append_line("k", "more"),
            Err(Error::StorageUnavailable(_))
        ));
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("v"));
    }
}
