use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use super::lock::{InProcessLockManager, LockManager};
use super::Directory;
use crate::error::{LuceneError, LuceneResult};
use crate::store::{IndexInput, IndexOutput, RamIndexInput, RamIndexOutput};

struct Entry {
    bytes: Arc<RwLock<Vec<u8>>>,
    mtime: SystemTime,
}

/// In-process, in-memory directory; `lock`/`unlock` are no-ops beyond the
/// in-process refcounting in `InProcessLockManager` since a `RamDirectory`
/// is single-process by construction. Used by unit tests and by callers
/// that want a scratch index.
#[derive(Default)]
pub struct RamDirectory {
    files: RwLock<HashMap<String, Entry>>,
    locks: Arc<InProcessLockManager>,
}

impl RamDirectory {
    pub fn new() -> Self {
        RamDirectory {
            files: RwLock::new(HashMap::new()),
            locks: Arc::new(InProcessLockManager::new()),
        }
    }
}

impl Directory for RamDirectory {
    fn list(&self) -> LuceneResult<Vec<String>> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn exists(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }

    fn length(&self, name: &str) -> LuceneResult<u64> {
        self.files
            .read()
            .get(name)
            .map(|e| e.bytes.read().len() as u64)
            .ok_or_else(|| LuceneError::file_not_found(name))
    }

    fn mtime(&self, name: &str) -> LuceneResult<SystemTime> {
        self.files
            .read()
            .get(name)
            .map(|e| e.mtime)
            .ok_or_else(|| LuceneError::file_not_found(name))
    }

    fn touch(&self, name: &str) -> LuceneResult<()> {
        let mut guard = self.files.write();
        let entry = guard
            .get_mut(name)
            .ok_or_else(|| LuceneError::file_not_found(name))?;
        entry.mtime = SystemTime::now();
        Ok(())
    }

    fn delete(&self, name: &str) -> LuceneResult<()> {
        self.files.write().remove(name);
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> LuceneResult<()> {
        let mut guard = self.files.write();
        let entry = guard
            .remove(from)
            .ok_or_else(|| LuceneError::file_not_found(from))?;
        guard.insert(to.to_string(), entry);
        Ok(())
    }

    fn create(&self, name: &str) -> LuceneResult<Box<dyn IndexOutput>> {
        let bytes = Arc::new(RwLock::new(Vec::new()));
        self.files.write().insert(
            name.to_string(),
            Entry {
                bytes: Arc::clone(&bytes),
                mtime: SystemTime::now(),
            },
        );
        Ok(Box::new(RamIndexOutput::new(bytes)))
    }

    fn open(&self, name: &str, _shared: bool) -> LuceneResult<Box<dyn IndexInput>> {
        let bytes = self
            .files
            .read()
            .get(name)
            .map(|e| Arc::clone(&e.bytes))
            .ok_or_else(|| LuceneError::file_not_found(name))?;
        Ok(Box::new(RamIndexInput::new(bytes)))
    }

    fn close(&self) -> LuceneResult<()> {
        Ok(())
    }

    fn lock_manager(&self) -> Arc<dyn LockManager> {
        Arc::clone(&self.locks) as Arc<dyn LockManager>
    }
}
