//! Shared-read / exclusive-write coordination across processes using the
//! directory (`spec.md` §4.1). A read lock is shared and reference-counted,
//! held for the lifetime of every open index; a write lock is exclusive,
//! held by the writer across any mutation of the `segments_N` file or
//! segment-file deletions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{LuceneError, LuceneResult};

/// The coordination primitive backing one directory's locks. Implementors
/// must survive process crash (advisory file locks, or a lockfile with
/// owner-PID recovery for the filesystem backend); a purely in-process
/// implementation (the `RamDirectory`'s) only needs to coordinate within
/// one instance.
pub trait LockManager: Send + Sync {
    /// Acquires (or increments the refcount of) the shared read lock.
    fn acquire_read(&self) -> LuceneResult<()>;
    fn release_read(&self);
    /// Acquires the exclusive write lock. Returns
    /// `LuceneError::Runtime("Can't obtain exclusive index lock")` on
    /// contention (`spec.md` §4.1); callers may retry or fail.
    fn acquire_write(&self) -> LuceneResult<()>;
    fn release_write(&self);
}

/// RAII guard for a shared read lock; releases on drop.
pub struct ReadLockGuard {
    mgr: Arc<dyn LockManager>,
}

impl ReadLockGuard {
    pub fn acquire(mgr: Arc<dyn LockManager>) -> LuceneResult<Self> {
        mgr.acquire_read()?;
        Ok(ReadLockGuard { mgr })
    }
}

impl Drop for ReadLockGuard {
    fn drop(&mut self) {
        self.mgr.release_read();
    }
}

/// RAII guard for the exclusive write lock; releases on drop.
pub struct WriteLockGuard {
    mgr: Arc<dyn LockManager>,
}

impl WriteLockGuard {
    pub fn acquire(mgr: Arc<dyn LockManager>) -> LuceneResult<Self> {
        mgr.acquire_write()?;
        Ok(WriteLockGuard { mgr })
    }
}

impl Drop for WriteLockGuard {
    fn drop(&mut self) {
        self.mgr.release_write();
    }
}

/// In-process lock manager backing `RamDirectory`: a read refcount plus a
/// single write flag, both atomics since several `Index` handles inside one
/// process may share a `RamDirectory`.
#[derive(Default)]
pub struct InProcessLockManager {
    readers: AtomicUsize,
    writer: AtomicUsize,
}

impl InProcessLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockManager for InProcessLockManager {
    fn acquire_read(&self) -> LuceneResult<()> {
        self.readers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release_read(&self) {
        self.readers.fetch_sub(1, Ordering::SeqCst);
    }

    fn acquire_write(&self) -> LuceneResult<()> {
        match self
            .writer
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Ok(()),
            Err(_) => Err(LuceneError::runtime("Can't obtain exclusive index lock")),
        }
    }

    fn release_write(&self) {
        self.writer.store(0, Ordering::SeqCst);
    }
}

/// Filesystem lock manager: the write lock is an advisory OS file lock
/// (`fs4::FileExt::try_lock_exclusive`) on a `write.lock` file under the
/// directory's root, with the holder's PID written into the file so a
/// crashed holder's lock can be identified by an operator (recovery stays
/// advisory — a stale lock is reported, not silently broken). The read lock
/// has no cross-process meaning in Lucene's own design (readers never
/// block writers at the OS level) so it is tracked the same way as
/// `InProcessLockManager` within this process.
pub struct FsLockManager {
    root: std::path::PathBuf,
    in_process: InProcessLockManager,
    held: parking_lot::Mutex<Option<std::fs::File>>,
}

impl FsLockManager {
    pub fn new(root: std::path::PathBuf) -> Self {
        FsLockManager {
            root,
            in_process: InProcessLockManager::new(),
            held: parking_lot::Mutex::new(None),
        }
    }

    fn lock_path(&self) -> std::path::PathBuf {
        self.root.join("write.lock")
    }
}

impl LockManager for FsLockManager {
    fn acquire_read(&self) -> LuceneResult<()> {
        self.in_process.acquire_read()
    }

    fn release_read(&self) {
        self.in_process.release_read();
    }

    fn acquire_write(&self) -> LuceneResult<()> {
        self.in_process.acquire_write()?;
        use fs4::FileExt;
        use std::io::Write;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        if file.try_lock_exclusive().is_err() {
            self.in_process.release_write();
            return Err(LuceneError::runtime("Can't obtain exclusive index lock"));
        }
        let mut f = &file;
        let _ = f.set_len(0);
        let _ = write!(f, "{}", std::process::id());
        // The OS lock is held for as long as this `File` stays open, so we
        // park it here rather than letting it drop; `release_write` closes
        // it (dropping releases the `flock`) and removes the lockfile.
        *self.held.lock() = Some(file);
        Ok(())
    }

    fn release_write(&self) {
        *self.held.lock() = None;
        let _ = std::fs::remove_file(self.lock_path());
        self.in_process.release_write();
    }
}
