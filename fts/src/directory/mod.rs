//! Namespaced byte-file store (`spec.md` §4.1): `Directory` is the
//! "concrete byte-stream adapter" the spec calls an external collaborator,
//! but the core still needs *a* minimal implementation to run and be
//! tested, so this crate ships `FsDirectory` (mmap-backed files under one
//! root path) and `RamDirectory` (in-process, for scratch indexes and
//! tests).

pub mod fs;
pub mod lock;
pub mod ram;

pub use fs::FsDirectory;
pub use lock::{LockManager, ReadLockGuard, WriteLockGuard};
pub use ram::RamDirectory;

use std::sync::Arc;
use std::time::SystemTime;

use crate::error::LuceneResult;
use crate::store::{IndexInput, IndexOutput};

/// A flat namespace of named byte files, case-sensitive, with at most one
/// file per name (`spec.md` §3). Object-safe so the orchestrator stays
/// storage-agnostic.
pub trait Directory: Send + Sync {
    fn list(&self) -> LuceneResult<Vec<String>>;
    fn exists(&self, name: &str) -> bool;
    fn length(&self, name: &str) -> LuceneResult<u64>;
    fn mtime(&self, name: &str) -> LuceneResult<SystemTime>;
    /// Updates a file's modification time without changing its contents
    /// (used by the generation witness's "touch `segments.gen`" dance).
    fn touch(&self, name: &str) -> LuceneResult<()>;
    fn delete(&self, name: &str) -> LuceneResult<()>;
    /// Atomically replaces `to` with `from`'s contents if `to` already
    /// exists (`spec.md` §3 invariant).
    fn rename(&self, from: &str, to: &str) -> LuceneResult<()>;
    fn create(&self, name: &str) -> LuceneResult<Box<dyn IndexOutput>>;
    /// `shared`: a cached handle may be returned and reused across calls
    /// with the same name; non-shared reads always get a fresh stream with
    /// an independent cursor (required for concurrent phrase/positional
    /// decoding over the same range).
    fn open(&self, name: &str, shared: bool) -> LuceneResult<Box<dyn IndexInput>>;
    /// Flushes and closes every cached shared handle.
    fn close(&self) -> LuceneResult<()>;
    /// Access to this directory's lock manager, used by the read/write lock
    /// guards and the generation witness.
    fn lock_manager(&self) -> Arc<dyn LockManager>;
}
