use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use memmap2::Mmap;
use parking_lot::RwLock;

use super::lock::{FsLockManager, LockManager};
use super::Directory;
use crate::error::{LuceneError, LuceneResult};
use crate::store::{FsIndexInput, FsIndexOutput, IndexInput, IndexOutput};

/// Files under one root path; shared readers are `memmap2::Mmap`-backed and
/// cached per file name so repeated reads of the same hot file (the term
/// dictionary, the stored-fields index) don't re-mmap each time.
pub struct FsDirectory {
    root: PathBuf,
    cache: RwLock<std::collections::HashMap<String, Arc<Mmap>>>,
    locks: Arc<FsLockManager>,
}

impl FsDirectory {
    pub fn open(root: impl Into<PathBuf>) -> LuceneResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let locks = Arc::new(FsLockManager::new(root.clone()));
        Ok(FsDirectory {
            root,
            cache: RwLock::new(std::collections::HashMap::new()),
            locks,
        })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Directory for FsDirectory {
    fn list(&self) -> LuceneResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn length(&self, name: &str) -> LuceneResult<u64> {
        Ok(std::fs::metadata(self.path(name))?.len())
    }

    fn mtime(&self, name: &str) -> LuceneResult<SystemTime> {
        Ok(std::fs::metadata(self.path(name))?.modified()?)
    }

    fn touch(&self, name: &str) -> LuceneResult<()> {
        let now = std::time::SystemTime::now();
        let file = std::fs::OpenOptions::new().write(true).open(self.path(name))?;
        file.set_modified(now)?;
        Ok(())
    }

    fn delete(&self, name: &str) -> LuceneResult<()> {
        self.cache.write().remove(name);
        match std::fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn rename(&self, from: &str, to: &str) -> LuceneResult<()> {
        self.cache.write().remove(from);
        self.cache.write().remove(to);
        std::fs::rename(self.path(from), self.path(to))?;
        Ok(())
    }

    fn create(&self, name: &str) -> LuceneResult<Box<dyn IndexOutput>> {
        self.cache.write().remove(name);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.path(name))?;
        Ok(Box::new(FsIndexOutput::create(file)))
    }

    fn open(&self, name: &str, shared: bool) -> LuceneResult<Box<dyn IndexInput>> {
        if shared {
            if let Some(mmap) = self.cache.read().get(name) {
                return Ok(Box::new(FsIndexInput::from_mmap(Arc::clone(mmap))));
            }
        }
        let file = std::fs::File::open(self.path(name)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LuceneError::file_not_found(name)
            } else {
                LuceneError::Io(e)
            }
        })?;
        if shared {
            let mmap = Arc::new(unsafe { Mmap::map(&file)? });
            self.cache.write().insert(name.to_string(), Arc::clone(&mmap));
            return Ok(Box::new(FsIndexInput::from_mmap(mmap)));
        }
        Ok(Box::new(FsIndexInput::open(&file)?))
    }

    fn close(&self) -> LuceneResult<()> {
        self.cache.write().clear();
        Ok(())
    }

    fn lock_manager(&self) -> Arc<dyn LockManager> {
        Arc::clone(&self.locks) as Arc<dyn LockManager>
    }
}
