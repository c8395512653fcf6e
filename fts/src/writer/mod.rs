//! Buffers incoming documents and deletions, flushes them into segments,
//! and runs the commit protocol (`spec.md` §4.7): acquire the write lock,
//! materialize pending deletions, flush buffered documents into a new
//! segment, apply the merge policy, emit `segments_{gen+1}`, update
//! `segments.gen`, delete superseded files, release the lock.

pub mod merge_policy;
pub mod merger;
pub mod segment_builder;

use std::sync::Arc;

use tracing::{debug, info};

use crate::analysis::Analyzer;
use crate::config::IndexWriterConfig;
use crate::directory::{Directory, WriteLockGuard};
use crate::document::Document;
use crate::error::LuceneResult;
use crate::index::generation;
use crate::segment::info::{SegmentInfo, SegmentInfos};
use crate::segment::reader::SegmentReader;

/// Mutates an index: buffers new documents and deletions in memory, then
/// flushes and commits on request. Single-threaded and cooperative (no
/// background merge/flush thread) — the caller decides when `commit`
/// actually touches the directory.
pub struct IndexWriter {
    dir: Arc<dyn Directory>,
    config: IndexWriterConfig,
    analyzer: Arc<dyn Analyzer>,
    segment_infos: SegmentInfos,
    readers: Vec<SegmentReader>,
    pending_docs: Vec<Document>,
    pending_bytes: usize,
}

impl IndexWriter {
    pub fn open(dir: Arc<dyn Directory>, config: IndexWriterConfig, analyzer: Arc<dyn Analyzer>) -> LuceneResult<Self> {
        let generation = generation::current_generation(dir.as_ref())?;
        let segment_infos = if generation >= 0 {
            SegmentInfos::read(dir.as_ref(), generation)?
        } else {
            SegmentInfos::empty()
        };
        let readers = open_readers(&dir, &segment_infos)?;
        Ok(IndexWriter { dir, config, analyzer, segment_infos, readers, pending_docs: Vec::new(), pending_bytes: 0 })
    }

    pub fn add_document(&mut self, doc: Document) {
        self.pending_bytes += doc.estimated_size_bytes();
        self.pending_docs.push(doc);
        if self.pending_docs.len() >= self.config.max_buffered_docs {
            debug!(buffered = self.pending_docs.len(), "buffer full, caller should commit soon");
        }
        if self.should_flush() {
            debug!(pending_bytes = self.pending_bytes, "ram buffer size exceeded, caller should commit soon");
        }
    }

    /// Whether the buffered documents have outgrown `ram_buffer_size_mb`
    /// (`spec.md` §9's ambient configuration); `None` means no RAM-based
    /// flush trigger is configured, leaving `max_buffered_docs` as the only
    /// signal.
    pub fn should_flush(&self) -> bool {
        match self.config.ram_buffer_size_mb {
            Some(limit_mb) => self.pending_bytes as f64 >= limit_mb * 1024.0 * 1024.0,
            None => false,
        }
    }

    /// Marks the document at global id `global_id` (`spec.md` §3: ordinal
    /// position across the segment list in insertion order) as deleted.
    /// Takes effect for queries against open readers once they re-open
    /// after `commit`; the `.del<gen>` file itself is written at commit
    /// time.
    pub fn delete(&mut self, global_id: i32) -> LuceneResult<bool> {
        let mut base = 0i32;
        for reader in &mut self.readers {
            let count = reader.doc_count();
            if global_id < base + count {
                return Ok(reader.delete(global_id - base));
            }
            base += count;
        }
        Ok(false)
    }

    pub fn has_deletions(&self) -> bool {
        self.readers.iter().any(|r| r.has_deletions())
    }

    pub fn num_docs(&self) -> i32 {
        self.readers.iter().map(|r| r.num_docs()).sum::<i32>() + self.pending_docs.len() as i32
    }

    pub fn max_doc(&self) -> i32 {
        self.segment_infos.total_doc_count() + self.pending_docs.len() as i32
    }

    /// Flushes buffered documents and deletions, runs the merge policy, and
    /// publishes a new `segments_N` generation.
    pub fn commit(&mut self) -> LuceneResult<()> {
        let lock_manager = self.dir.lock_manager();
        let _guard = WriteLockGuard::acquire(lock_manager)?;

        if !self.pending_docs.is_empty() {
            let name = self.segment_infos.next_segment_name();
            let docs = std::mem::take(&mut self.pending_docs);
            self.pending_bytes = 0;
            let mut info = segment_builder::build_segment(&self.dir, self.analyzer.as_ref(), &docs, &name)?;
            if self.config.use_compound_file {
                merger::pack_compound(self.dir.as_ref(), &name)?;
                info.is_compound = crate::segment::info::CompoundStatus::Compound;
            }
            self.segment_infos.segments.push(info);
        }

        for reader in &mut self.readers {
            reader.flush_deletions()?;
        }
        self.sync_segment_infos_from_readers();

        self.run_merges()?;

        self.segment_infos.version += 1;
        self.segment_infos.generation += 1;
        self.segment_infos.generation = self.segment_infos.generation.max(0);
        self.segment_infos.write(self.dir.as_ref())?;
        generation::write_generation(self.dir.as_ref(), self.segment_infos.generation)?;

        self.readers = open_readers(&self.dir, &self.segment_infos)?;
        info!(segments = self.segment_infos.segments.len(), generation = self.segment_infos.generation, "committed");
        Ok(())
    }

    /// Forces merges until at most one segment remains (`spec.md` §4.7).
    pub fn optimize(&mut self) -> LuceneResult<()> {
        if !self.pending_docs.is_empty() {
            self.commit()?;
        }
        let lock_manager = self.dir.lock_manager();
        let _guard = WriteLockGuard::acquire(lock_manager)?;

        for reader in &mut self.readers {
            reader.flush_deletions()?;
        }
        self.sync_segment_infos_from_readers();

        while let Some(spec) = merge_policy::full_merge(self.segment_infos.segments.len()) {
            self.apply_merge(&spec.segment_indices)?;
        }

        self.segment_infos.version += 1;
        self.segment_infos.generation += 1;
        self.segment_infos.write(self.dir.as_ref())?;
        generation::write_generation(self.dir.as_ref(), self.segment_infos.generation)?;
        self.readers = open_readers(&self.dir, &self.segment_infos)?;
        Ok(())
    }

    fn run_merges(&mut self) -> LuceneResult<()> {
        let doc_counts: Vec<i32> = self.segment_infos.segments.iter().map(|s| s.doc_count).collect();
        let merges = merge_policy::find_merges(&doc_counts, self.config.merge_factor, self.config.max_merge_docs);
        // Apply from the highest index down so earlier indices stay valid
        // as later merges splice the segment list.
        for spec in merges.into_iter().rev() {
            self.apply_merge(&spec.segment_indices)?;
        }
        Ok(())
    }

    fn apply_merge(&mut self, indices: &[usize]) -> LuceneResult<()> {
        let name = self.segment_infos.next_segment_name();
        let refs: Vec<&SegmentReader> = indices.iter().map(|&i| &self.readers[i]).collect();
        let mut info = merger::merge_segments(&self.dir, &refs, &name)?;
        if self.config.use_compound_file {
            merger::pack_compound(self.dir.as_ref(), &name)?;
            info.is_compound = crate::segment::info::CompoundStatus::Compound;
        }

        let superseded: Vec<SegmentInfo> = indices
            .iter()
            .map(|&i| self.segment_infos.segments[i].clone())
            .collect();

        let mut kept: Vec<SegmentInfo> = self
            .segment_infos
            .segments
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, s)| s.clone())
            .collect();
        let insert_at = indices.iter().copied().min().unwrap_or(kept.len());
        kept.insert(insert_at.min(kept.len()), info.clone());
        self.segment_infos.segments = kept;

        for old in &superseded {
            merger::delete_segment_files(self.dir.as_ref(), old)?;
        }
        self.readers = open_readers(&self.dir, &self.segment_infos)?;
        Ok(())
    }

    /// Copies each open reader's `del_gen` back into `segment_infos` after
    /// `flush_deletions` has written a fresh `.del<gen>` file for it.
    fn sync_segment_infos_from_readers(&mut self) {
        for (info, reader) in self.segment_infos.segments.iter_mut().zip(&self.readers) {
            info.del_gen = reader.info.del_gen;
        }
    }

    pub fn segment_infos(&self) -> &SegmentInfos {
        &self.segment_infos
    }

    /// The `segments_N` format marker that will be written on the next
    /// `commit`/`optimize` call.
    pub fn format_version(&self) -> i32 {
        self.segment_infos.format
    }

    /// Sets the format marker for the next write; conversion to the new
    /// format happens at that next `commit`/`optimize`, not immediately
    /// (`spec.md` §4.10).
    pub fn set_format_version(&mut self, format: i32) {
        self.segment_infos.format = format;
    }

    pub fn generation(&self) -> i64 {
        self.segment_infos.generation
    }

    pub fn readers(&self) -> &[SegmentReader] {
        &self.readers
    }
}

fn open_readers(dir: &Arc<dyn Directory>, infos: &SegmentInfos) -> LuceneResult<Vec<SegmentReader>> {
    infos.segments.iter().map(|info| SegmentReader::open(dir.clone(), info.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::WhitespaceAnalyzer;
    use crate::directory::RamDirectory;
    use crate::document::Field;

    fn writer(dir: Arc<dyn Directory>) -> IndexWriter {
        let mut config = IndexWriterConfig::default();
        config.max_buffered_docs = 2;
        config.merge_factor = 2;
        config.use_compound_file = false;
        IndexWriter::open(dir, config, Arc::new(WhitespaceAnalyzer)).unwrap()
    }

    #[test]
    fn commits_buffered_documents_into_a_segment() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let mut w = writer(dir.clone());
        w.add_document(Document::new().add(Field::text("body", "foo bar", true)));
        w.commit().unwrap();
        assert_eq!(w.num_docs(), 1);
        assert_eq!(w.segment_infos().segments.len(), 1);
    }

    #[test]
    fn merges_segments_when_merge_factor_is_reached() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let mut w = writer(dir.clone());
        for text in ["a", "b"] {
            w.add_document(Document::new().add(Field::text("body", text, true)));
            w.commit().unwrap();
        }
        // Two single-document segments at merge_factor=2 should have merged
        // into one two-document segment.
        assert_eq!(w.segment_infos().segments.len(), 1);
        assert_eq!(w.num_docs(), 2);
    }

    #[test]
    fn optimize_converges_to_one_segment() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let mut config = IndexWriterConfig::default();
        config.merge_factor = 100; // disable automatic merging so optimize has work to do
        config.use_compound_file = false;
        let mut w = IndexWriter::open(dir.clone(), config, Arc::new(WhitespaceAnalyzer)).unwrap();
        for text in ["a", "b", "c"] {
            w.add_document(Document::new().add(Field::text("body", text, true)));
            w.commit().unwrap();
        }
        assert_eq!(w.segment_infos().segments.len(), 3);
        w.optimize().unwrap();
        assert_eq!(w.segment_infos().segments.len(), 1);
        assert_eq!(w.num_docs(), 3);
    }

    #[test]
    fn deletions_persist_across_commit() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let mut w = writer(dir.clone());
        w.add_document(Document::new().add(Field::text("body", "foo", true)));
        w.commit().unwrap();
        assert!(w.delete(0).unwrap());
        w.commit().unwrap();
        assert!(w.has_deletions());

        let reopened = writer(dir);
        assert!(reopened.has_deletions());
        assert_eq!(reopened.num_docs(), 0);
    }

    #[test]
    fn ram_buffer_size_triggers_should_flush() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let mut config = IndexWriterConfig::default();
        config.max_buffered_docs = usize::MAX;
        config.ram_buffer_size_mb = Some(1.0 / 1024.0 / 1024.0 * 8.0); // 8 bytes
        let mut w = IndexWriter::open(dir, config, Arc::new(WhitespaceAnalyzer)).unwrap();
        assert!(!w.should_flush());
        w.add_document(Document::new().add(Field::text("body", "far more than eight bytes", true)));
        assert!(w.should_flush());
    }

    #[test]
    fn no_ram_buffer_limit_never_flags_should_flush() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let mut w = writer(dir);
        w.add_document(Document::new().add(Field::text("body", "anything at all", true)));
        assert!(!w.should_flush());
    }
}
