//! The top-level orchestrator (`spec.md` §4.10): opens a directory, takes
//! the shared read lock, runs the generation witness, and binds together
//! the segment readers, the buffering writer, and the query pipeline behind
//! one handle. Single-threaded and cooperative (`spec.md` §5) — the
//! `Mutex<IndexWriter>` here exists only to give `&self` methods interior
//! mutability, not to support concurrent callers.

pub mod generation;

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::analysis::{Analyzer, WhitespaceAnalyzer};
use crate::config::{IndexWriterConfig, QueryParserConfig, SearchConfig};
use crate::directory::{Directory, ReadLockGuard};
use crate::document::Document;
use crate::error::{LuceneError, LuceneResult};
use crate::query::{self, Hit, IndexContext, QueryParser};
use crate::segment::stored_fields::{StoredDocument, StoredValue};
use crate::writer::IndexWriter;

/// Which direction a `SortField` orders its key in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One user-supplied sort key for `Index::find` (`spec.md` §4.10's
/// "user-supplied field-name/direction tuples").
#[derive(Debug, Clone)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

/// Opens (or creates) a Lucene-format index rooted at a `Directory` and
/// exposes the read/write surface `spec.md` §4.10 describes. Holds the
/// directory's shared read lock for its own lifetime; releases it (and
/// closes the directory, if owned) on drop.
pub struct Index {
    dir: Arc<dyn Directory>,
    writer: Mutex<IndexWriter>,
    analyzer: Arc<dyn Analyzer>,
    parser_config: QueryParserConfig,
    search_config: SearchConfig,
    _read_lock: ReadLockGuard,
}

impl Index {
    /// Opens `dir`, acquiring the shared read lock and running the
    /// generation witness via `IndexWriter::open` (which itself calls
    /// `generation::current_generation`). Creates an empty index (generation
    /// `-1`) if none exists yet.
    pub fn open(dir: Arc<dyn Directory>, writer_config: IndexWriterConfig) -> LuceneResult<Self> {
        Self::open_with(dir, writer_config, Arc::new(WhitespaceAnalyzer), QueryParserConfig::default(), SearchConfig::default())
    }

    pub fn open_with(
        dir: Arc<dyn Directory>,
        writer_config: IndexWriterConfig,
        analyzer: Arc<dyn Analyzer>,
        parser_config: QueryParserConfig,
        search_config: SearchConfig,
    ) -> LuceneResult<Self> {
        let read_lock = ReadLockGuard::acquire(dir.lock_manager())?;
        let writer = IndexWriter::open(dir.clone(), writer_config, analyzer.clone())?;
        Ok(Index {
            dir,
            writer: Mutex::new(writer),
            analyzer,
            parser_config,
            search_config,
            _read_lock: read_lock,
        })
    }

    fn with_context<T>(&self, f: impl FnOnce(&IndexContext) -> T) -> T {
        let writer = self.writer.lock().expect("writer mutex poisoned");
        let config = self.parser_config.clone();
        let ctx = IndexContext::new(writer.readers(), self.analyzer.as_ref(), &config);
        f(&ctx)
    }

    /// Runs the full `rewrite → optimize → execute` pipeline
    /// (`spec.md` §4.10), then filters, normalizes, caps, and orders the
    /// resulting hits.
    pub fn find(&self, raw_query: &str, sort_fields: &[SortField]) -> LuceneResult<Vec<Hit>> {
        let parser = QueryParser::new(self.parser_config.clone());
        let mut hits = self.with_context(|ctx| query::search(raw_query, &parser, ctx))?;

        hits.retain(|h| h.score > 0.0);

        if self.search_config.normalize_scores {
            if let Some(max) = hits.iter().map(|h| h.score).fold(None, |m, s| Some(m.map_or(s, |m: f32| m.max(s)))) {
                if max > 1.0 {
                    for h in &mut hits {
                        h.score /= max;
                    }
                }
            }
        }

        // `spec.md` §4.10: the configurable result-set cap truncates before
        // the final sort, not after — a custom sort order only reshuffles
        // whatever survived the cap.
        hits.truncate(self.search_config.max_results);

        if sort_fields.is_empty() {
            hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap().then(a.doc_id.cmp(&b.doc_id)));
        } else {
            self.sort_by_fields(&mut hits, sort_fields)?;
        }

        Ok(hits)
    }

    fn sort_by_fields(&self, hits: &mut [Hit], sort_fields: &[SortField]) -> LuceneResult<()> {
        for sf in sort_fields {
            if !self.get_field_names().iter().any(|n| n == &sf.field) {
                return Err(LuceneError::runtime("Wrong field name."));
            }
        }

        let mut keyed: Vec<(Vec<String>, Hit)> = Vec::with_capacity(hits.len());
        for hit in hits.iter() {
            let mut keys = Vec::with_capacity(sort_fields.len());
            for sf in sort_fields {
                keys.push(self.sort_key(hit.doc_id, &sf.field)?);
            }
            keyed.push((keys, hit.clone()));
        }

        keyed.sort_by(|a, b| {
            for (i, sf) in sort_fields.iter().enumerate() {
                let ord = a.0[i].cmp(&b.0[i]);
                let ord = if sf.direction == SortDirection::Descending { ord.reverse() } else { ord };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            a.1.doc_id.cmp(&b.1.doc_id)
        });

        for (slot, (_, hit)) in hits.iter_mut().zip(keyed) {
            *slot = hit;
        }
        Ok(())
    }

    fn sort_key(&self, global_id: i32, field: &str) -> LuceneResult<String> {
        let doc = self.get_document(global_id)?;
        Ok(doc
            .fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v.clone())
            .unwrap_or_default())
    }

    pub fn add_document(&self, doc: Document) {
        self.writer.lock().expect("writer mutex poisoned").add_document(doc);
    }

    pub fn delete(&self, global_id: i32) -> LuceneResult<bool> {
        self.writer.lock().expect("writer mutex poisoned").delete(global_id)
    }

    pub fn commit(&self) -> LuceneResult<()> {
        self.writer.lock().expect("writer mutex poisoned").commit()
    }

    pub fn optimize(&self) -> LuceneResult<()> {
        self.writer.lock().expect("writer mutex poisoned").optimize()
    }

    pub fn has_deletions(&self) -> bool {
        self.writer.lock().expect("writer mutex poisoned").has_deletions()
    }

    pub fn num_docs(&self) -> i32 {
        self.writer.lock().expect("writer mutex poisoned").num_docs()
    }

    /// Alias for `num_docs`, matching classic `IndexReader.numDocs()`/
    /// `.count()` naming (`spec.md` §4.10 lists both).
    pub fn count(&self) -> i32 {
        self.num_docs()
    }

    pub fn max_doc(&self) -> i32 {
        self.writer.lock().expect("writer mutex poisoned").max_doc()
    }

    /// Every field name known to any open segment, indexed or stored-only.
    pub fn get_field_names(&self) -> Vec<String> {
        let writer = self.writer.lock().expect("writer mutex poisoned");
        let mut names = Vec::new();
        for reader in writer.readers() {
            for fi in reader.field_infos.iter() {
                if !names.contains(&fi.name) {
                    names.push(fi.name.clone());
                }
            }
        }
        names
    }

    /// Fetches a document's stored fields by its current global id.
    pub fn get_document(&self, global_id: i32) -> LuceneResult<ResolvedDocument> {
        let writer = self.writer.lock().expect("writer mutex poisoned");
        let max_doc = writer.max_doc();
        if global_id < 0 || global_id >= max_doc {
            return Err(LuceneError::OutOfRange { doc_id: global_id, max_doc });
        }
        let mut base = 0i32;
        for reader in writer.readers() {
            let count = reader.doc_count();
            if global_id < base + count {
                let local_id = global_id - base;
                let stored = reader.document(local_id)?;
                return Ok(resolve_document(&stored, reader));
            }
            base += count;
        }
        Err(LuceneError::OutOfRange { doc_id: global_id, max_doc })
    }

    pub fn has_term(&self, field: &str, text: &str) -> bool {
        self.with_context(|ctx| ctx.has_term(field, text))
    }

    pub fn doc_freq(&self, field: &str, text: &str) -> i32 {
        self.with_context(|ctx| ctx.doc_freq(field, text))
    }

    /// Decoded (not raw byte) norm for `(field, global_id)`.
    pub fn norm(&self, field: &str, global_id: i32) -> LuceneResult<f32> {
        let writer = self.writer.lock().expect("writer mutex poisoned");
        let mut base = 0i32;
        for reader in writer.readers() {
            let count = reader.doc_count();
            if global_id < base + count {
                let Some(fi) = reader.field_infos.by_name(field) else { return Ok(0.0) };
                return Ok(crate::similarity::decode_norm(reader.norm(fi.number, global_id - base)));
            }
            base += count;
        }
        Err(LuceneError::OutOfRange { doc_id: global_id, max_doc: writer.max_doc() })
    }

    /// `(global_doc_id, freq)` pairs for every document containing
    /// `(field, text)`.
    pub fn term_docs(&self, field: &str, text: &str) -> LuceneResult<Vec<(i32, i32)>> {
        let writer = self.writer.lock().expect("writer mutex poisoned");
        let mut base = 0i32;
        let mut out = Vec::new();
        for reader in writer.readers() {
            if let Some(fi) = reader.field_infos.by_name(field) {
                let term = crate::segment::term_dict::Term::new(fi.number, text);
                for entry in reader.term_docs(&term)? {
                    out.push((base + entry.doc_id, entry.freq));
                }
            }
            base += reader.doc_count();
        }
        Ok(out)
    }

    pub fn term_freqs(&self, field: &str, text: &str) -> LuceneResult<Vec<i32>> {
        Ok(self.term_docs(field, text)?.into_iter().map(|(_, freq)| freq).collect())
    }

    /// `(global_doc_id, positions)` pairs for every document containing
    /// `(field, text)`.
    pub fn term_positions(&self, field: &str, text: &str) -> LuceneResult<Vec<(i32, Vec<i32>)>> {
        let writer = self.writer.lock().expect("writer mutex poisoned");
        let mut base = 0i32;
        let mut out = Vec::new();
        for reader in writer.readers() {
            if let Some(fi) = reader.field_infos.by_name(field) {
                let term = crate::segment::term_dict::Term::new(fi.number, text);
                for entry in reader.term_positions(&term)? {
                    out.push((base + entry.doc_id, entry.positions));
                }
            }
            base += reader.doc_count();
        }
        Ok(out)
    }

    pub fn terms_with_prefix(&self, field: &str, prefix: &str) -> Vec<String> {
        self.with_context(|ctx| ctx.terms_with_prefix(field, prefix))
    }

    pub fn terms_range(&self, field: &str, from: Option<&str>, to: Option<&str>) -> Vec<String> {
        self.with_context(|ctx| ctx.terms_range(field, from, to))
    }

    pub fn get_generation(&self) -> i64 {
        self.writer.lock().expect("writer mutex poisoned").generation()
    }

    pub fn get_format_version(&self) -> i32 {
        self.writer.lock().expect("writer mutex poisoned").format_version()
    }

    /// Sets the `segments_N` format marker that will take effect on the
    /// next `commit`/`optimize`; does not rewrite the current generation
    /// (`spec.md` §4.10).
    pub fn set_format_version(&self, format: i32) {
        self.writer.lock().expect("writer mutex poisoned").set_format_version(format);
    }

    /// Commits pending changes and releases the directory, matching
    /// `spec.md` §4.10's destruction sequence. The read lock itself is
    /// released by `ReadLockGuard`'s own `Drop`.
    pub fn close(self) -> LuceneResult<()> {
        self.writer.lock().expect("writer mutex poisoned").commit()?;
        self.dir.close()?;
        info!("index closed");
        Ok(())
    }
}

/// A document's stored fields resolved to field names, for callers that
/// don't want to juggle field numbers themselves.
#[derive(Debug, Clone, Default)]
pub struct ResolvedDocument {
    pub fields: Vec<(String, String)>,
}

fn resolve_document(stored: &StoredDocument, reader: &crate::segment::reader::SegmentReader) -> ResolvedDocument {
    let fields = stored
        .fields
        .iter()
        .filter_map(|(number, value)| {
            let name = reader.field_infos.by_num(*number)?.name.clone();
            let text = match value {
                StoredValue::Text(s) => s.clone(),
                StoredValue::Binary(_) => String::new(),
            };
            Some((name, text))
        })
        .collect();
    ResolvedDocument { fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::RamDirectory;
    use crate::document::Field;

    fn open(dir: Arc<dyn Directory>) -> Index {
        let mut config = IndexWriterConfig::default();
        config.use_compound_file = false;
        Index::open(dir, config).unwrap()
    }

    #[test]
    fn round_trips_documents_and_finds_them() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let index = open(dir);
        index.add_document(Document::new().add(Field::text("body", "jakarta apache", true)));
        index.add_document(Document::new().add(Field::text("body", "apache incubator", true)));
        index.commit().unwrap();

        assert_eq!(index.num_docs(), 2);
        let hits = index.find("body:jakarta", &[]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 0);

        let doc = index.get_document(0).unwrap();
        assert_eq!(doc.fields[0], ("body".to_string(), "jakarta apache".to_string()));
    }

    #[test]
    fn delete_then_commit_drops_the_document_from_search() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let index = open(dir);
        index.add_document(Document::new().add(Field::text("body", "foo", true)));
        index.commit().unwrap();
        assert!(index.delete(0).unwrap());
        index.commit().unwrap();
        assert!(index.has_deletions());
        assert_eq!(index.num_docs(), 0);
    }

    #[test]
    fn sort_by_field_orders_results_by_stored_value() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let index = open(dir);
        index.add_document(Document::new().add(Field::text("body", "widget", true)).add(Field::keyword("rank", "b", true)));
        index.add_document(Document::new().add(Field::text("body", "widget", true)).add(Field::keyword("rank", "a", true)));
        index.commit().unwrap();

        let hits = index
            .find("body:widget", &[SortField { field: "rank".into(), direction: SortDirection::Ascending }])
            .unwrap();
        assert_eq!(hits[0].doc_id, 1);
        assert_eq!(hits[1].doc_id, 0);
    }

    #[test]
    fn unknown_sort_field_is_a_runtime_error() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let index = open(dir);
        index.add_document(Document::new().add(Field::text("body", "foo", true)));
        index.commit().unwrap();

        let err = index
            .find("body:foo", &[SortField { field: "nope".into(), direction: SortDirection::Ascending }])
            .unwrap_err();
        assert!(matches!(err, LuceneError::Runtime(_)));
    }

    #[test]
    fn format_version_setter_is_deferred_to_next_write() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let index = open(dir);
        let original = index.get_format_version();
        index.set_format_version(crate::segment::info::FORMAT_2_1);
        assert_eq!(index.get_format_version(), crate::segment::info::FORMAT_2_1);
        assert_ne!(index.get_format_version(), original);
    }
}
