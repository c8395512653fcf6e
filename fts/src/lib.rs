//! A Lucene-2.x-compatible segmented full-text index engine: on-disk
//! segment format, a query-string parser and scoring pipeline, and a
//! single-threaded writer/merge policy, bound together by `index::Index`.
//!
//! Module map:
//! - [`store`]: binary stream primitives (`IndexInput`/`IndexOutput`, VInt).
//! - [`directory`]: the namespaced byte-file store plus read/write locks.
//! - [`compound`]: `.cfs` compound-file packing/reading.
//! - [`segment`]: per-segment file formats (`.fnm`/`.tis`/`.frq`/`.prx`/
//!   `.nrm`/`.fdx`/`.fdt`/`.del<gen>`) and the segment reader.
//! - [`document`]/[`analysis`]: the field/document model and the analyzer
//!   interface `addDocument` and the query rewriter consume.
//! - [`query`]: the AST, the rewrite/optimize/execute pipeline, and the
//!   FSM query-string parser.
//! - [`similarity`]: TF/IDF vector-space scoring formulas.
//! - [`writer`]: buffers documents/deletions and runs the commit/merge
//!   protocol.
//! - [`index`]: the top-level orchestrator tying all of the above together.

pub mod analysis;
pub mod compound;
pub mod config;
pub mod directory;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod segment;
pub mod similarity;
pub mod store;
pub mod writer;

pub use config::{IndexWriterConfig, QueryParserConfig, SearchConfig};
pub use document::{Document, Field};
pub use error::{LuceneError, LuceneResult};
pub use index::{Index, SortDirection, SortField};
pub use query::Query;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::analysis::WhitespaceAnalyzer;
    use crate::config::{IndexWriterConfig, QueryParserConfig, SearchConfig};
    use crate::directory::{Directory, RamDirectory};
    use crate::document::{Document, Field};
    use crate::index::{Index, SortDirection, SortField};

    #[test]
    fn writes_searches_sorts_and_deletes_across_a_commit() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let mut writer_config = IndexWriterConfig::default();
        writer_config.use_compound_file = false;
        let index = Index::open_with(
            dir,
            writer_config,
            Arc::new(WhitespaceAnalyzer),
            QueryParserConfig::default(),
            SearchConfig::default(),
        )
        .unwrap();

        index.add_document(
            Document::new()
                .add(Field::text("body", "foo bar", true))
                .add(Field::keyword("id", "1", true)),
        );
        index.add_document(
            Document::new()
                .add(Field::text("body", "foo baz", true))
                .add(Field::keyword("id", "2", true)),
        );
        index.add_document(
            Document::new()
                .add(Field::text("body", "biz buz", true))
                .add(Field::keyword("id", "3", true)),
        );
        index.commit().unwrap();
        assert_eq!(index.num_docs(), 3);
        assert_eq!(index.get_generation(), 0);

        let doc = index.get_document(1).unwrap();
        assert!(doc.fields.contains(&("body".to_string(), "foo baz".to_string())));

        let field_names = index.get_field_names();
        assert!(field_names.contains(&"body".to_string()));
        assert!(field_names.contains(&"id".to_string()));

        let hits = index.find("body:foo", &[]).unwrap();
        assert_eq!(hits.len(), 2);

        let sorted = index
            .find("body:foo", &[SortField { field: "id".into(), direction: SortDirection::Descending }])
            .unwrap();
        assert_eq!(sorted[0].doc_id, 1);
        assert_eq!(sorted[1].doc_id, 0);

        // Overwriting document 3's content is a fresh insert, not an
        // in-place update: classic Lucene identifies no document by a
        // caller-supplied key, so "overwrite" means deleting the old global
        // id and adding the replacement.
        assert!(index.delete(2).unwrap());
        index.add_document(
            Document::new().add(Field::text("body", "overwrite", true)).add(Field::keyword("id", "3", true)),
        );
        index.commit().unwrap();
        assert!(index.has_deletions());

        let hits = index.find("body:overwrite", &[]).unwrap();
        assert_eq!(hits.len(), 1);

        index.close().unwrap();
    }

    #[test]
    fn wildcard_and_fuzzy_queries_rewrite_and_match() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let mut writer_config = IndexWriterConfig::default();
        writer_config.use_compound_file = false;
        let index = Index::open(dir, writer_config).unwrap();

        index.add_document(Document::new().add(Field::text("body", "jakarta apache incubator", true)));
        index.commit().unwrap();

        let hits = index.find("body:jaka*", &[]).unwrap();
        assert_eq!(hits.len(), 1);

        let hits = index.find("body:jakerta~0.6", &[]).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
