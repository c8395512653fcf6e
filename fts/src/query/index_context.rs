//! The read-only view of an open index that `rewrite`/`optimize`/`execute`
//! need (`spec.md` §4.9): every open segment, each segment's global
//! doc-id base, and the analyzer/config the query pipeline consults.
//! Deliberately independent of `crate::index::Index` (the orchestrator
//! depends on `query`, not the other way around) so a caller can run the
//! pipeline against any slice of segment readers, e.g. a single segment
//! mid-merge.

use crate::analysis::Analyzer;
use crate::config::QueryParserConfig;
use crate::segment::field_infos::FieldInfo;
use crate::segment::reader::SegmentReader;
use crate::segment::term_dict::Term;

pub struct IndexContext<'a> {
    pub segments: &'a [SegmentReader],
    pub analyzer: &'a dyn Analyzer,
    pub config: &'a QueryParserConfig,
}

impl<'a> IndexContext<'a> {
    pub fn new(segments: &'a [SegmentReader], analyzer: &'a dyn Analyzer, config: &'a QueryParserConfig) -> Self {
        IndexContext { segments, analyzer, config }
    }

    /// Each segment's first global doc id, parallel to `self.segments`.
    pub fn doc_bases(&self) -> Vec<i32> {
        let mut base = 0;
        self.segments
            .iter()
            .map(|s| {
                let b = base;
                base += s.doc_count();
                b
            })
            .collect()
    }

    pub fn total_num_docs(&self) -> i32 {
        self.segments.iter().map(|s| s.num_docs()).sum()
    }

    /// Every indexed field name known to any open segment, in first-seen
    /// order (used to expand a field-less `Term`/`Phrase` during rewrite).
    pub fn indexed_field_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for seg in self.segments {
            for name in seg.field_infos.indexed_field_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn has_term(&self, field: &str, text: &str) -> bool {
        self.segments.iter().any(|seg| match seg.field_infos.by_name(field) {
            Some(fi) => seg.has_term(&Term::new(fi.number, text)),
            None => false,
        })
    }

    /// Index-wide document frequency for `(field, text)`: summed across
    /// every open segment.
    pub fn doc_freq(&self, field: &str, text: &str) -> i32 {
        self.segments
            .iter()
            .map(|seg| match seg.field_infos.by_name(field) {
                Some(fi) => seg.doc_freq(&Term::new(fi.number, text)),
                None => 0,
            })
            .sum()
    }

    /// Ascending-deduplicated term texts across every segment within a
    /// field whose prefix matches `prefix` (used by wildcard rewriting).
    pub fn terms_with_prefix(&self, field: &str, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        for seg in self.segments {
            let Some(fi) = seg.field_infos.by_name(field) else { continue };
            for t in seg.terms_with_prefix(fi.number, prefix) {
                if !out.contains(&t.text) {
                    out.push(t.text.clone());
                }
            }
        }
        out.sort();
        out
    }

    pub fn terms_range(&self, field: &str, from: Option<&str>, to: Option<&str>) -> Vec<String> {
        let mut out = Vec::new();
        for seg in self.segments {
            let Some(fi) = seg.field_infos.by_name(field) else { continue };
            for t in seg.terms_range(fi.number, from, to) {
                if !out.contains(&t.text) {
                    out.push(t.text.clone());
                }
            }
        }
        out.sort();
        out
    }

    /// Candidate terms within `max_edits` of `text` in `field`, across every
    /// segment, deduplicated (used by fuzzy rewriting; final similarity
    /// scoring and thresholding happens in the caller).
    pub fn fuzzy_candidates(&self, field: &str, text: &str, max_edits: u32) -> crate::error::LuceneResult<Vec<String>> {
        let mut out = Vec::new();
        for seg in self.segments {
            let Some(fi) = seg.field_infos.by_name(field) else { continue };
            for t in seg.fuzzy_candidates(fi.number, text, max_edits)? {
                if !out.contains(&t.text) {
                    out.push(t.text.clone());
                }
            }
        }
        Ok(out)
    }

    pub fn field_info(&self, segment_index: usize, field: &str) -> Option<&FieldInfo> {
        self.segments[segment_index].field_infos.by_name(field)
    }
}
