//! Global configuration values (`spec.md` §9): grouped into plain structs
//! constructed by the caller and passed into the parser/writer/orchestrator
//! at construction time. No process-wide singleton — tests that toggle
//! these values build a fresh config rather than mutate shared state.

use serde::{Deserialize, Serialize};

/// The boolean operator a bare juxtaposition of clauses defaults to (e.g.
/// `"jakarta apache"` with no explicit `AND`/`OR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultOperator {
    And,
    Or,
}

impl Default for DefaultOperator {
    fn default() -> Self {
        DefaultOperator::Or
    }
}

/// Configuration consumed by `query::parser` and `query::rewrite`/`optimize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryParserConfig {
    pub default_operator: DefaultOperator,
    /// On a `QueryParserError`, re-tokenize the raw input with the default
    /// analyzer and build a plain `MultiTerm` instead of propagating the
    /// error (`spec.md` §4.8).
    pub suppress_errors: bool,
    /// Field searched when a clause carries no explicit `field:` qualifier
    /// and the index defines more than one candidate field; `None` means
    /// "expand across every indexed field" (`spec.md` §4.9's Term
    /// preprocessing rewrite).
    pub default_field: Option<String>,
    /// Minimum shared prefix length before a wildcard (`*`/`?`) pattern is
    /// allowed to enumerate the term dictionary; guards against `*` alone
    /// scanning the whole dictionary.
    pub wildcard_min_prefix: usize,
    /// Default fuzzy similarity threshold for bare `term~` (no explicit
    /// `~N.N`), matching Lucene's historical default of 0.5.
    pub fuzzy_min_similarity: f32,
    /// Prefix length (in characters) assumed always correct by the fuzzy
    /// candidate enumeration, narrowing the term-dictionary scan.
    pub fuzzy_prefix_length: usize,
}

impl Default for QueryParserConfig {
    fn default() -> Self {
        QueryParserConfig {
            default_operator: DefaultOperator::Or,
            suppress_errors: true,
            default_field: None,
            wildcard_min_prefix: 1,
            fuzzy_min_similarity: 0.5,
            fuzzy_prefix_length: 0,
        }
    }
}

/// Writer/merge-policy knobs (`spec.md` §4.7, expanded by `SPEC_FULL.md`
/// §4.7 with `ram_buffer_size_mb` and `use_compound_file`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexWriterConfig {
    pub max_buffered_docs: usize,
    pub max_merge_docs: usize,
    pub merge_factor: usize,
    pub ram_buffer_size_mb: Option<f64>,
    pub use_compound_file: bool,
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            max_buffered_docs: 10,
            max_merge_docs: usize::MAX,
            merge_factor: 10,
            ram_buffer_size_mb: None,
            use_compound_file: true,
        }
    }
}

/// Search-time knobs consumed by `index::Index::find`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Caps the result set before sorting (`spec.md` §4.10).
    pub max_results: usize,
    /// When the top hit's score exceeds 1.0, rescale every score so the top
    /// hit reads as 1.0 (`spec.md` §4.10's "optional top-score
    /// normalization").
    pub normalize_scores: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_results: 10_000,
            normalize_scores: true,
        }
    }
}
