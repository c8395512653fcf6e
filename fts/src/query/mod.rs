//! Query subsystem (`spec.md` §4.8, §4.9): a tagged AST, a three-pass
//! pipeline (`rewrite` → `optimize` → `execute`) that turns it into scored
//! hits, and a string parser that builds the AST in the first place.

pub mod ast;
pub mod execute;
pub mod index_context;
pub mod optimize;
pub mod parser;
pub mod rewrite;

pub use ast::{Query, Sign, TermLeaf};
pub use execute::{execute, Hit};
pub use index_context::IndexContext;
pub use optimize::optimize;
pub use parser::QueryParser;
pub use rewrite::rewrite;

use crate::error::LuceneResult;

/// Runs the full pipeline: parse the raw string, rewrite field-less/
/// wildcard/fuzzy shorthand against `ctx`, optimize the tree, and score it
/// (`spec.md` §4.9's three-pass contract).
pub fn search(raw_query: &str, parser: &QueryParser, ctx: &IndexContext) -> LuceneResult<Vec<Hit>> {
    let parsed = parser.parse(raw_query)?;
    let rewritten = rewrite(&parsed, ctx)?;
    let optimized = optimize(rewritten);
    execute(&optimized, ctx)
}
