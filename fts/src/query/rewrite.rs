//! Rewrite pass (`spec.md` §4.9): expands user-facing shorthand (field-less
//! terms, wildcards, fuzzy terms, multi-token analyzer output) into the
//! primitive node shapes `execute` knows how to score. Pure: takes a `Query`
//! and an `IndexContext`, returns a new `Query`. Never touches the
//! directory.

use crate::error::{LuceneError, LuceneResult};
use crate::query::ast::{Query, Sign, TermLeaf};
use crate::query::index_context::IndexContext;

pub fn rewrite(query: &Query, ctx: &IndexContext) -> LuceneResult<Query> {
    let boost = query.boost();
    let rewritten = match query {
        Query::Term { field: None, text, .. } => rewrite_fieldless_term(text, ctx)?,
        Query::Term { field: Some(field), text, .. } => rewrite_term(Some(field.clone()), text, ctx)?,

        Query::Phrase { field: None, terms, slop, .. } if ctx.config.default_field.is_some() => {
            let field = ctx.config.default_field.clone();
            let candidate = Query::Phrase { field, terms: terms.clone(), slop: *slop, boost: 1.0 };
            rewrite(&candidate, ctx)?
        }
        Query::Phrase { field: None, terms, slop, .. } => {
            // Same cross-field union shape as the Term rule (`ast.rs`'s
            // `FieldUnion` doc comment covers both): a field-less phrase
            // expands into a union across every indexed field, each
            // variant independently rewritten so a phrase absent from
            // every field collapses to `EmptyResult` via `FieldUnion`'s
            // all-empty rule rather than silently vanishing as
            // `Insignificant`.
            let fields = ctx.indexed_field_names();
            if fields.is_empty() {
                Query::Insignificant
            } else {
                let mut variants = Vec::with_capacity(fields.len());
                for f in fields {
                    let candidate = Query::Phrase { field: Some(f), terms: terms.clone(), slop: *slop, boost: 1.0 };
                    variants.push(rewrite(&candidate, ctx)?);
                }
                Query::FieldUnion { variants, boost: 1.0 }
            }
        }
        Query::Phrase { field: Some(field), terms, .. } => {
            // A phrase containing any term absent from this field's
            // dictionary can never match; mark it `EmptyResult` now so
            // `optimize` can propagate that up through a required clause
            // rather than `execute` silently returning zero hits.
            if terms.iter().any(|t| ctx.doc_freq(field, t) == 0) {
                Query::EmptyResult
            } else {
                query.clone()
            }
        }

        Query::Wildcard { field, pattern, .. } => rewrite_wildcard(field.clone(), pattern, ctx)?,
        Query::Fuzzy { field, text, min_similarity, .. } => rewrite_fuzzy(field.clone(), text, *min_similarity, ctx)?,
        Query::Range { field, from, to, inclusive, .. } => {
            rewrite_range(field.clone(), from.as_deref(), to.as_deref(), *inclusive, ctx)
        }

        Query::Boolean { clauses, .. } => {
            let mut rewritten_clauses = Vec::with_capacity(clauses.len());
            for (sign, clause) in clauses {
                rewritten_clauses.push((*sign, rewrite(clause, ctx)?));
            }
            Query::Boolean { clauses: rewritten_clauses, boost: 1.0 }
        }

        Query::FieldUnion { variants, .. } => {
            let mut rewritten_variants = Vec::with_capacity(variants.len());
            for v in variants {
                rewritten_variants.push(rewrite(v, ctx)?);
            }
            Query::FieldUnion { variants: rewritten_variants, boost: 1.0 }
        }

        Query::MultiTerm { .. } | Query::Insignificant | Query::EmptyResult => query.clone(),
    };
    Ok(rewritten.with_boost(boost))
}

/// `spec.md` §4.9's Term rewrite rule, applied when the parser left the
/// field unset: the term expands into a union of the single-field rewrite
/// across every indexed field.
fn rewrite_fieldless_term(text: &str, ctx: &IndexContext) -> LuceneResult<Query> {
    if let Some(field) = ctx.config.default_field.clone() {
        return rewrite_term(Some(field), text, ctx);
    }
    let fields = ctx.indexed_field_names();
    if fields.is_empty() {
        return Ok(Query::Insignificant);
    }
    let variants = fields
        .into_iter()
        .map(|f| rewrite_term(Some(f), text, ctx))
        .collect::<LuceneResult<Vec<_>>>()?;
    Ok(Query::FieldUnion { variants, boost: 1.0 })
}

fn rewrite_term(field: Option<String>, text: &str, ctx: &IndexContext) -> LuceneResult<Query> {
    let field_name = field.clone().unwrap_or_default();

    if is_wildcard_pattern(text) {
        return rewrite_wildcard(field, text, ctx);
    }

    // Exact keyword already present in the dictionary verbatim: no analysis
    // needed, emit the primitive term directly.
    if ctx.has_term(&field_name, text) {
        return Ok(Query::Term { field, text: text.to_string(), boost: 1.0 });
    }

    let tokens = ctx.analyzer.analyze(&field_name, text);
    match tokens.len() {
        0 => Ok(Query::Insignificant),
        1 => Ok(Query::Term { field, text: tokens[0].text.clone(), boost: 1.0 }),
        _ => {
            let terms = tokens
                .into_iter()
                .map(|t| (TermLeaf { field: field.clone(), text: t.text }, Sign::Required, 1.0))
                .collect();
            Ok(Query::MultiTerm { terms, boost: 1.0 })
        }
    }
}

fn is_wildcard_pattern(text: &str) -> bool {
    text.contains('*') || text.contains('?')
}

fn rewrite_wildcard(field: Option<String>, pattern: &str, ctx: &IndexContext) -> LuceneResult<Query> {
    let field_name = field.clone().unwrap_or_default();
    let prefix: String = pattern.chars().take_while(|c| *c != '*' && *c != '?').collect();
    if prefix.chars().count() < ctx.config.wildcard_min_prefix {
        return Err(LuceneError::invalid_argument(format!(
            "wildcard pattern '{pattern}' needs at least {} leading literal character(s)",
            ctx.config.wildcard_min_prefix
        )));
    }
    let regex = wildcard_to_regex(pattern);

    let candidates = ctx.terms_with_prefix(&field_name, &prefix);
    let terms: Vec<(TermLeaf, Sign, f32)> = candidates
        .into_iter()
        .filter(|t| regex.is_match(t))
        .map(|t| (TermLeaf { field: field.clone(), text: t }, Sign::Optional, 1.0))
        .collect();

    if terms.is_empty() {
        Ok(Query::EmptyResult)
    } else {
        Ok(Query::MultiTerm { terms, boost: 1.0 })
    }
}

/// Expands a range query into the `MultiTerm` union of every indexed term
/// within the bounds (Lucene's classic `RangeQuery` rewrite before
/// `ConstantScoreRangeQuery` existed: each matching term contributes like an
/// ordinary optional term clause).
fn rewrite_range(
    field: Option<String>,
    from: Option<&str>,
    to: Option<&str>,
    inclusive: bool,
    ctx: &IndexContext,
) -> Query {
    // `terms_range`'s dictionary-level upper bound is a strict `<`, which
    // would drop the boundary term itself for an inclusive range, so the
    // upper bound is enforced only by the closure below, not passed through.
    let field_name = field.clone().unwrap_or_default();
    let candidates = ctx.terms_range(&field_name, from, None);
    let terms: Vec<(TermLeaf, Sign, f32)> = candidates
        .into_iter()
        .filter(|t| {
            let above_from = match from {
                Some(f) if !inclusive => t.as_str() > f,
                _ => true,
            };
            let below_to = match to {
                Some(upper) if inclusive => t.as_str() <= upper,
                Some(upper) => t.as_str() < upper,
                None => true,
            };
            above_from && below_to
        })
        .map(|t| (TermLeaf { field: field.clone(), text: t }, Sign::Optional, 1.0))
        .collect();

    if terms.is_empty() {
        Query::EmptyResult
    } else {
        Query::MultiTerm { terms, boost: 1.0 }
    }
}

fn rewrite_fuzzy(field: Option<String>, text: &str, min_similarity: f32, ctx: &IndexContext) -> LuceneResult<Query> {
    let field_name = field.clone().unwrap_or_default();
    let max_edits = ((1.0 - min_similarity) * text.chars().count() as f32).ceil().max(1.0) as u32;
    let candidates = ctx.fuzzy_candidates(&field_name, text, max_edits)?;

    // `fuzzy_prefix_length` is assumed always correct (`config.rs`'s doc
    // comment): a candidate that doesn't share it verbatim with `text` is
    // dropped before the real Levenshtein check runs.
    let required_prefix: String = text.chars().take(ctx.config.fuzzy_prefix_length).collect();

    let mut terms = Vec::new();
    for candidate in candidates {
        if !candidate.starts_with(&required_prefix) {
            continue;
        }
        let similarity = levenshtein_similarity(text, &candidate);
        if similarity >= min_similarity {
            terms.push((TermLeaf { field: field.clone(), text: candidate }, Sign::Optional, similarity));
        }
    }

    if terms.is_empty() {
        Ok(Query::EmptyResult)
    } else {
        Ok(Query::MultiTerm { terms, boost: 1.0 })
    }
}

/// Lucene's `FuzzyQuery` similarity: `1 - edit_distance / min(len_a, len_b)`
/// (floored at the shorter string's length so very short terms don't match
/// almost anything).
fn levenshtein_similarity(a: &str, b: &str) -> f32 {
    let distance = levenshtein_distance(a, b) as f32;
    let shorter = a.chars().count().min(b.chars().count()).max(1) as f32;
    (1.0 - distance / shorter).max(0.0)
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut prev = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let temp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev
            } else {
                1 + prev.min(row[j]).min(row[j - 1])
            };
            prev = temp;
        }
    }
    row[b.len()]
}

/// Translates a Lucene wildcard pattern (`*` any run, `?` single char) into
/// an anchored regex over full term text, built with the same
/// `regex-automata` crate the term-range planner uses elsewhere, rather
/// than reaching for the full `regex` crate for one anchored match.
fn wildcard_to_regex(pattern: &str) -> regex_automata::meta::Regex {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => {
                if !other.is_alphanumeric() {
                    out.push('\\');
                }
                out.push(other);
            }
        }
    }
    out.push('$');
    regex_automata::meta::Regex::new(&out).expect("wildcard pattern always compiles to a valid regex")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_pattern_detection() {
        assert!(is_wildcard_pattern("foo*"));
        assert!(is_wildcard_pattern("f?o"));
        assert!(!is_wildcard_pattern("foo"));
    }

    #[test]
    fn wildcard_regex_matches_prefix_and_suffix_runs() {
        let re = wildcard_to_regex("te?t*");
        assert!(re.is_match("test"));
        assert!(re.is_match("testing"));
        assert!(!re.is_match("teal"));
    }

    #[test]
    fn levenshtein_similarity_of_identical_strings_is_one() {
        assert_eq!(levenshtein_similarity("foo", "foo"), 1.0);
    }

    #[test]
    fn levenshtein_similarity_drops_with_edits() {
        let sim = levenshtein_similarity("foobar", "foozar");
        assert!(sim > 0.5 && sim < 1.0);
    }
}
