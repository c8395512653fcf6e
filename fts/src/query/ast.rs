//! The query AST node family (`spec.md` §2, §3, §4.9): a tagged variant
//! over the closed set of node kinds, each carrying an optional field,
//! optional boost (default 1.0), and variant-specific data. Immutable after
//! `rewrite`; `execute` attaches transient result vectors separately rather
//! than mutating the tree in place (`spec.md` §9: "do not retain an index
//! handle inside nodes past execution").

use std::fmt;

/// `+`/`-`/bare clause sign inside a `Boolean` or `MultiTerm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Required,
    Optional,
    Prohibited,
}

impl Sign {
    fn prefix(self) -> &'static str {
        match self {
            Sign::Required => "+",
            Sign::Optional => "",
            Sign::Prohibited => "-",
        }
    }
}

fn fmt_boosted(base: String, boost: f32) -> String {
    if boost == 1.0 {
        base
    } else {
        format!("({base})^{boost}")
    }
}

fn field_prefix(field: &Option<String>, text: &str) -> String {
    match field {
        Some(f) => format!("{f}:{text}"),
        None => text.to_string(),
    }
}

/// One field-qualified term, used inside `MultiTerm`/`FieldUnion`.
#[derive(Debug, Clone, PartialEq)]
pub struct TermLeaf {
    pub field: Option<String>,
    pub text: String,
}

/// The query AST (`spec.md` §2/§4.9). Pre-rewrite, `Term`/`Phrase` may carry
/// a `None` field (meaning "search every indexed field", resolved by
/// `rewrite`); post-rewrite every `Term` carries `Some` field.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Term { field: Option<String>, text: String, boost: f32 },

    Phrase { field: Option<String>, terms: Vec<String>, slop: i32, boost: f32 },

    /// A rewritten multi-token `Term` (analyzer yielded >1 token), a
    /// wildcard/fuzzy term expansion with per-term boosts, or the suppress-
    /// mode fallback built by re-tokenizing raw input (`spec.md` §4.8).
    MultiTerm { terms: Vec<(TermLeaf, Sign, f32)>, boost: f32 },

    /// The cross-field union produced by rewriting a field-less `Term`/
    /// `Phrase` (`spec.md` §4.9's Term/Phrase "field null" rewrite rule). A
    /// distinct variant from `Boolean` because it prints without per-child
    /// parens or signs — it is a pure OR, never an explicit query-string
    /// `AND`/`OR`.
    FieldUnion { variants: Vec<Query>, boost: f32 },

    Boolean { clauses: Vec<(Sign, Query)>, boost: f32 },

    Range {
        field: Option<String>,
        from: Option<String>,
        to: Option<String>,
        inclusive: bool,
        boost: f32,
    },

    Wildcard { field: Option<String>, pattern: String, boost: f32 },

    Fuzzy { field: Option<String>, text: String, min_similarity: f32, boost: f32 },

    /// Stop-word-only: contributes no score, no matches, but isn't an
    /// error (`spec.md` §3 invariant, §7 "zero-analyzer-token terms").
    Insignificant,

    /// No matches are possible (`spec.md` §3: `optimize` may replace a node
    /// with this).
    EmptyResult,
}

impl Query {
    pub fn boost(&self) -> f32 {
        match self {
            Query::Term { boost, .. }
            | Query::Phrase { boost, .. }
            | Query::MultiTerm { boost, .. }
            | Query::FieldUnion { boost, .. }
            | Query::Boolean { boost, .. }
            | Query::Range { boost, .. }
            | Query::Wildcard { boost, .. }
            | Query::Fuzzy { boost, .. } => *boost,
            Query::Insignificant | Query::EmptyResult => 1.0,
        }
    }

    pub fn with_boost(mut self, new_boost: f32) -> Self {
        match &mut self {
            Query::Term { boost, .. }
            | Query::Phrase { boost, .. }
            | Query::MultiTerm { boost, .. }
            | Query::FieldUnion { boost, .. }
            | Query::Boolean { boost, .. }
            | Query::Range { boost, .. }
            | Query::Wildcard { boost, .. }
            | Query::Fuzzy { boost, .. } => *boost *= new_boost,
            Query::Insignificant | Query::EmptyResult => {}
        }
        self
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, Query::EmptyResult)
    }

    pub fn is_insignificant(&self) -> bool {
        matches!(self, Query::Insignificant)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self {
            Query::Term { field, text, .. } => field_prefix(field, text),
            Query::Phrase { field, terms, slop, .. } => {
                let phrase = format!("\"{}\"", terms.join(" "));
                let phrase = if *slop > 0 { format!("{phrase}~{slop}") } else { phrase };
                field_prefix(field, &phrase)
            }
            Query::MultiTerm { terms, .. } => terms
                .iter()
                .map(|(t, sign, boost)| {
                    let base = field_prefix(&t.field, &t.text);
                    format!("{}{}", sign.prefix(), fmt_boosted(base, *boost))
                })
                .collect::<Vec<_>>()
                .join(" "),
            Query::FieldUnion { variants, .. } => {
                variants.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
            }
            Query::Boolean { clauses, .. } => clauses
                .iter()
                .map(|(sign, q)| format!("{}({})", sign.prefix(), q))
                .collect::<Vec<_>>()
                .join(" "),
            Query::Range { field, from, to, inclusive, .. } => {
                let (open, close) = if *inclusive { ('[', ']') } else { ('{', '}') };
                let from = from.as_deref().unwrap_or("*");
                let to = to.as_deref().unwrap_or("*");
                field_prefix(field, &format!("{open}{from} TO {to}{close}"))
            }
            Query::Wildcard { field, pattern, .. } => field_prefix(field, pattern),
            Query::Fuzzy { field, text, .. } => field_prefix(field, &format!("{text}~")),
            Query::Insignificant => return write!(f, ""),
            Query::EmptyResult => return write!(f, "<EmptyQuery>"),
        };
        write!(f, "{}", fmt_boosted(base, self.boost()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(field: &str, text: &str) -> Query {
        Query::Term { field: Some(field.into()), text: text.into(), boost: 1.0 }
    }

    #[test]
    fn displays_field_union_without_inner_parens() {
        let union = Query::FieldUnion {
            variants: vec![term("path", "jakarta"), term("modified", "jakarta"), term("contents", "jakarta")],
            boost: 1.0,
        };
        assert_eq!(union.to_string(), "path:jakarta modified:jakarta contents:jakarta");
    }

    #[test]
    fn displays_boosted_field_union_nested_in_boolean() {
        let union = Query::FieldUnion {
            variants: vec![term("path", "jakarta"), term("modified", "jakarta"), term("contents", "jakarta")],
            boost: 4.0,
        };
        let apache = Query::FieldUnion {
            variants: vec![term("path", "apache"), term("modified", "apache"), term("contents", "apache")],
            boost: 1.0,
        };
        let top = Query::Boolean {
            clauses: vec![(Sign::Optional, union), (Sign::Optional, apache)],
            boost: 1.0,
        };
        assert_eq!(
            top.to_string(),
            "((path:jakarta modified:jakarta contents:jakarta)^4) (path:apache modified:apache contents:apache)"
        );
    }

    #[test]
    fn displays_required_boolean_of_leaves() {
        let phrase = Query::Phrase {
            field: Some("title".into()),
            terms: vec!["the".into(), "right".into(), "way".into()],
            slop: 0,
            boost: 1.0,
        };
        let go = term("text", "go");
        let top = Query::Boolean {
            clauses: vec![(Sign::Required, phrase), (Sign::Required, go)],
            boost: 1.0,
        };
        assert_eq!(top.to_string(), "+(title:\"the right way\") +(text:go)");
    }

    #[test]
    fn displays_empty_result() {
        assert_eq!(Query::EmptyResult.to_string(), "<EmptyQuery>");
    }
}
