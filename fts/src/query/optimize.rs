//! Optimize pass (`spec.md` §4.9, §3): simplifies a rewritten `Query` tree
//! without changing result semantics — collapsing `Insignificant`/
//! `EmptyResult` children, flattening single-clause `Boolean`/`FieldUnion`
//! nodes, and folding an all-`Term` `Boolean` into a flat `MultiTerm`. Pure
//! tree-to-tree transform; runs after `rewrite` and before `execute`.

use crate::query::ast::{Query, Sign, TermLeaf};

pub fn optimize(query: Query) -> Query {
    match query {
        Query::Boolean { clauses, boost } => optimize_boolean(clauses, boost),

        Query::FieldUnion { variants, boost } => {
            let variants: Vec<Query> = variants
                .into_iter()
                .map(optimize)
                .filter(|v| !v.is_insignificant())
                .collect();
            match variants.len() {
                0 => Query::Insignificant,
                1 => variants.into_iter().next().unwrap().with_boost(boost),
                _ if variants.iter().all(|v| v.is_empty_result()) => Query::EmptyResult,
                _ => Query::FieldUnion { variants, boost },
            }
        }

        Query::MultiTerm { terms, boost } if terms.is_empty() => {
            let _ = boost;
            Query::Insignificant
        }

        other => other,
    }
}

fn optimize_boolean(clauses: Vec<(Sign, Query)>, boost: f32) -> Query {
    let mut kept = Vec::with_capacity(clauses.len());
    for (sign, clause) in clauses {
        let clause = optimize(clause);
        if clause.is_insignificant() {
            continue;
        }
        kept.push((sign, clause));
    }

    // An all-required `EmptyResult`/prohibited-everything shape still
    // matters for the prohibited-sign bookkeeping below, so check for a
    // required `EmptyResult` clause before collapsing anything else: a
    // required clause that can never match means the whole conjunction
    // can't match (`spec.md` §3: `optimize` may replace a node with
    // `EmptyResult`).
    if kept.iter().any(|(sign, q)| *sign == Sign::Required && q.is_empty_result()) {
        return Query::EmptyResult;
    }

    match kept.len() {
        0 => Query::Insignificant,
        1 => {
            let (sign, clause) = kept.into_iter().next().unwrap();
            match sign {
                Sign::Prohibited => Query::EmptyResult,
                _ => clause.with_boost(boost),
            }
        }
        _ => {
            if let Some(multi) = fold_into_multi_term(&kept) {
                multi.with_boost(boost)
            } else {
                Query::Boolean { clauses: kept, boost }
            }
        }
    }
}

/// Folds a `Boolean` whose every clause is a plain, unboosted `Term` into a
/// flat `MultiTerm` (`spec.md` §4.9's Boolean-of-Terms optimize rule),
/// preserving each clause's sign.
fn fold_into_multi_term(clauses: &[(Sign, Query)]) -> Option<Query> {
    let mut terms = Vec::with_capacity(clauses.len());
    for (sign, clause) in clauses {
        let Query::Term { field, text, boost } = clause else { return None };
        terms.push((TermLeaf { field: field.clone(), text: text.clone() }, *sign, *boost));
    }
    Some(Query::MultiTerm { terms, boost: 1.0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(text: &str) -> Query {
        Query::Term { field: Some("f".into()), text: text.into(), boost: 1.0 }
    }

    #[test]
    fn drops_insignificant_clauses() {
        let boolean = Query::Boolean {
            clauses: vec![(Sign::Optional, Query::Insignificant), (Sign::Optional, term("go"))],
            boost: 1.0,
        };
        assert_eq!(optimize(boolean), term("go"));
    }

    #[test]
    fn collapses_single_remaining_clause() {
        let boolean = Query::Boolean { clauses: vec![(Sign::Required, term("go"))], boost: 1.0 };
        assert_eq!(optimize(boolean), term("go"));
    }

    #[test]
    fn folds_all_term_boolean_into_multi_term() {
        let boolean = Query::Boolean {
            clauses: vec![(Sign::Required, term("jakarta")), (Sign::Optional, term("apache"))],
            boost: 1.0,
        };
        let Query::MultiTerm { terms, .. } = optimize(boolean) else { panic!("expected MultiTerm") };
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].1, Sign::Required);
        assert_eq!(terms[1].1, Sign::Optional);
    }

    #[test]
    fn required_empty_result_clause_empties_the_whole_query() {
        let boolean = Query::Boolean {
            clauses: vec![(Sign::Required, Query::EmptyResult), (Sign::Optional, term("go"))],
            boost: 1.0,
        };
        assert_eq!(optimize(boolean), Query::EmptyResult);
    }

    #[test]
    fn empty_multi_term_becomes_insignificant() {
        assert_eq!(optimize(Query::MultiTerm { terms: vec![], boost: 1.0 }), Query::Insignificant);
    }
}
