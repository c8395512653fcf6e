//! Per-subquery parser state (`spec.md` §4.8): the field currently in
//! scope, the clauses accumulated so far at this nesting level, and (while
//! inside a range) the first range term stashed until the closing bracket
//! confirms which kind of range it was.

use crate::query::ast::{Query, Sign};

/// Which explicit (or implicit, via the configured default operator)
/// logical join preceded the clause about to be pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// One nesting level's worth of in-progress clauses, pushed when `(` opens
/// a subquery and popped when its matching `)` closes it.
#[derive(Debug)]
pub struct Frame {
    pub field: Option<String>,
    pub clauses: Vec<(Sign, Query)>,
    /// Set by a preceding `+`/`-`/`NOT`/`!` (`spec.md` §4.8's `setSign`
    /// action); consumed by the next `push_clause` and reset to `Optional`.
    pub pending_sign: Sign,
    last_operator: Option<LogicalOp>,
}

impl Frame {
    pub fn new(field: Option<String>) -> Self {
        Frame { field, clauses: Vec::new(), pending_sign: Sign::Optional, last_operator: None }
    }

    pub fn note_operator(&mut self, op: LogicalOp) {
        self.last_operator = Some(op);
    }

    /// Pushes a just-built clause, applying any pending `+`/`-`/`NOT` sign
    /// and the logical-operator promotion rule: an explicit or
    /// (`default_and`) implicit `AND` between two plain clauses promotes
    /// both to `Required`, matching classic Lucene `QueryParser` behavior
    /// where `a AND b` means `+a +b` (`spec.md` §4.8's `logicalOperator`
    /// action). A clause that already carries an explicit `+`/`-` sign is
    /// left alone — an explicit modifier always wins over the operator.
    pub fn push_clause(&mut self, query: Query, default_and: bool) {
        let mut sign = self.pending_sign;
        let is_and = match self.last_operator {
            Some(op) => op == LogicalOp::And,
            None => default_and && !self.clauses.is_empty(),
        };
        if sign == Sign::Optional && is_and {
            sign = Sign::Required;
            if let Some(last) = self.clauses.last_mut() {
                if last.0 == Sign::Optional {
                    last.0 = Sign::Required;
                }
            }
        }
        self.clauses.push((sign, query));
        self.pending_sign = Sign::Optional;
        self.last_operator = None;
    }

    /// Applies a postfix `^boost` (`spec.md` §4.8's `processModifierParameter`
    /// action) to the most recently pushed clause.
    pub fn apply_boost(&mut self, boost: f32) {
        if let Some((_, q)) = self.clauses.last_mut() {
            *q = q.clone().with_boost(boost);
        }
    }

    /// Applies a postfix `~` (`spec.md` §4.8's `processFuzzyProximityModifier`
    /// action) to the most recently pushed clause: a bare `Term` becomes
    /// `Fuzzy`, a `Phrase` has its slop set. Anything else (a range, a
    /// subquery result) is left untouched.
    pub fn apply_fuzzy_or_slop(&mut self, param: Option<f32>, default_fuzzy_similarity: f32) {
        if let Some((_, q)) = self.clauses.last_mut() {
            match q {
                Query::Term { field, text, boost } => {
                    let min_similarity = param.unwrap_or(default_fuzzy_similarity);
                    *q = Query::Fuzzy {
                        field: field.clone(),
                        text: text.clone(),
                        min_similarity,
                        boost: *boost,
                    };
                }
                Query::Phrase { slop, .. } => {
                    *slop = param.map(|p| p as i32).unwrap_or(0);
                }
                _ => {}
            }
        }
    }

    /// Collapses the accumulated clauses into one `Query`: bare passthrough
    /// if exactly one optional clause, otherwise a `Boolean`.
    pub fn into_query(self) -> Query {
        if self.clauses.len() == 1 && self.clauses[0].0 == Sign::Optional {
            self.clauses.into_iter().next().unwrap().1
        } else if self.clauses.is_empty() {
            Query::Insignificant
        } else {
            Query::Boolean { clauses: self.clauses, boost: 1.0 }
        }
    }
}

/// The range-in-progress state captured between `[`/`{` and the matching
/// close; `spec.md` §4.8's `CLOSED_RQ_*`/`OPENED_RQ_*` mirrored state pairs
/// collapse into this one struct plus an `inclusive` discriminant, since
/// the two sub-FSMs differ only in which bracket they expect back, not in
/// shape.
#[derive(Debug)]
pub struct RangeState {
    pub field: Option<String>,
    pub inclusive: bool,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// The parser's working stack: one `Frame` per open subquery, plus an
/// optional in-progress range.
pub struct ParserContext {
    pub frames: Vec<Frame>,
    pub range: Option<RangeState>,
    /// One-shot field qualifier set by a `field:` lexeme; consumed by the
    /// very next term/phrase/range/subquery it qualifies, then cleared.
    pub current_field: Option<String>,
}

impl ParserContext {
    pub fn new() -> Self {
        ParserContext { frames: vec![Frame::new(None)], range: None, current_field: None }
    }

    pub fn top(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("root frame is never popped")
    }

    /// The field a bare term/phrase inside the current subquery falls back
    /// to when no one-shot `current_field` qualifier is in play — the
    /// subquery's own scope field (`title:(foo bar)`'s `title`), or `None`
    /// at the root (meaning "expand across every indexed field").
    pub fn scope_field(&self) -> Option<String> {
        self.frames.last().and_then(|f| f.field.clone())
    }

    /// Pushes a new subquery frame, inheriting the one-shot field qualifier
    /// if one is pending, else the enclosing frame's own scope field.
    pub fn push_frame(&mut self) {
        let field = self.current_field.take().or_else(|| self.scope_field());
        self.frames.push(Frame::new(field));
    }

    pub fn pop_frame(&mut self) -> Query {
        let frame = self.frames.pop().expect("pop_frame called on root frame");
        frame.into_query()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(text: &str) -> Query {
        Query::Term { field: None, text: text.into(), boost: 1.0 }
    }

    #[test]
    fn explicit_and_promotes_both_clauses_to_required() {
        let mut frame = Frame::new(None);
        frame.push_clause(term("jakarta"), false);
        frame.note_operator(LogicalOp::And);
        frame.push_clause(term("apache"), false);
        assert_eq!(frame.clauses[0].0, Sign::Required);
        assert_eq!(frame.clauses[1].0, Sign::Required);
    }

    #[test]
    fn default_and_operator_applies_without_explicit_and() {
        let mut frame = Frame::new(None);
        frame.push_clause(term("jakarta"), true);
        frame.push_clause(term("apache"), true);
        assert_eq!(frame.clauses[0].0, Sign::Required);
        assert_eq!(frame.clauses[1].0, Sign::Required);
    }

    #[test]
    fn explicit_sign_is_not_overridden_by_and() {
        let mut frame = Frame::new(None);
        frame.push_clause(term("jakarta"), false);
        frame.note_operator(LogicalOp::And);
        frame.pending_sign = Sign::Prohibited;
        frame.push_clause(term("apache"), false);
        assert_eq!(frame.clauses[1].0, Sign::Prohibited);
    }

    #[test]
    fn boost_and_fuzzy_modify_the_last_clause() {
        let mut frame = Frame::new(None);
        frame.push_clause(term("jakarta"), false);
        frame.apply_boost(4.0);
        assert_eq!(frame.clauses[0].1.boost(), 4.0);

        frame.push_clause(term("apache"), false);
        frame.apply_fuzzy_or_slop(Some(0.7), 0.5);
        assert!(matches!(frame.clauses[1].1, Query::Fuzzy { .. }));
    }
}
