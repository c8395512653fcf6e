//! Table-driven finite-state machine query parser (`spec.md` §4.8): walks
//! the lexeme stream from `parser::lexer` and assembles a `Query` AST by
//! dispatching each `(state, lexeme)` pair to an action that mutates a
//! `ParserContext`. Five states cover the grammar: `Common`, and the four
//! steps of a range expression (`ExpectRangeFrom`, `ExpectRangeTo`,
//! `ExpectRangeLastTerm`, `ExpectRangeEnd`). `spec.md` lists eleven states
//! because it keeps the `[...]`/`{...}` sub-FSMs textually separate; here
//! they're the same four states parameterized by the `inclusive` flag
//! already carried on `RangeState`; and `COMMON`'s internal
//! `FIRST_TERM`/`TO_TERM`/... transitions are collapsed the same way,
//! since duplicating five states twice over for a flag that's already
//! data would just be two copies of the same code.

use crate::config::{DefaultOperator, QueryParserConfig};
use crate::error::{LuceneError, LuceneResult};
use crate::query::ast::{Query, Sign, TermLeaf};
use crate::query::parser::context::{LogicalOp, ParserContext, RangeState};
use crate::query::parser::lexer::{Lexeme, Lexer, PositionedLexeme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Common,
    ExpectRangeFrom,
    ExpectRangeTo,
    ExpectRangeLastTerm,
    ExpectRangeEnd,
}

/// Parses Lucene-dialect query strings (`spec.md` §6) into a `Query` AST.
/// Holds only the parser-wide configuration (`spec.md` §9); every other
/// piece of state lives in the `ParserContext` built fresh per call to
/// `parse`.
pub struct QueryParser {
    config: QueryParserConfig,
}

impl QueryParser {
    pub fn new(config: QueryParserConfig) -> Self {
        QueryParser { config }
    }

    /// Parses `input`. On a syntax error, if `config.suppress_errors` is
    /// set (the default), re-tokenizes the raw input into plain words and
    /// returns a flat `MultiTerm` instead of propagating the error
    /// (`spec.md` §4.8's suppress mode); otherwise the `QueryParserError`
    /// is returned as-is, carrying the lexer's 1-based char position.
    pub fn parse(&self, input: &str) -> LuceneResult<Query> {
        match self.parse_strict(input) {
            Ok(query) => Ok(query),
            Err(err @ LuceneError::QueryParserError { .. }) if self.config.suppress_errors => {
                let _ = err;
                Ok(self.fallback(input))
            }
            Err(err) => Err(err),
        }
    }

    fn fallback(&self, input: &str) -> Query {
        let sign = match self.config.default_operator {
            DefaultOperator::And => Sign::Required,
            DefaultOperator::Or => Sign::Optional,
        };
        let terms = Lexer::fallback_words(input)
            .into_iter()
            .map(|text| (TermLeaf { field: None, text }, sign, 1.0))
            .collect();
        Query::MultiTerm { terms, boost: 1.0 }
    }

    fn parse_strict(&self, input: &str) -> LuceneResult<Query> {
        let lexemes = Lexer::new(input).tokenize()?;
        let mut ctx = ParserContext::new();
        let mut state = State::Common;
        let mut i = 0usize;
        let default_and = self.config.default_operator == DefaultOperator::And;

        while i < lexemes.len() {
            let (next_state, consumed) = self.step(&mut ctx, state, &lexemes, i, default_and)?;
            state = next_state;
            i += consumed;
        }

        if state != State::Common {
            let pos = lexemes.last().map(|l| l.position).unwrap_or(1);
            return Err(LuceneError::query_parser("unterminated range expression", pos));
        }
        if ctx.frames.len() != 1 {
            let pos = lexemes.last().map(|l| l.position).unwrap_or(1);
            return Err(LuceneError::query_parser("unbalanced subquery parentheses", pos));
        }
        Ok(ctx.pop_frame())
    }

    /// Processes the lexeme at `lexemes[i]`, returning the next state and
    /// how many lexemes were consumed (`1`, or `2` when a trailing
    /// `Number` was eaten by `~`/`^`).
    fn step(
        &self,
        ctx: &mut ParserContext,
        state: State,
        lexemes: &[PositionedLexeme],
        i: usize,
        default_and: bool,
    ) -> LuceneResult<(State, usize)> {
        let tok = &lexemes[i];
        match state {
            State::Common => self.step_common(ctx, lexemes, i, default_and),
            State::ExpectRangeFrom => match &tok.lexeme {
                Lexeme::Word(w) => {
                    ctx.range.as_mut().expect("range state set on range start").from = Some(w.clone());
                    Ok((State::ExpectRangeTo, 1))
                }
                _ => Err(LuceneError::query_parser("expected range start term", tok.position)),
            },
            State::ExpectRangeTo => match &tok.lexeme {
                Lexeme::To => Ok((State::ExpectRangeLastTerm, 1)),
                _ => Err(LuceneError::query_parser("expected TO", tok.position)),
            },
            State::ExpectRangeLastTerm => match &tok.lexeme {
                Lexeme::Word(w) => {
                    ctx.range.as_mut().expect("range state set on range start").to = Some(w.clone());
                    Ok((State::ExpectRangeEnd, 1))
                }
                _ => Err(LuceneError::query_parser("expected range end term", tok.position)),
            },
            State::ExpectRangeEnd => self.step_range_end(ctx, tok),
        }
    }

    fn step_common(
        &self,
        ctx: &mut ParserContext,
        lexemes: &[PositionedLexeme],
        i: usize,
        default_and: bool,
    ) -> LuceneResult<(State, usize)> {
        let tok = &lexemes[i];
        match &tok.lexeme {
            Lexeme::Eof => Ok((State::Common, 1)),

            Lexeme::Word(text) => {
                let field = ctx.current_field.take().or_else(|| ctx.scope_field());
                let query = Query::Term { field, text: text.clone(), boost: 1.0 };
                ctx.top().push_clause(query, default_and);
                Ok((State::Common, 1))
            }

            Lexeme::Phrase(text) => {
                let field = ctx.current_field.take().or_else(|| ctx.scope_field());
                let terms = tokenize_phrase(text);
                let query = Query::Phrase { field, terms, slop: 0, boost: 1.0 };
                ctx.top().push_clause(query, default_and);
                Ok((State::Common, 1))
            }

            Lexeme::Field(name) => {
                ctx.current_field = Some(name.clone());
                Ok((State::Common, 1))
            }

            Lexeme::Required => {
                ctx.top().pending_sign = Sign::Required;
                Ok((State::Common, 1))
            }
            Lexeme::Prohibited | Lexeme::Not => {
                ctx.top().pending_sign = Sign::Prohibited;
                Ok((State::Common, 1))
            }

            Lexeme::And => {
                ctx.top().note_operator(LogicalOp::And);
                Ok((State::Common, 1))
            }
            Lexeme::Or => {
                ctx.top().note_operator(LogicalOp::Or);
                Ok((State::Common, 1))
            }

            Lexeme::FuzzyProx => {
                let (param, consumed) = take_number(lexemes, i + 1);
                ctx.top().apply_fuzzy_or_slop(param, self.config.fuzzy_min_similarity);
                Ok((State::Common, 1 + consumed))
            }
            Lexeme::Boosting => {
                let (param, consumed) = take_number(lexemes, i + 1);
                ctx.top().apply_boost(param.unwrap_or(1.0));
                Ok((State::Common, 1 + consumed))
            }

            Lexeme::SubqStart => {
                ctx.push_frame();
                Ok((State::Common, 1))
            }
            Lexeme::SubqEnd => {
                if ctx.frames.len() <= 1 {
                    return Err(LuceneError::query_parser("unmatched )", tok.position));
                }
                let sub_query = ctx.pop_frame();
                ctx.top().push_clause(sub_query, default_and);
                Ok((State::Common, 1))
            }

            Lexeme::RangeInclStart => {
                let field = ctx.current_field.take().or_else(|| ctx.scope_field());
                ctx.range = Some(RangeState { field, inclusive: true, from: None, to: None });
                Ok((State::ExpectRangeFrom, 1))
            }
            Lexeme::RangeExclStart => {
                let field = ctx.current_field.take().or_else(|| ctx.scope_field());
                ctx.range = Some(RangeState { field, inclusive: false, from: None, to: None });
                Ok((State::ExpectRangeFrom, 1))
            }

            other => Err(LuceneError::query_parser(format!("unexpected token {other:?}"), tok.position)),
        }
    }

    fn step_range_end(&self, ctx: &mut ParserContext, tok: &PositionedLexeme) -> LuceneResult<(State, usize)> {
        let range = ctx.range.as_ref().expect("range state set on range start");
        let matches_bracket = matches!(
            (range.inclusive, &tok.lexeme),
            (true, Lexeme::RangeInclEnd) | (false, Lexeme::RangeExclEnd)
        );
        if !matches_bracket {
            return Err(LuceneError::query_parser("mismatched range bracket", tok.position));
        }
        let range = ctx.range.take().expect("checked above");
        let query = Query::Range {
            field: range.field,
            from: range.from,
            to: range.to,
            inclusive: range.inclusive,
            boost: 1.0,
        };
        ctx.top().push_clause(query, false);
        Ok((State::Common, 1))
    }
}

/// `"phrase text"` tokenizes to plain lowercase whitespace-split words; the
/// parser doesn't depend on an `Analyzer` (that's `rewrite`/`execute`'s
/// concern, per `spec.md` §1's external-collaborator boundary), so this is
/// intentionally the simplest possible split.
fn tokenize_phrase(text: &str) -> Vec<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// If `lexemes[idx]` is a `Number`, returns it and `1` (consumed); else
/// `(None, 0)`. Used by `~`/`^` to optionally eat a trailing parameter.
fn take_number(lexemes: &[PositionedLexeme], idx: usize) -> (Option<f32>, usize) {
    match lexemes.get(idx).map(|t| &t.lexeme) {
        Some(Lexeme::Number(n)) => (Some(*n), 1),
        _ => (None, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> QueryParser {
        QueryParser::new(QueryParserConfig { suppress_errors: false, ..QueryParserConfig::default() })
    }

    #[test]
    fn parses_field_qualified_phrase_and_term_with_and() {
        let query = parser().parse("title:\"The Right Way\" AND text:go").unwrap();
        assert_eq!(query.to_string(), "+(title:\"the right way\") +(text:go)");
    }

    #[test]
    fn parses_bare_terms_as_optional_by_default() {
        let query = parser().parse("jakarta apache").unwrap();
        let Query::Boolean { clauses, .. } = query else { panic!("expected Boolean") };
        assert_eq!(clauses.len(), 2);
        assert!(clauses.iter().all(|(sign, _)| *sign == Sign::Optional));
    }

    #[test]
    fn trailing_boost_applies_to_the_preceding_term() {
        let query = parser().parse("jakarta^4 apache").unwrap();
        let Query::Boolean { clauses, .. } = query else { panic!("expected Boolean") };
        assert_eq!(clauses[0].1.boost(), 4.0);
        assert_eq!(clauses[1].1.boost(), 1.0);
    }

    #[test]
    fn bare_fuzzy_uses_configured_default_similarity() {
        let query = parser().parse("roam~").unwrap();
        let Query::Fuzzy { min_similarity, .. } = query else { panic!("expected Fuzzy") };
        assert_eq!(min_similarity, 0.5);
    }

    #[test]
    fn explicit_fuzzy_similarity_overrides_default() {
        let query = parser().parse("roam~0.7").unwrap();
        let Query::Fuzzy { min_similarity, .. } = query else { panic!("expected Fuzzy") };
        assert_eq!(min_similarity, 0.7);
    }

    #[test]
    fn sloppy_phrase_captures_slop() {
        let query = parser().parse("\"jakarta apache\"~4").unwrap();
        let Query::Phrase { slop, .. } = query else { panic!("expected Phrase") };
        assert_eq!(slop, 4);
    }

    #[test]
    fn inclusive_and_exclusive_ranges_parse() {
        let incl = parser().parse("[a TO b]").unwrap();
        assert!(matches!(incl, Query::Range { inclusive: true, .. }));
        let excl = parser().parse("{a TO b}").unwrap();
        assert!(matches!(excl, Query::Range { inclusive: false, .. }));
    }

    #[test]
    fn subquery_field_scope_applies_to_bare_inner_terms() {
        let query = parser().parse("title:(foo bar)").unwrap();
        let Query::Boolean { clauses, .. } = query else { panic!("expected Boolean") };
        for (_, clause) in &clauses {
            let Query::Term { field, .. } = clause else { panic!("expected Term") };
            assert_eq!(field.as_deref(), Some("title"));
        }
    }

    #[test]
    fn required_and_prohibited_prefixes_set_sign() {
        let query = parser().parse("+foo -bar").unwrap();
        let Query::Boolean { clauses, .. } = query else { panic!("expected Boolean") };
        assert_eq!(clauses[0].0, Sign::Required);
        assert_eq!(clauses[1].0, Sign::Prohibited);
    }

    #[test]
    fn mismatched_range_bracket_reports_char_position() {
        let err = parser().parse("contents:[business TO by}").unwrap_err();
        match err {
            LuceneError::QueryParserError { position, .. } => assert_eq!(position, 25),
            other => panic!("expected QueryParserError, got {other:?}"),
        }
    }

    #[test]
    fn suppress_mode_falls_back_to_flat_multi_term() {
        let suppressing = QueryParser::new(QueryParserConfig::default());
        let query = suppressing.parse("contents:[business TO by}").unwrap();
        assert_eq!(query.to_string(), "contents business to by");
    }
}
