//! Turns a raw query string into the lexeme stream the FSM (`spec.md`
//! §4.8) consumes. Tracks 1-based character positions so syntax errors can
//! report `"Syntax error at char position N."` exactly as `spec.md` §8
//! requires.

use crate::error::{LuceneError, LuceneResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Lexeme {
    Word(String),
    Phrase(String),
    Field(String),
    Required,
    Prohibited,
    FuzzyProx,
    Boosting,
    RangeInclStart,
    RangeInclEnd,
    RangeExclStart,
    RangeExclEnd,
    SubqStart,
    SubqEnd,
    And,
    Or,
    Not,
    To,
    Number(f32),
    Eof,
}

/// One lexeme plus the 1-based character position it started at.
#[derive(Debug, Clone)]
pub struct PositionedLexeme {
    pub lexeme: Lexeme,
    pub position: usize,
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer { chars: input.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn is_special(c: char) -> bool {
        matches!(c, '+' | '-' | '~' | '^' | '[' | ']' | '{' | '}' | '(' | ')' | ':' | '"' | '&' | '|' | '!')
    }

    /// Tokenizes the entire input eagerly; query strings are short enough
    /// that streaming isn't worth the complexity.
    pub fn tokenize(mut self) -> LuceneResult<Vec<PositionedLexeme>> {
        let mut out = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(c) = self.peek() else {
                out.push(PositionedLexeme { lexeme: Lexeme::Eof, position: start + 1 });
                break;
            };
            let position = start + 1;
            let lexeme = match c {
                '+' => { self.bump(); Lexeme::Required }
                '-' => { self.bump(); Lexeme::Prohibited }
                '~' => { self.bump(); Lexeme::FuzzyProx }
                '^' => { self.bump(); Lexeme::Boosting }
                '[' => { self.bump(); Lexeme::RangeInclStart }
                ']' => { self.bump(); Lexeme::RangeInclEnd }
                '{' => { self.bump(); Lexeme::RangeExclStart }
                '}' => { self.bump(); Lexeme::RangeExclEnd }
                '(' => { self.bump(); Lexeme::SubqStart }
                ')' => { self.bump(); Lexeme::SubqEnd }
                '!' => { self.bump(); Lexeme::Not }
                '"' => self.scan_phrase(position)?,
                '&' if self.peek_at(1) == Some('&') => { self.pos += 2; Lexeme::And }
                '|' if self.peek_at(1) == Some('|') => { self.pos += 2; Lexeme::Or }
                _ => self.scan_word(),
            };
            out.push(PositionedLexeme { lexeme, position });
        }
        Ok(out)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn scan_phrase(&mut self, position: usize) -> LuceneResult<Lexeme> {
        self.bump(); // opening quote
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '"' {
                let text: String = self.chars[start..self.pos].iter().collect();
                self.bump();
                return Ok(Lexeme::Phrase(text));
            }
            self.pos += 1;
        }
        Err(LuceneError::query_parser("unterminated phrase", position))
    }

    /// Scans a bare word, recognizing the reserved keywords `AND`/`OR`/
    /// `NOT`/`TO` (exact case, matching Lucene's classic QueryParser), a
    /// trailing `:` as a field qualifier, and a leading-digit/sign/dot run
    /// as a `Number` (used after `~`/`^`).
    fn scan_word(&mut self) -> Lexeme {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || Self::is_special(c) {
                break;
            }
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        if self.peek() == Some(':') {
            self.pos += 1;
            return Lexeme::Field(word);
        }
        match word.as_str() {
            "AND" => Lexeme::And,
            "OR" => Lexeme::Or,
            "NOT" => Lexeme::Not,
            "TO" => Lexeme::To,
            _ => {
                if let Ok(n) = word.parse::<f32>() {
                    Lexeme::Number(n)
                } else {
                    Lexeme::Word(word)
                }
            }
        }
    }

    /// Re-tokenizes the raw input into plain lowercase words, splitting on
    /// any non-alphanumeric run, for the suppress-mode fallback
    /// (`spec.md` §4.8). Used instead of `tokenize` when a syntax error is
    /// caught and the parser falls back to a flat `MultiTerm`.
    pub fn fallback_words(input: &str) -> Vec<String> {
        input
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_field_and_range() {
        let toks = Lexer::new("contents:[business TO by}").tokenize().unwrap();
        let kinds: Vec<&Lexeme> = toks.iter().map(|t| &t.lexeme).collect();
        assert_eq!(
            kinds,
            vec![
                &Lexeme::Field("contents".into()),
                &Lexeme::RangeInclStart,
                &Lexeme::Word("business".into()),
                &Lexeme::To,
                &Lexeme::Word("by".into()),
                &Lexeme::RangeExclEnd,
                &Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn reports_one_based_char_position_of_mismatched_bracket() {
        let toks = Lexer::new("contents:[business TO by}").tokenize().unwrap();
        let close = toks.iter().find(|t| t.lexeme == Lexeme::RangeExclEnd).unwrap();
        assert_eq!(close.position, 25);
    }

    #[test]
    fn fallback_words_splits_on_punctuation() {
        let words = Lexer::fallback_words("contents:[business TO by}");
        assert_eq!(words, vec!["contents", "business", "to", "by"]);
    }
}
