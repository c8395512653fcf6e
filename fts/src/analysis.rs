//! The analyzer interface the core consumes (`spec.md` §1: "token analyzers
//! ... are described only by the interfaces the core consumes"), plus two
//! trivial default implementations so the crate is runnable and testable
//! end to end without pulling in a real NLP layer.

/// A single analyzed token and the UTF-8 byte offsets it came from in the
/// original field value (kept for a future highlighter; the core itself
/// only consumes `text` and `position_increment`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Number of term positions this token advances by; always 1 for the
    /// shipped analyzers. A richer analyzer (synonym injection, stop-word
    /// removal preserving slop) would vary this.
    pub position_increment: u32,
}

/// The interface the writer (`addDocument`) and the query rewriter
/// (tokenizing a `Term`/`Phrase` node, `spec.md` §4.9) consume. Any richer
/// analyzer (stemming, stop words, HTML extraction) is a caller-supplied
/// implementation; this crate ships only the two trivial ones below.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, field: &str, text: &str) -> Vec<Token>;
}

/// Splits on Unicode whitespace, lowercases. This is the default analyzer
/// for `FieldValue::Text`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceAnalyzer;

impl Analyzer for WhitespaceAnalyzer {
    fn analyze(&self, _field: &str, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut chars = text.char_indices().peekable();
        while let Some(&(start, c)) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
                continue;
            }
            let mut end = start;
            while let Some(&(idx, c)) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                end = idx + c.len_utf8();
                chars.next();
            }
            tokens.push(Token {
                text: text[start..end].to_lowercase(),
                start_offset: start,
                end_offset: end,
                position_increment: 1,
            });
        }
        tokens
    }
}

/// Yields the field value as a single untokenized token; used for
/// `FieldValue::Keyword`.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordAnalyzer;

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, _field: &str, text: &str) -> Vec<Token> {
        vec![Token {
            text: text.to_string(),
            start_offset: 0,
            end_offset: text.len(),
            position_increment: 1,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_lowercases_and_splits() {
        let toks = WhitespaceAnalyzer.analyze("body", "The Quick  Brown\tFox");
        let words: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["the", "quick", "brown", "fox"]);
    }

    #[test]
    fn keyword_is_single_token() {
        let toks = KeywordAnalyzer.analyze("id", "SKU-123");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].text, "SKU-123");
    }
}
