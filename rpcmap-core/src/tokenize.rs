//! Heuristic source tokenizer.
//!
//! Not a lexer: line breaks, tabs, spaces, `;`, `{` and `}` all act as token
//! boundaries and everything else is kept verbatim. String literals and
//! comments are not recognized, so their contents tokenize like code.

/// Characters that separate tokens.
#[inline]
fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | ';' | '{' | '}')
}

/// Splits source text into an ordered sequence of non-empty tokens.
///
/// Tokens borrow from `source`; no intermediate normalized copy is built.
pub fn tokenize(source: &str) -> Vec<&str> {
    source
        .split(is_separator)
        .filter(|token| !token.is_empty())
        .collect()
}
