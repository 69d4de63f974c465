pub mod default;

use thiserror::Error;
use crate::ast::{Arena, Sequence};
use crate::lexer::{Lexer, Token};

pub use default::DefaultParser;

/// A syntax or lexical error pointing at a byte offset of the input line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub pos: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(pos: usize, message: impl Into<String>) -> Self {
        ParseError { pos, message: message.into() }
    }

    /// Two lines: the input line holding `pos` and a caret under the
    /// offending byte.
    pub fn caret(&self, input: &str) -> String {
        let pos = self.pos.min(input.len());
        let start = input.as_bytes()[..pos].iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        let end = input[start..].find('\n').map_or(input.len(), |i| start + i);
        let line = &input[start..end];
        // Count chars, not bytes, so the caret lines up under multi-byte text.
        let col = line
            .get(..pos - start)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(pos - start);
        format!("  {}\n  {}^", line, " ".repeat(col))
    }
}

/// Output of one parse. The arena and sequence are usable (possibly empty)
/// even when `error` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub arena: Arena,
    pub sequence: Sequence,
    pub error: Option<ParseError>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub fn parse(tokens: &[Token]) -> ParseResult {
    DefaultParser::new(tokens).parse()
}

/// Lex and parse one input string.
pub fn parse_line(input: &str) -> ParseResult {
    let lexed = Lexer::lex(input);
    parse(&lexed.tokens)
}
