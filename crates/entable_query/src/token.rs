//! Token types for `$filter` expressions.
//!
//! Tokens are the output of the lexer and input to the parser.

use entable_foundation::Literal;

use crate::span::Span;

/// A token from lexical analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The type and value of this token.
    pub kind: TokenKind,
    /// Source location of this token.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns the text this token covers in the given source.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

/// Token types for `$filter` expressions.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `/` between path segments
    Slash,
    /// Property name, operator word, or function name
    Ident(String),
    /// Quoted, numeric, boolean, or null literal
    Literal(Literal),
    /// End of input
    Eof,
    /// Lexer error
    Error(String),
}

impl TokenKind {
    /// Returns a human-readable name for this token kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::Comma => "','",
            Self::Slash => "'/'",
            Self::Ident(_) => "identifier",
            Self::Literal(lit) => lit.kind_name(),
            Self::Eof => "end of input",
            Self::Error(_) => "error",
        }
    }

    /// Returns true if this is the identifier `word`.
    #[must_use]
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Self::Ident(name) if name == word)
    }
}
