//! Lexer for `$filter` expressions.
//!
//! The lexer converts decoded query text into a stream of tokens. Numeric
//! literals keep their lexical kind (integer, decimal, exponent, suffixed)
//! because the coercion table decides validity by kind, not by value.

use entable_foundation::Literal;

use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Lexer for `$filter` text.
pub struct Lexer<'src> {
    /// Source text being tokenized.
    source: &'src str,
    /// Remaining source text.
    rest: &'src str,
    /// Current byte offset in source.
    position: usize,
    /// Current column number (1-based, in characters).
    column: u32,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            rest: source,
            position: 0,
            column: 1,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.position;
        let start_column = self.column;

        let Some(c) = self.peek_char() else {
            return Token::new(TokenKind::Eof, Span::new(start, start, start_column));
        };

        let kind = match c {
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '/' => {
                self.advance();
                TokenKind::Slash
            }
            '\'' => self.scan_string(),
            c if c.is_ascii_digit() => self.scan_number(),
            '-' if self.peek_char_n(1).is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_ident(),
            c => {
                self.advance();
                TokenKind::Error(format!("unexpected character: {c}"))
            }
        };

        Token::new(kind, Span::new(start, self.position, start_column))
    }

    /// Tokenizes all source and returns a vector of tokens ending in `Eof`.
    #[must_use]
    pub fn tokenize_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek_char_n(&self, n: usize) -> Option<char> {
        self.rest.chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            let len = c.len_utf8();
            self.rest = &self.rest[len..];
            self.position += len;
            self.column += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Scans a quoted string; `''` inside quotes is one quote.
    fn scan_string(&mut self) -> TokenKind {
        self.advance(); // consume opening quote
        let mut text = String::new();
        loop {
            match self.peek_char() {
                Some('\'') if self.peek_char_n(1) == Some('\'') => {
                    self.advance();
                    self.advance();
                    text.push('\'');
                }
                Some('\'') => {
                    self.advance();
                    return TokenKind::Literal(Literal::String(text));
                }
                Some(c) => {
                    self.advance();
                    text.push(c);
                }
                None => return TokenKind::Error("unterminated string literal".into()),
            }
        }
    }

    /// Scans a numeric literal and classifies its lexical kind.
    fn scan_number(&mut self) -> TokenKind {
        let start = self.position;
        if self.peek_char() == Some('-') {
            self.advance();
        }
        self.skip_digits();

        let mut decimal = false;
        if self.peek_char() == Some('.') && self.peek_char_n(1).is_some_and(|c| c.is_ascii_digit())
        {
            decimal = true;
            self.advance();
            self.skip_digits();
        }

        let mut exponent = false;
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let signed = matches!(self.peek_char_n(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_char_n(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                exponent = true;
                for _ in 0..digit_at {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let number_end = self.position;
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let number = &self.source[start..number_end];
        let text = &self.source[start..self.position];
        let suffix = &self.source[number_end..self.position];

        let literal = match (suffix, decimal, exponent) {
            ("", false, false) => Literal::Integer {
                text: number.to_string(),
                long: false,
            },
            ("", true, false) => Literal::Decimal(number.to_string()),
            ("", _, true) => Literal::Exponent(number.to_string()),
            ("L" | "l", false, false) => Literal::Integer {
                text: number.to_string(),
                long: true,
            },
            _ => Literal::Suffixed(text.to_string()),
        };
        TokenKind::Literal(literal)
    }

    /// Scans an identifier; `true`, `false` and `null` become literals.
    fn scan_ident(&mut self) -> TokenKind {
        let start = self.position;
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            self.advance();
        }
        match &self.source[start..self.position] {
            "true" => TokenKind::Literal(Literal::Boolean(true)),
            "false" => TokenKind::Literal(Literal::Boolean(false)),
            "null" => TokenKind::Literal(Literal::Null),
            name => TokenKind::Ident(name.to_string()),
        }
    }
}
