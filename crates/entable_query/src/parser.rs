//! Parser for `$filter` expressions.
//!
//! ```text
//! expr       := and_expr ( "or" and_expr )*
//! and_expr   := primary ( "and" primary )*
//! primary    := "(" expr ")" | function | comparison
//! function   := "startswith" "(" path "," literal ")"
//!             | "substringof" "(" literal "," path ")"
//! comparison := path ( "eq" | "ne" | "gt" | "ge" | "lt" | "le" ) literal
//! path       := name ( "/" name )*
//! ```
//!
//! Operator and function words are lowercase only.

use entable_foundation::{Error, Literal, Result};
use entable_schema::is_valid_name;

use crate::ast::{CompareOp, Expr, PropertyPath};
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parser for `$filter` text.
pub struct Parser<'src> {
    /// All tokens, ending with `Eof`.
    tokens: Vec<Token>,
    /// Index of the current token.
    position: usize,
    /// Source text (for names spelled like literals).
    source: &'src str,
}

impl<'src> Parser<'src> {
    /// Creates a new parser over decoded filter text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            tokens: Lexer::tokenize_all(source),
            position: 0,
            source,
        }
    }

    /// Parses the whole source as one expression.
    ///
    /// # Errors
    ///
    /// Returns `FILTER_PARSE_ERROR` with the column of the offending token.
    pub fn parse(&mut self) -> Result<Expr> {
        if self.current().kind == TokenKind::Eof {
            return Err(self.error("empty filter"));
        }
        let expr = self.parse_or()?;
        match &self.current().kind {
            TokenKind::Eof => Ok(expr),
            kind => Err(self.error(&format!("unexpected {}", kind.name()))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.current().kind.is_word("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_primary()?;
        while self.current().kind.is_word("and") {
            self.advance();
            let right = self.parse_primary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match &self.current().kind {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_or()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Ident(word)
                if (word == "startswith" || word == "substringof")
                    && self.peek().kind == TokenKind::LParen =>
            {
                let is_startswith = word == "startswith";
                self.parse_function(is_startswith)
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_function(&mut self, is_startswith: bool) -> Result<Expr> {
        let start = self.current().span;
        self.advance(); // function name
        self.expect(&TokenKind::LParen)?;
        let expr = if is_startswith {
            let path = self.parse_path()?;
            self.expect(&TokenKind::Comma)?;
            let (literal, _) = self.parse_literal()?;
            let end = self.current().span;
            self.expect(&TokenKind::RParen)?;
            Expr::StartsWith {
                path,
                literal,
                span: start.to(end),
            }
        } else {
            let (literal, _) = self.parse_literal()?;
            self.expect(&TokenKind::Comma)?;
            let path = self.parse_path()?;
            let end = self.current().span;
            self.expect(&TokenKind::RParen)?;
            Expr::SubstringOf {
                literal,
                path,
                span: start.to(end),
            }
        };
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let path = self.parse_path()?;

        let op_span = self.current().span;
        let op = match &self.current().kind {
            TokenKind::Ident(word) => CompareOp::from_word(word)
                .ok_or_else(|| self.error(&format!("unknown operator: {word}")))?,
            kind => return Err(self.error(&format!("expected operator, found {}", kind.name()))),
        };
        self.advance();

        let (literal, literal_span) = self.parse_literal()?;
        Ok(Expr::Compare {
            path,
            op,
            op_span,
            literal,
            literal_span,
        })
    }

    fn parse_path(&mut self) -> Result<PropertyPath> {
        let start = self.current().span;
        let mut segments = vec![self.parse_name()?];
        let mut end = start;
        while self.current().kind == TokenKind::Slash {
            self.advance();
            end = self.current().span;
            segments.push(self.parse_name()?);
        }
        Ok(PropertyPath {
            segments,
            span: start.to(end),
        })
    }

    /// Parses one path segment.
    ///
    /// Names spelled like literals (`123`, `true`) are taken verbatim.
    fn parse_name(&mut self) -> Result<String> {
        let token = self.current();
        let name = match &token.kind {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Literal(Literal::String(_)) => {
                return Err(self.error("expected property name, found string"));
            }
            TokenKind::Literal(_) if is_valid_name(token.text(self.source)) => {
                token.text(self.source).to_string()
            }
            kind => {
                return Err(self.error(&format!("expected property name, found {}", kind.name())));
            }
        };
        self.advance();
        Ok(name)
    }

    fn parse_literal(&mut self) -> Result<(Literal, Span)> {
        let span = self.current().span;
        match &self.current().kind {
            TokenKind::Literal(literal) => {
                let literal = literal.clone();
                self.advance();
                Ok((literal, span))
            }
            TokenKind::Error(message) => Err(self.error(message)),
            kind => Err(self.error(&format!("expected literal, found {}", kind.name()))),
        }
    }

    fn current(&self) -> &Token {
        // tokenize_all always ends with Eof and advance never passes it
        &self.tokens[self.position]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.position + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: &TokenKind) -> Result<()> {
        if &self.current().kind == expected {
            self.advance();
            Ok(())
        } else if let TokenKind::Error(message) = &self.current().kind {
            Err(self.error(message))
        } else {
            Err(self.error(&format!(
                "expected {}, found {}",
                expected.name(),
                self.current().kind.name()
            )))
        }
    }

    fn error(&self, message: &str) -> Error {
        self.error_at(self.current().span, message)
    }

    #[allow(clippy::unused_self)]
    fn error_at(&self, span: Span, message: &str) -> Error {
        Error::filter_parse(message, span.column)
    }
}

/// Percent-decodes `$filter` text and parses it.
///
/// # Errors
///
/// Returns `FILTER_PARSE_ERROR` when decoding or parsing fails.
pub fn parse_filter(raw: &str) -> Result<Expr> {
    let decoded = urlencoding::decode(raw)
        .map_err(|_| Error::filter_parse("filter is not valid UTF-8 after decoding", 1))?;
    Parser::new(&decoded).parse()
}
