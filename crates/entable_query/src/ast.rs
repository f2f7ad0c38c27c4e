//! Abstract syntax tree for `$filter` expressions.
//!
//! The AST is untyped: property paths are still names and literals are
//! still lexical kinds. [`crate::typecheck`] resolves both against a schema.

use std::fmt;

use entable_foundation::Literal;

use crate::span::Span;

/// A `/`-separated property path such as `address/city`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyPath {
    /// Path segments, outermost first.
    pub segments: Vec<String>,
    /// Source location of the whole path.
    pub span: Span,
}

impl PropertyPath {
    /// Creates a single-segment path.
    #[must_use]
    pub fn single(name: impl Into<String>, span: Span) -> Self {
        Self {
            segments: vec![name.into()],
            span,
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Comparison operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `eq`
    Eq,
    /// `ne`
    Ne,
    /// `gt`
    Gt,
    /// `ge`
    Ge,
    /// `lt`
    Lt,
    /// `le`
    Le,
}

impl CompareOp {
    /// Parses a lowercase operator word.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "ge" => Self::Ge,
            "lt" => Self::Lt,
            "le" => Self::Le,
            _ => return None,
        })
    }

    /// Returns the operator word.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }

    /// Returns true for `gt`, `ge`, `lt` and `le`.
    #[must_use]
    pub const fn is_relational(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `$filter` expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// `path op literal`
    Compare {
        /// Left operand.
        path: PropertyPath,
        /// Operator.
        op: CompareOp,
        /// Location of the operator word.
        op_span: Span,
        /// Right operand.
        literal: Literal,
        /// Location of the literal.
        literal_span: Span,
    },
    /// `startswith(path, literal)`
    StartsWith {
        /// Property tested.
        path: PropertyPath,
        /// Prefix literal.
        literal: Literal,
        /// Location of the call.
        span: Span,
    },
    /// `substringof(literal, path)`
    SubstringOf {
        /// Needle literal.
        literal: Literal,
        /// Property searched.
        path: PropertyPath,
        /// Location of the call.
        span: Span,
    },
    /// `left and right`
    And(Box<Expr>, Box<Expr>),
    /// `left or right`
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Returns every property path the expression mentions, left to right.
    #[must_use]
    pub fn paths(&self) -> Vec<&PropertyPath> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a PropertyPath>) {
        match self {
            Self::Compare { path, .. }
            | Self::StartsWith { path, .. }
            | Self::SubstringOf { path, .. } => out.push(path),
            Self::And(l, r) | Self::Or(l, r) => {
                l.collect_paths(out);
                r.collect_paths(out);
            }
        }
    }
}
