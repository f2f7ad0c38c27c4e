//! Query engines for Entable: `$filter`, `$orderby`, `$select`, `$top`/`$skip`.
//!
//! This crate provides:
//! - [`Lexer`] / [`Parser`] - Tokenizer and recursive-descent parser for filter text
//! - [`typecheck()`] - Resolves operands and coerces literals into a [`TypedPredicate`]
//! - [`evaluate`] - Decides a predicate against a stored [`Document`](entable_schema::Document)
//! - [`compile_orderby`] / [`sort_documents`] - Multi-key stable ordering
//! - [`compile_select`] / [`project`] - Top-level projection
//! - [`Paging`] - Bounded `$top` / `$skip` windows

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod orderby;
pub mod paging;
pub mod parser;
pub mod path;
pub mod select;
pub mod span;
pub mod token;
pub mod typecheck;

pub use ast::{CompareOp, Expr, PropertyPath};
pub use eval::{evaluate, filter_documents};
pub use lexer::Lexer;
pub use orderby::{SortDirection, SortKey, compile_orderby, sort_documents};
pub use paging::Paging;
pub use parser::{Parser, parse_filter};
pub use path::{Resolved, reserved_type, resolve};
pub use select::{Projection, compile_select, project};
pub use span::Span;
pub use token::{Token, TokenKind};
pub use typecheck::{TypedPredicate, compile_filter, typecheck};
