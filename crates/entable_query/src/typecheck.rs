//! Type checking of `$filter` expressions against a schema snapshot.
//!
//! Every operand path is resolved to a primitive type and every literal is
//! run through the coercion table, so a [`TypedPredicate`] only holds
//! comparable values. Checks run in a fixed order per comparison: the
//! operand must resolve, a relational operator must not meet a Boolean
//! operand, and the literal must fit the operand's grammar and bound.

use entable_foundation::edm::coerce_literal;
use entable_foundation::{Error, Literal, LiteralFault, Primitive, Result, Scalar};
use entable_schema::{EntityType, SchemaSnapshot};
use tracing::trace;

use crate::ast::{CompareOp, Expr, PropertyPath};
use crate::parser::parse_filter;
use crate::path::{Resolved, resolve};

/// A type-checked predicate, ready to evaluate or to lower into a store query.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedPredicate {
    /// Compare the values at `path` with `value`.
    Compare {
        /// Property path, outermost first.
        path: Vec<String>,
        /// Resolved type of the values at `path`.
        primitive: Primitive,
        /// Operator.
        op: CompareOp,
        /// Coerced literal; [`Scalar::Null`] for `null`.
        value: Scalar,
    },
    /// A string value at `path` starts with `prefix`.
    StartsWith {
        /// Property path.
        path: Vec<String>,
        /// Prefix.
        prefix: String,
    },
    /// A string value at `path` contains `needle`; an empty needle never matches.
    SubstringOf {
        /// Property path.
        path: Vec<String>,
        /// Needle.
        needle: String,
    },
    /// Both hold.
    And(Box<TypedPredicate>, Box<TypedPredicate>),
    /// Either holds.
    Or(Box<TypedPredicate>, Box<TypedPredicate>),
    /// Matches nothing (operand names a property no instance has set).
    Never,
}

impl TypedPredicate {
    /// Conjunction, folding [`TypedPredicate::Never`].
    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        match (left, right) {
            (Self::Never, _) | (_, Self::Never) => Self::Never,
            (l, r) => Self::And(Box::new(l), Box::new(r)),
        }
    }

    /// Disjunction, folding [`TypedPredicate::Never`].
    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        match (left, right) {
            (Self::Never, other) | (other, Self::Never) => other,
            (l, r) => Self::Or(Box::new(l), Box::new(r)),
        }
    }
}

/// Type-checks `expr` against `entity_type`.
///
/// # Errors
///
/// - `UNKNOWN_QUERY_KEY` for reserved-looking or undeclared nested operands
/// - `FILTER_PARSE_ERROR` for a relational operator on a Boolean operand
/// - `OPERATOR_AND_OPERAND_TYPE_MISMATCHED` for literals of the wrong kind,
///   string functions on non-String operands, and complex operands
/// - `UNSUPPORTED_OPERAND_FORMAT` for in-grammar literals out of bound
pub fn typecheck(
    expr: &Expr,
    snapshot: &SchemaSnapshot,
    entity_type: &EntityType,
) -> Result<TypedPredicate> {
    match expr {
        Expr::And(l, r) => Ok(TypedPredicate::and(
            typecheck(l, snapshot, entity_type)?,
            typecheck(r, snapshot, entity_type)?,
        )),
        Expr::Or(l, r) => Ok(TypedPredicate::or(
            typecheck(l, snapshot, entity_type)?,
            typecheck(r, snapshot, entity_type)?,
        )),
        Expr::Compare {
            path,
            op,
            op_span,
            literal,
            ..
        } => {
            let Some(primitive) = operand_type(snapshot, entity_type, path)? else {
                return Ok(TypedPredicate::Never);
            };
            if op.is_relational() && primitive == Primitive::Boolean {
                return Err(Error::filter_parse(
                    format!("operator {op} cannot compare boolean property {path}"),
                    op_span.column,
                ));
            }
            let value = coerce_literal(primitive, literal).map_err(|fault| match fault {
                LiteralFault::Mismatch => Error::type_mismatch(path.to_string()),
                LiteralFault::OutOfBound => Error::unsupported_operand(path.to_string()),
            })?;
            Ok(TypedPredicate::Compare {
                path: path.segments.clone(),
                primitive,
                op: *op,
                value,
            })
        }
        Expr::StartsWith { path, literal, .. } => {
            let Some(prefix) = string_function(snapshot, entity_type, path, literal)? else {
                return Ok(TypedPredicate::Never);
            };
            Ok(TypedPredicate::StartsWith {
                path: path.segments.clone(),
                prefix,
            })
        }
        Expr::SubstringOf { literal, path, .. } => {
            let Some(needle) = string_function(snapshot, entity_type, path, literal)? else {
                return Ok(TypedPredicate::Never);
            };
            Ok(TypedPredicate::SubstringOf {
                path: path.segments.clone(),
                needle,
            })
        }
    }
}

/// Parses and type-checks raw (possibly percent-encoded) `$filter` text.
///
/// # Errors
///
/// Returns the parse error, or the first type error in source order.
pub fn compile_filter(
    snapshot: &SchemaSnapshot,
    entity_type: &EntityType,
    raw: &str,
) -> Result<TypedPredicate> {
    let expr = parse_filter(raw)?;
    let predicate = typecheck(&expr, snapshot, entity_type)?;
    trace!(entity_type = %entity_type.name, ?predicate, "compiled filter");
    Ok(predicate)
}

/// Resolves an operand; `None` means the predicate matches nothing.
fn operand_type(
    snapshot: &SchemaSnapshot,
    entity_type: &EntityType,
    path: &PropertyPath,
) -> Result<Option<Primitive>> {
    match resolve(snapshot, entity_type, &path.segments) {
        Resolved::Reserved(p) | Resolved::Dynamic(p) => Ok(Some(p)),
        Resolved::Leaf { primitive, .. } => Ok(Some(primitive)),
        Resolved::Complex { .. } => Err(Error::type_mismatch(path.to_string())),
        Resolved::Unset => Ok(None),
        Resolved::Unknown => Err(Error::unknown_query_key(path.to_string())),
    }
}

fn string_function(
    snapshot: &SchemaSnapshot,
    entity_type: &EntityType,
    path: &PropertyPath,
    literal: &Literal,
) -> Result<Option<String>> {
    let Some(primitive) = operand_type(snapshot, entity_type, path)? else {
        return Ok(None);
    };
    match (primitive, literal) {
        (Primitive::String, Literal::String(text)) => Ok(Some(text.clone())),
        _ => Err(Error::type_mismatch(path.to_string())),
    }
}
