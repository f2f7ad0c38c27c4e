//! Evaluation of typed predicates against stored documents.
//!
//! Paths crossing a list apply *any* semantics: the predicate holds if it
//! holds for at least one element.

use std::cmp::Ordering;

use entable_foundation::{Primitive, Scalar};
use entable_schema::Document;
use serde_json::Value as Json;

use crate::ast::CompareOp;
use crate::typecheck::TypedPredicate;

/// Returns true if `document` satisfies `predicate`.
#[must_use]
pub fn evaluate(predicate: &TypedPredicate, document: &Document) -> bool {
    match predicate {
        TypedPredicate::Never => false,
        TypedPredicate::And(l, r) => evaluate(l, document) && evaluate(r, document),
        TypedPredicate::Or(l, r) => evaluate(l, document) || evaluate(r, document),
        TypedPredicate::Compare {
            path,
            primitive,
            op,
            value,
        } => with_leaves(document, path, |leaves| {
            compare_leaves(leaves, *primitive, *op, value)
        }),
        TypedPredicate::StartsWith { path, prefix } => with_leaves(document, path, |leaves| {
            leaves
                .iter()
                .filter_map(|v| v.as_str())
                .any(|s| s.starts_with(prefix.as_str()))
        }),
        TypedPredicate::SubstringOf { path, needle } => {
            !needle.is_empty()
                && with_leaves(document, path, |leaves| {
                    leaves
                        .iter()
                        .filter_map(|v| v.as_str())
                        .any(|s| s.contains(needle.as_str()))
                })
        }
    }
}

/// Keeps the documents satisfying `predicate`, preserving order.
#[must_use]
pub fn filter_documents(predicate: &TypedPredicate, documents: Vec<Document>) -> Vec<Document> {
    documents
        .into_iter()
        .filter(|d| evaluate(predicate, d))
        .collect()
}

/// Calls `f` with every leaf value reachable through `path`.
///
/// Arrays are flattened at every level; a missing segment contributes no
/// leaves.
pub(crate) fn with_leaves<R>(
    document: &Document,
    path: &[String],
    f: impl FnOnce(&[&Json]) -> R,
) -> R {
    let root = path
        .split_first()
        .and_then(|(first, rest)| document.value(first).map(|value| (value, rest)));
    let mut leaves = Vec::new();
    if let Some((value, rest)) = &root {
        collect(value, rest, &mut leaves);
    }
    f(&leaves)
}

fn collect<'a>(value: &'a Json, rest: &[String], out: &mut Vec<&'a Json>) {
    match value {
        Json::Array(items) => {
            for item in items {
                collect(item, rest, out);
            }
        }
        _ if rest.is_empty() => out.push(value),
        Json::Object(map) => {
            if let Some(child) = map.get(&rest[0]) {
                collect(child, &rest[1..], out);
            }
        }
        _ => {}
    }
}

fn compare_leaves(leaves: &[&Json], primitive: Primitive, op: CompareOp, value: &Scalar) -> bool {
    let mut present = leaves.iter().filter(|v| !v.is_null());
    match (op, value) {
        (CompareOp::Eq, Scalar::Null) => present.next().is_none(),
        (CompareOp::Ne, Scalar::Null) => present.next().is_some(),
        (_, Scalar::Null) => false,
        (CompareOp::Ne, _) => {
            let mut present = present.peekable();
            present.peek().is_none()
                || present.any(|v| {
                    Scalar::from_json(primitive, v)
                        .and_then(|s| s.compare(value))
                        .is_none_or(|o| o != Ordering::Equal)
                })
        }
        (op, _) => present.any(|v| {
            Scalar::from_json(primitive, v)
                .and_then(|s| s.compare(value))
                .is_some_and(|o| accepts(op, o))
        }),
    }
}

const fn accepts(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => matches!(ordering, Ordering::Equal),
        CompareOp::Ne => !matches!(ordering, Ordering::Equal),
        CompareOp::Gt => matches!(ordering, Ordering::Greater),
        CompareOp::Ge => !matches!(ordering, Ordering::Less),
        CompareOp::Lt => matches!(ordering, Ordering::Less),
        CompareOp::Le => !matches!(ordering, Ordering::Greater),
    }
}
