//! `$orderby` compilation and stable multi-key sorting.

use std::cmp::Ordering;

use entable_foundation::{Error, ErrorKind, Primitive, Result, Scalar};
use entable_schema::{Document, EntityType, SchemaSnapshot};

use crate::eval::with_leaves;
use crate::path::{Resolved, resolve};

const OPTION: &str = "$orderby";

/// Sort direction of one key.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// `asc` (the default)
    #[default]
    Ascending,
    /// `desc`
    Descending,
}

/// One resolved ordering key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    /// Property path, outermost first.
    pub path: Vec<String>,
    /// Resolved type of the values at `path`.
    pub primitive: Primitive,
    /// Direction.
    pub direction: SortDirection,
}

/// Compiles `$orderby` text into sort keys.
///
/// Terms naming unset, undeclared or complex properties are accepted and
/// dropped; they carry no ordering information.
///
/// # Errors
///
/// - `QUERY_PARSE_ERROR` for empty terms, unknown directions (including
///   uppercase `ASC`/`DESC`), and terms with more than two words
/// - `CANNOT_SPECIFY_THE_LIST_TYPE_TO_ORDERBY` for list-typed properties
pub fn compile_orderby(
    snapshot: &SchemaSnapshot,
    entity_type: &EntityType,
    raw: &str,
) -> Result<Vec<SortKey>> {
    let text = urlencoding::decode(raw)
        .map_err(|_| Error::query_parse(OPTION, "not valid UTF-8 after decoding"))?;
    if text.trim().is_empty() {
        return Err(Error::query_parse(OPTION, "empty option"));
    }

    let mut keys = Vec::new();
    for term in text.split(',') {
        let words: Vec<&str> = term.split_whitespace().collect();
        let (name, direction) = match words.as_slice() {
            [] => return Err(Error::query_parse(OPTION, "empty term")),
            [name] => (*name, SortDirection::Ascending),
            [name, "asc"] => (*name, SortDirection::Ascending),
            [name, "desc"] => (*name, SortDirection::Descending),
            [_, other] => {
                return Err(Error::query_parse(
                    OPTION,
                    format!("unknown direction: {other}"),
                ));
            }
            _ => return Err(Error::query_parse(OPTION, format!("malformed term: {}", term.trim()))),
        };

        let segments: Vec<String> = name.split('/').map(String::from).collect();
        if segments.iter().any(String::is_empty) {
            return Err(Error::query_parse(OPTION, format!("malformed property: {name}")));
        }

        let primitive = match resolve(snapshot, entity_type, &segments) {
            Resolved::Reserved(p) | Resolved::Dynamic(p) => p,
            Resolved::Leaf {
                primitive,
                list: false,
            } => primitive,
            Resolved::Leaf { list: true, .. } | Resolved::Complex { list: true } => {
                return Err(Error::new(ErrorKind::CannotOrderByListType(name.to_string())));
            }
            Resolved::Complex { list: false } | Resolved::Unset | Resolved::Unknown => continue,
        };
        keys.push(SortKey {
            path: segments,
            primitive,
            direction,
        });
    }
    Ok(keys)
}

/// Sorts documents by `keys`, stably.
///
/// Null and absent values sort first ascending and last descending.
pub fn sort_documents(documents: &mut [Document], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    documents.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let ord = sort_value(a, key).sort_cmp(&sort_value(b, key));
                match key.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

fn sort_value(document: &Document, key: &SortKey) -> Scalar {
    with_leaves(document, &key.path, |leaves| {
        leaves
            .first()
            .and_then(|v| Scalar::from_json(key.primitive, v))
            .unwrap_or(Scalar::Null)
    })
}
