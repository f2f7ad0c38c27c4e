//! `$select` compilation and projection.

use entable_foundation::{Error, Result};
use entable_schema::{Document, EntityType, ID_KEY, SchemaSnapshot};
use serde_json::{Map, Value as Json};

use crate::path::{Resolved, resolve};

const OPTION: &str = "$select";

/// Which top-level fields a response carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    /// Every field (`*`, or no `$select`).
    All,
    /// `__id` plus the named fields, in request order.
    Properties(Vec<String>),
}

/// Compiles `$select` text.
///
/// Names the schema does not know are dropped silently.
///
/// # Errors
///
/// Returns `QUERY_PARSE_ERROR` for empty text, empty items, and names
/// outside the property name alphabet.
pub fn compile_select(
    snapshot: &SchemaSnapshot,
    entity_type: &EntityType,
    raw: &str,
) -> Result<Projection> {
    let text = urlencoding::decode(raw)
        .map_err(|_| Error::query_parse(OPTION, "not valid UTF-8 after decoding"))?;
    if text.trim().is_empty() {
        return Err(Error::query_parse(OPTION, "empty option"));
    }

    let mut names: Vec<String> = Vec::new();
    let mut all = false;
    for item in text.split(',').map(str::trim) {
        if item == "*" {
            all = true;
            continue;
        }
        if !is_selectable(item) {
            return Err(Error::query_parse(OPTION, format!("invalid name: {item:?}")));
        }
        let known = match resolve(snapshot, entity_type, &[item]) {
            Resolved::Reserved(_)
            | Resolved::Leaf { .. }
            | Resolved::Complex { .. }
            | Resolved::Dynamic(_) => true,
            Resolved::Unset | Resolved::Unknown => false,
        };
        if known && item != ID_KEY && !names.iter().any(|n| n == item) {
            names.push(item.to_string());
        }
    }

    Ok(if all {
        Projection::All
    } else {
        Projection::Properties(names)
    })
}

fn is_selectable(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Renders `document` through `projection`.
#[must_use]
pub fn project(projection: &Projection, document: &Document) -> Json {
    match projection {
        Projection::All => document.to_json(),
        Projection::Properties(names) => {
            let mut out = Map::with_capacity(names.len() + 1);
            out.insert(ID_KEY.into(), Json::String(document.key.id.clone()));
            for name in names {
                if let Some(value) = document.value(name) {
                    out.insert(name.clone(), value.into_owned());
                }
            }
            Json::Object(out)
        }
    }
}
