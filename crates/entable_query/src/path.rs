//! Property path resolution shared by `$filter`, `$orderby` and `$select`.

use entable_foundation::{Primitive, Type};
use entable_schema::{
    EntityType, ID_KEY, PUBLISHED_KEY, Property, SchemaSnapshot, UPDATED_KEY,
};

/// What a property path resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// A management field (`__id`, `__published`, `__updated`).
    Reserved(Primitive),
    /// A declared primitive leaf; `list` is set if any segment is a list.
    Leaf {
        /// Leaf type.
        primitive: Primitive,
        /// Whether the path crosses or ends on a list.
        list: bool,
    },
    /// A declared complex property.
    Complex {
        /// Whether the path crosses or ends on a list.
        list: bool,
    },
    /// A dynamic property with its recorded type.
    Dynamic(Primitive),
    /// An undeclared top-level name no instance has set yet.
    Unset,
    /// A reserved-looking name, or a segment the schema does not declare.
    Unknown,
}

/// Returns the type of a management field name.
#[must_use]
pub fn reserved_type(name: &str) -> Option<Primitive> {
    match name {
        ID_KEY => Some(Primitive::String),
        PUBLISHED_KEY | UPDATED_KEY => Some(Primitive::DateTime),
        _ => None,
    }
}

/// Resolves `segments` against `entity_type`.
#[must_use]
pub fn resolve<S: AsRef<str>>(
    snapshot: &SchemaSnapshot,
    entity_type: &EntityType,
    segments: &[S],
) -> Resolved {
    let Some((first, rest)) = segments.split_first() else {
        return Resolved::Unknown;
    };
    let first = first.as_ref();

    if let Some(primitive) = reserved_type(first) {
        return if rest.is_empty() {
            Resolved::Reserved(primitive)
        } else {
            Resolved::Unknown
        };
    }
    if first.starts_with('_') {
        return Resolved::Unknown;
    }

    if let Some(property) = entity_type.property(first) {
        return walk(snapshot, property, rest, property.is_list());
    }

    match (entity_type.dynamic_type(first), rest.is_empty()) {
        (Some(primitive), true) => Resolved::Dynamic(primitive),
        (Some(_), false) => Resolved::Unknown,
        (None, _) => Resolved::Unset,
    }
}

fn walk<S: AsRef<str>>(
    snapshot: &SchemaSnapshot,
    property: &Property,
    rest: &[S],
    list: bool,
) -> Resolved {
    match (property.element(), rest.split_first()) {
        (Type::Primitive(primitive), None) => Resolved::Leaf {
            primitive: *primitive,
            list,
        },
        (Type::Complex(_), None) => Resolved::Complex { list },
        (Type::Complex(id), Some((next, tail))) => {
            let child = snapshot
                .complex_type(*id)
                .and_then(|ct| ct.property(next.as_ref()));
            match child {
                Some(child) => walk(snapshot, child, tail, list || child.is_list()),
                None => Resolved::Unknown,
            }
        }
        _ => Resolved::Unknown,
    }
}
