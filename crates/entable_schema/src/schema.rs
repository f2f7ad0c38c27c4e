//! Schema objects: entity types, complex types, properties, associations.
//!
//! These are the resolved, arena-indexed forms held by a
//! [`SchemaSnapshot`](crate::SchemaSnapshot). Complex type references are
//! ids into the snapshot's arena, so one definition is shared by every
//! property that names it.

use std::fmt;
use std::str::FromStr;

use entable_foundation::{DefaultValue, Error, Primitive, Result, Type};
use serde::{Deserialize, Serialize};

/// Index of an entity type inside a schema snapshot's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityTypeId(pub u32);

/// Index of an association inside a schema snapshot's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssociationId(pub u32);

/// A declared property of an entity type or complex type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property name (case-sensitive).
    pub name: String,
    /// Resolved type; `Type::List` when the property is list-valued.
    pub ty: Type,
    /// Whether the property may be absent or null.
    pub nullable: bool,
    /// Default substituted when the property is absent.
    pub default: Option<DefaultValue>,
    /// Whether values must be unique across instances of the entity type.
    pub unique: bool,
}

impl Property {
    /// Returns true if the property is list-valued.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        self.ty.is_list()
    }

    /// Returns the element type (the type itself for scalars).
    #[must_use]
    pub fn element(&self) -> &Type {
        self.ty.element()
    }
}

/// A named, reusable nested structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplexType {
    /// Complex type name (case-sensitive).
    pub name: String,
    /// Declared properties in declaration order.
    pub properties: Vec<Property>,
}

impl ComplexType {
    /// Returns the property by exact name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// A named entity type with declared and dynamic properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    /// Entity type name (case-sensitive).
    pub name: String,
    /// Declared properties in declaration order.
    pub properties: Vec<Property>,
    /// Inferred types of dynamic (undeclared) properties seen so far.
    pub dynamic: im::OrdMap<String, Primitive>,
}

impl EntityType {
    /// Returns the declared property by exact name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns the inferred type of a dynamic property.
    #[must_use]
    pub fn dynamic_type(&self, name: &str) -> Option<Primitive> {
        self.dynamic.get(name).copied()
    }
}

/// Cardinality tag of one association end.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Multiplicity {
    /// `0..1`
    #[serde(rename = "0..1")]
    ZeroOrOne,
    /// `1`
    #[serde(rename = "1")]
    One,
    /// `*`
    #[serde(rename = "*")]
    Many,
}

impl Multiplicity {
    /// Returns true for `0..1` and `1`.
    #[must_use]
    pub const fn is_bounded(self) -> bool {
        !matches!(self, Self::Many)
    }

    /// Returns the textual form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ZeroOrOne => "0..1",
            Self::One => "1",
            Self::Many => "*",
        }
    }
}

impl FromStr for Multiplicity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "0..1" => Ok(Self::ZeroOrOne),
            "1" => Ok(Self::One),
            "*" => Ok(Self::Many),
            other => Err(Error::invalid_schema(format!(
                "unknown multiplicity: {other}"
            ))),
        }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which end of an association.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The first declared end.
    A,
    /// The second declared end.
    B,
}

impl Side {
    /// Returns the opposite end.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Returns the array index of this end.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// One typed, cardinality-tagged end of an association.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationEnd {
    /// Role name.
    pub role: String,
    /// Entity type at this end.
    pub entity_type: EntityTypeId,
    /// Multiplicity at this end.
    pub multiplicity: Multiplicity,
}

/// Two association ends joined into a navigable relationship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    /// Association name.
    pub name: String,
    /// The two ends, indexed by [`Side`].
    pub ends: [AssociationEnd; 2],
}

impl Association {
    /// Returns the end on the given side.
    #[must_use]
    pub fn end(&self, side: Side) -> &AssociationEnd {
        &self.ends[side.index()]
    }

    /// Returns the side whose entity type is `entity_type`, preferring `A`.
    #[must_use]
    pub fn side_of(&self, entity_type: EntityTypeId) -> Option<Side> {
        [Side::A, Side::B]
            .into_iter()
            .find(|s| self.end(*s).entity_type == entity_type)
    }
}

/// Returns true if `name` is a valid property or type name:
/// `[A-Za-z0-9][A-Za-z0-9_-]{0,127}`.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= 128
        && first.is_ascii_alphanumeric()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
