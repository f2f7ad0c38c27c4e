//! Type descriptors for declared and inferred properties.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Index of a complex type inside a schema snapshot's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComplexTypeId(pub u32);

/// Edm primitive type tags.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    /// `Edm.String`
    #[serde(rename = "Edm.String")]
    String,
    /// `Edm.Int32`
    #[serde(rename = "Edm.Int32")]
    Int32,
    /// `Edm.Single`
    #[serde(rename = "Edm.Single")]
    Single,
    /// `Edm.Double`
    #[serde(rename = "Edm.Double")]
    Double,
    /// `Edm.Boolean`
    #[serde(rename = "Edm.Boolean")]
    Boolean,
    /// `Edm.DateTime`
    #[serde(rename = "Edm.DateTime")]
    DateTime,
}

impl Primitive {
    /// All primitive tags, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::String,
        Self::Int32,
        Self::Single,
        Self::Double,
        Self::Boolean,
        Self::DateTime,
    ];

    /// Returns the qualified Edm name (`Edm.Int32`).
    #[must_use]
    pub const fn edm_name(self) -> &'static str {
        match self {
            Self::String => "Edm.String",
            Self::Int32 => "Edm.Int32",
            Self::Single => "Edm.Single",
            Self::Double => "Edm.Double",
            Self::Boolean => "Edm.Boolean",
            Self::DateTime => "Edm.DateTime",
        }
    }

    /// Returns true for the numeric tags.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int32 | Self::Single | Self::Double)
    }

    /// Returns true if values of this type have a meaningful ordering for
    /// relational filter operators.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        !matches!(self, Self::Boolean)
    }
}

impl FromStr for Primitive {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.edm_name() == s)
            .ok_or_else(|| Error::invalid_schema(format!("unknown primitive type: {s}")))
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.edm_name())
    }
}

/// Resolved type of a property.
///
/// A closed sum type: every engine operation matches it exhaustively.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// A primitive leaf.
    Primitive(Primitive),
    /// A reference into the snapshot's complex type arena.
    Complex(ComplexTypeId),
    /// A homogeneous list.
    List(Box<Type>),
}

impl Type {
    /// `Edm.String` leaf.
    pub const STRING: Self = Self::Primitive(Primitive::String);
    /// `Edm.Int32` leaf.
    pub const INT32: Self = Self::Primitive(Primitive::Int32);
    /// `Edm.Single` leaf.
    pub const SINGLE: Self = Self::Primitive(Primitive::Single);
    /// `Edm.Double` leaf.
    pub const DOUBLE: Self = Self::Primitive(Primitive::Double);
    /// `Edm.Boolean` leaf.
    pub const BOOLEAN: Self = Self::Primitive(Primitive::Boolean);
    /// `Edm.DateTime` leaf.
    pub const DATETIME: Self = Self::Primitive(Primitive::DateTime);

    /// Creates a list type with the given element type.
    #[must_use]
    pub fn list(element: Type) -> Self {
        Self::List(Box::new(element))
    }

    /// Returns the primitive tag if this is a primitive leaf.
    #[must_use]
    pub const fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Self::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Returns true if this is a list type.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Returns the element type for lists, or the type itself.
    #[must_use]
    pub fn element(&self) -> &Type {
        match self {
            Self::List(inner) => inner.element(),
            other => other,
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Complex(id) => write!(f, "complex#{}", id.0),
            Self::List(t) => write!(f, "list<{t:?}>"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
