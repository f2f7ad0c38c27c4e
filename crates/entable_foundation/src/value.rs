//! Typed scalar values decoded from stored documents.
//!
//! Documents are held as JSON; comparisons in `$filter` and `$orderby` need
//! the value's resolved primitive type, which [`Scalar`] carries.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value as Json;

use crate::edm::{format_datetime, parse_datetime};
use crate::types::Primitive;

/// A primitive value tagged with its resolved type class.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Absent or `null`.
    Null,
    /// `Edm.String`.
    String(String),
    /// `Edm.Int32` (widened for arithmetic safety).
    Int(i64),
    /// `Edm.Single` or `Edm.Double`.
    Float(f64),
    /// `Edm.Boolean`.
    Boolean(bool),
    /// `Edm.DateTime` in epoch milliseconds.
    DateTime(i64),
}

impl Scalar {
    /// Decodes a stored JSON value as the given primitive type.
    ///
    /// Returns `None` when the stored value does not have that type, which
    /// happens for dynamic properties whose later writes used another kind.
    #[must_use]
    pub fn from_json(ty: Primitive, value: &Json) -> Option<Self> {
        if value.is_null() {
            return Some(Self::Null);
        }
        match ty {
            Primitive::String => value.as_str().map(|s| Self::String(s.to_string())),
            Primitive::Int32 => value.as_i64().map(Self::Int),
            Primitive::Single | Primitive::Double => value.as_f64().map(Self::Float),
            Primitive::Boolean => value.as_bool().map(Self::Boolean),
            Primitive::DateTime => value.as_str().and_then(parse_datetime).map(Self::DateTime),
        }
    }

    /// Returns true for [`Scalar::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Compares two non-null scalars of compatible classes.
    ///
    /// Integers and floats compare numerically; any other cross-class pair,
    /// or a null on either side, is unordered.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) | (Self::DateTime(a), Self::DateTime(b)) => {
                Some(a.cmp(b))
            }
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting.
    ///
    /// Null sorts before every present value; values of different classes
    /// sort by class rank so mixed dynamic properties still order stably.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::DateTime(_) => 3,
            Self::String(_) => 4,
        }
    }

    /// Encodes the scalar in canonical storage form.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::String(s) => Json::String(s.clone()),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => Json::from(*f),
            Self::Boolean(b) => Json::Bool(*b),
            Self::DateTime(ms) => Json::String(format_datetime(*ms)),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::String(s) => write!(f, "'{s}'"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::DateTime(ms) => write!(f, "datetime'{ms}'"),
        }
    }
}
