//! The Edm type coercion table.
//!
//! One table shared by the entity validator and the filter engine. For every
//! primitive tag it fixes:
//! - the lexical grammar a query literal must match,
//! - the domain bound an in-grammar literal must respect,
//! - the JSON form accepted at write time and its canonical storage form.
//!
//! A literal outside the grammar is a [`LiteralFault::Mismatch`]; a literal in
//! the grammar but outside the bound is a [`LiteralFault::OutOfBound`].

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as Json};

use crate::types::Primitive;
use crate::value::Scalar;

/// Smallest `Edm.Int32` value.
pub const INT32_MIN: i64 = i32::MIN as i64;
/// Largest `Edm.Int32` value.
pub const INT32_MAX: i64 = i32::MAX as i64;
/// Earliest `Edm.DateTime` (0001-01-01T00:00:00.000Z) in epoch milliseconds.
pub const DATETIME_MIN: i64 = -62_135_596_800_000;
/// Latest `Edm.DateTime` (9999-12-31T23:59:59.999Z) in epoch milliseconds.
pub const DATETIME_MAX: i64 = 253_402_300_799_999;
/// Most integer digits an `Edm.Single` literal may carry.
pub const SINGLE_MAX_INTEGER_DIGITS: usize = 5;
/// Most fractional digits an `Edm.Single` literal may carry.
pub const SINGLE_MAX_FRACTION_DIGITS: usize = 5;
/// Token that resolves to the current time when written to a DateTime.
pub const CURRENT_TIME_TOKEN: &str = "SYSUTCDATETIME()";

/// Lexical kind of a query literal, as produced by the filter lexer.
///
/// Quoting and type suffixes are part of the kind: `'1'` is a string and
/// `1f` is [`Literal::Suffixed`], neither coerces to a number.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// Quoted text, quotes removed and `''` unescaped.
    String(String),
    /// Bare integer text including its sign; `long` is set by an `L` suffix.
    Integer {
        /// Digits with optional leading `-`.
        text: String,
        /// Whether an `L`/`l` suffix was present.
        long: bool,
    },
    /// Bare decimal text (`1.5`, `-0.25`).
    Decimal(String),
    /// Numeric text carrying a suffix other than `L` (`1.5f`, `2m`, `3d`).
    Suffixed(String),
    /// Numeric text in exponent notation (`1e5`).
    Exponent(String),
    /// `true` or `false`.
    Boolean(bool),
    /// `null`.
    Null,
}

impl Literal {
    /// Returns a short name of the lexical kind for diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer { .. } => "integer",
            Self::Decimal(_) => "decimal",
            Self::Suffixed(_) => "suffixed number",
            Self::Exponent(_) => "exponent number",
            Self::Boolean(_) => "boolean",
            Self::Null => "null",
        }
    }
}

/// Why a literal or written value was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralFault {
    /// Lexical kind does not belong to the type's grammar.
    Mismatch,
    /// In the grammar, outside the type's domain bound.
    OutOfBound,
}

/// Coerces a query literal to a comparable scalar of the given type.
///
/// # Errors
///
/// Returns [`LiteralFault::Mismatch`] when the literal's lexical kind is not in
/// the type's grammar and [`LiteralFault::OutOfBound`] when it is but the
/// value lies outside the domain bound.
pub fn coerce_literal(ty: Primitive, literal: &Literal) -> Result<Scalar, LiteralFault> {
    if matches!(literal, Literal::Null) {
        return Ok(Scalar::Null);
    }
    match ty {
        Primitive::String => match literal {
            Literal::String(s) => Ok(Scalar::String(s.clone())),
            _ => Err(LiteralFault::Mismatch),
        },
        Primitive::Int32 => match literal {
            Literal::Integer { text, .. } => parse_int32(text).map(Scalar::Int),
            _ => Err(LiteralFault::Mismatch),
        },
        Primitive::Single => match literal {
            Literal::Integer { text, long: false } | Literal::Decimal(text) => {
                if !single_digits_ok(text) {
                    return Err(LiteralFault::OutOfBound);
                }
                parse_finite(text).map(Scalar::Float)
            }
            _ => Err(LiteralFault::Mismatch),
        },
        Primitive::Double => match literal {
            Literal::Integer { text, long: false } | Literal::Decimal(text) => {
                parse_finite(text).map(Scalar::Float)
            }
            _ => Err(LiteralFault::Mismatch),
        },
        Primitive::Boolean => match literal {
            Literal::Boolean(b) => Ok(Scalar::Boolean(*b)),
            _ => Err(LiteralFault::Mismatch),
        },
        Primitive::DateTime => match literal {
            Literal::Integer { text, long: false } => {
                let ms: i64 = text.parse().map_err(|_| LiteralFault::OutOfBound)?;
                if (DATETIME_MIN..=DATETIME_MAX).contains(&ms) {
                    Ok(Scalar::DateTime(ms))
                } else {
                    Err(LiteralFault::OutOfBound)
                }
            }
            _ => Err(LiteralFault::Mismatch),
        },
    }
}

fn parse_int32(text: &str) -> Result<i64, LiteralFault> {
    // Digits that overflow i64 are still in the grammar, just out of bound.
    let n: i64 = text.parse().map_err(|_| LiteralFault::OutOfBound)?;
    if (INT32_MIN..=INT32_MAX).contains(&n) {
        Ok(n)
    } else {
        Err(LiteralFault::OutOfBound)
    }
}

fn parse_finite(text: &str) -> Result<f64, LiteralFault> {
    let f: f64 = text.parse().map_err(|_| LiteralFault::Mismatch)?;
    if f.is_finite() {
        Ok(f)
    } else {
        Err(LiteralFault::OutOfBound)
    }
}

/// Checks the `Edm.Single` digit bound on plain decimal text.
fn single_digits_ok(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    int_part.len() <= SINGLE_MAX_INTEGER_DIGITS && frac_part.len() <= SINGLE_MAX_FRACTION_DIGITS
}

/// Write-time inputs the coercion table needs besides the value itself.
#[derive(Clone, Copy, Debug)]
pub struct WriteContext {
    /// Clock used to resolve [`CURRENT_TIME_TOKEN`], in epoch milliseconds.
    pub now_ms: i64,
    /// Longest accepted string, in bytes.
    pub max_string_bytes: usize,
}

/// Coerces a written JSON value to the canonical storage form of its type.
///
/// `null` is handled by the caller; here it is a mismatch.
///
/// # Errors
///
/// Returns a [`LiteralFault`] when the JSON kind is wrong for the type or the
/// value is out of the type's domain.
pub fn coerce_json(ty: Primitive, value: &Json, ctx: &WriteContext) -> Result<Json, LiteralFault> {
    match ty {
        Primitive::String => match value {
            Json::String(s) if s.len() <= ctx.max_string_bytes => Ok(value.clone()),
            Json::String(_) => Err(LiteralFault::OutOfBound),
            _ => Err(LiteralFault::Mismatch),
        },
        Primitive::Int32 => match value {
            Json::Number(n) if !n.is_f64() => {
                let i = n.as_i64().ok_or(LiteralFault::OutOfBound)?;
                if (INT32_MIN..=INT32_MAX).contains(&i) {
                    Ok(Json::Number(i.into()))
                } else {
                    Err(LiteralFault::OutOfBound)
                }
            }
            _ => Err(LiteralFault::Mismatch),
        },
        Primitive::Single => match value {
            Json::Number(n) => {
                let f = n.as_f64().ok_or(LiteralFault::Mismatch)?;
                if !single_digits_ok(&plain_decimal(f)) {
                    return Err(LiteralFault::OutOfBound);
                }
                float_json(f)
            }
            _ => Err(LiteralFault::Mismatch),
        },
        Primitive::Double => match value {
            Json::Number(n) => float_json(n.as_f64().ok_or(LiteralFault::Mismatch)?),
            _ => Err(LiteralFault::Mismatch),
        },
        Primitive::Boolean => match value {
            Json::Bool(_) => Ok(value.clone()),
            _ => Err(LiteralFault::Mismatch),
        },
        Primitive::DateTime => match value {
            Json::String(s) if s == CURRENT_TIME_TOKEN => {
                Ok(Json::String(format_datetime(ctx.now_ms)))
            }
            Json::String(s) => {
                let ms = parse_datetime(s).ok_or(LiteralFault::Mismatch)?;
                if (DATETIME_MIN..=DATETIME_MAX).contains(&ms) {
                    Ok(Json::String(format_datetime(ms)))
                } else {
                    Err(LiteralFault::OutOfBound)
                }
            }
            _ => Err(LiteralFault::Mismatch),
        },
    }
}

fn float_json(f: f64) -> Result<Json, LiteralFault> {
    Number::from_f64(f)
        .map(Json::Number)
        .ok_or(LiteralFault::OutOfBound)
}

/// Renders a float as plain decimal text without exponent.
fn plain_decimal(f: f64) -> String {
    // `Display` for f64 never uses exponent notation and prints the shortest
    // digits that round-trip.
    format!("{f}")
}

/// Parses `/Date(<ms>)/` into epoch milliseconds.
#[must_use]
pub fn parse_datetime(text: &str) -> Option<i64> {
    let inner = text.strip_prefix("/Date(")?.strip_suffix(")/")?;
    let digits = inner.strip_prefix('-').unwrap_or(inner);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok()
}

/// Formats epoch milliseconds as `/Date(<ms>)/`.
#[must_use]
pub fn format_datetime(ms: i64) -> String {
    format!("/Date({ms})/")
}

/// Returns the current wall-clock time in epoch milliseconds.
#[must_use]
pub fn current_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A declared default, ready to substitute at write time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// A fixed value in canonical storage form.
    Value(Json),
    /// The validation clock (`SYSUTCDATETIME()` on a DateTime).
    CurrentTime,
}

impl DefaultValue {
    /// Parses a declared default literal against the property's type.
    ///
    /// Defaults are written as text in schema definitions (`"12"`, `"true"`,
    /// `"/Date(0)/"`); they follow the write-time rules of the type.
    ///
    /// # Errors
    ///
    /// Returns a [`LiteralFault`] when the text is not a valid value.
    pub fn parse(ty: Primitive, text: &str) -> Result<Self, LiteralFault> {
        if ty == Primitive::DateTime && text == CURRENT_TIME_TOKEN {
            return Ok(Self::CurrentTime);
        }
        let raw = match ty {
            Primitive::String | Primitive::DateTime => Json::String(text.to_string()),
            Primitive::Boolean => match text {
                "true" => Json::Bool(true),
                "false" => Json::Bool(false),
                _ => return Err(LiteralFault::Mismatch),
            },
            Primitive::Int32 | Primitive::Single | Primitive::Double => {
                if !is_plain_number(text) {
                    return Err(LiteralFault::Mismatch);
                }
                serde_json::from_str::<Json>(text).map_err(|_| LiteralFault::Mismatch)?
            }
        };
        let ctx = WriteContext {
            now_ms: 0,
            max_string_bytes: usize::MAX,
        };
        coerce_json(ty, &raw, &ctx).map(Self::Value)
    }

    /// Resolves the default against the validation clock.
    #[must_use]
    pub fn resolve(&self, now_ms: i64) -> Json {
        match self {
            Self::Value(v) => v.clone(),
            Self::CurrentTime => Json::String(format_datetime(now_ms)),
        }
    }
}

/// Returns true for `-?digits(.digits)?`.
fn is_plain_number(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) if !f.is_empty() => (i, f),
        Some(_) => return false,
        None => (unsigned, ""),
    };
    !int_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}

/// Infers the storage type of a dynamic property from its JSON kind.
///
/// Strings stay strings even when they look like dates. Returns `None` for
/// `null`, objects and arrays.
#[must_use]
pub fn infer_dynamic(value: &Json) -> Option<Primitive> {
    match value {
        Json::String(_) => Some(Primitive::String),
        Json::Bool(_) => Some(Primitive::Boolean),
        Json::Number(n) => match n.as_i64() {
            Some(i) if !n.is_f64() && (INT32_MIN..=INT32_MAX).contains(&i) => {
                Some(Primitive::Int32)
            }
            _ => Some(Primitive::Double),
        },
        Json::Null | Json::Array(_) | Json::Object(_) => None,
    }
}
