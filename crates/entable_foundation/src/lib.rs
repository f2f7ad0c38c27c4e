//! Core types, errors, and the Edm type coercion table for Entable.
//!
//! This crate provides:
//! - [`Error`] - Rich error types carrying the symbolic error code
//! - [`Type`] / [`Primitive`] - The closed type sum for declared properties
//! - [`edm`] - Literal grammars, domain bounds, and canonical storage forms
//! - [`Scalar`] - Typed values decoded from stored documents
//! - [`CoreConfig`] - Structural and paging limits

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod edm;
pub mod error;
pub mod types;
pub mod value;

pub use config::CoreConfig;
pub use edm::{DefaultValue, Literal, LiteralFault, WriteContext};
pub use error::{ConflictReason, Error, ErrorContext, ErrorKind, Result};
pub use types::{ComplexTypeId, Primitive, Type};
pub use value::Scalar;
