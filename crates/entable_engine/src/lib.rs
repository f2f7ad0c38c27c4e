//! Write-side engines for Entable.
//!
//! This crate provides:
//! - [`Validator`] - Checks and normalizes entity bodies against a schema snapshot
//! - [`check_link_create`] / [`check_link_delete`] - Cardinality decisions for links
//! - [`plan_entity_delete`] - Link handling when an entity instance is deleted

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod association;
pub mod validator;

pub use association::{
    LinkEndpoint, LinkPlan, check_link_create, check_link_delete, plan_entity_delete,
    resolve_association,
};
pub use validator::{NormalizedEntity, Validator};
