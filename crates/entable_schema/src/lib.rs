//! Schema model, documents, links, and the storage collaborator for Entable.
//!
//! This crate provides:
//! - [`SchemaSnapshot`] - Immutable arena of entity types, complex types and associations
//! - [`SchemaBuilder`] - Checks a [`SchemaDefinition`] and resolves it into a snapshot
//! - [`Document`] / [`DocumentKey`] - Stored entity instances
//! - [`LinkRecord`] / [`LinkPrecondition`] - Materialized links and their write guards
//! - [`EntityStore`] - The storage collaborator, with [`MemoryStore`] as reference

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod definition;
pub mod document;
pub mod link;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use definition::{
    AssociationDef, AssociationEndDef, CollectionKind, ComplexTypeDef, EntityTypeDef, PropertyDef,
    SchemaDefinition,
};
pub use document::{
    Document, DocumentKey, ID_KEY, IdGenerator, METADATA_KEY, PUBLISHED_KEY, UPDATED_KEY,
    is_valid_id,
};
pub use link::{LinkPrecondition, LinkRecord};
pub use schema::{
    Association, AssociationEnd, AssociationId, ComplexType, EntityType, EntityTypeId,
    Multiplicity, Property, Side, is_valid_name,
};
pub use snapshot::{SchemaBuilder, SchemaSnapshot};
pub use store::{DeleteRequest, EntityStore, MemoryStore, PutMode};
