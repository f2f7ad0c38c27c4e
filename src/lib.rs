//! Entable - Data-integrity and query core for a schema-flexible OData entity store
//!
//! This crate re-exports all layers of the Entable system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 4: entable_runtime    - Request-layer facade, snapshot serialization, logging
//! Layer 3: entable_engine     - Entity validator, association engine
//! Layer 2: entable_query      - $filter, $orderby, $select, $top/$skip
//! Layer 1: entable_schema     - Schema snapshots, documents, links, storage collaborator
//! Layer 0: entable_foundation - Core types (Type, Scalar, Error), Edm coercion table
//! ```

pub use entable_engine as engine;
pub use entable_foundation as foundation;
pub use entable_query as query;
pub use entable_runtime as runtime;
pub use entable_schema as schema;
