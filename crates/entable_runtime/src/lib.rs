//! Request-layer facade, snapshot serialization, and logging for Entable.
//!
//! This crate provides:
//! - [`Core`] - The operations a request layer calls, orchestrated over an
//!   [`EntityStore`](entable_schema::EntityStore)
//! - [`serialize`] - `MessagePack` encoding of schema snapshots
//! - [`logging`] - `tracing` subscriber installation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod logging;
pub mod serialize;
pub mod service;

pub use serialize::{load_snapshot, save_snapshot, snapshot_from_bytes, snapshot_to_bytes};
pub use service::{Core, QueryOptions};
