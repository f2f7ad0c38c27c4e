//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Error, the Edm coercion table, Scalar, and CoreConfig.

mod config;
mod errors;
