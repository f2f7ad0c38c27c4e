//! Integration tests for Layer 3: Engine
//!
//! Tests for entity validation and the association rules that guard link
//! and entity mutations.

mod validator;
