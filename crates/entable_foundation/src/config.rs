//! Configuration for the Entable core.

use serde::Deserialize;

use crate::edm::WriteContext;

/// Limits and knobs shared by every engine.
///
/// Hosts usually deserialize this from their own configuration source;
/// missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Most primitive slots one entity body may expand to.
    pub max_slots: usize,

    /// Longest accepted `Edm.String` value, in bytes.
    pub max_string_bytes: usize,

    /// Deepest complex type nesting a schema may declare.
    pub max_complex_depth: usize,

    /// `$top` applied when a query gives none.
    pub default_top: usize,

    /// Largest accepted `$top`.
    pub max_top: usize,

    /// Largest accepted `$skip`.
    pub max_skip: usize,

    /// Re-plans of a link mutation after the store reports a stale read.
    pub link_retry_limit: u32,

    /// Seed for instance id generation (None = seeded from the OS).
    pub id_seed: Option<u64>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_slots: 400,
            max_string_bytes: 51_200,
            max_complex_depth: 5,
            default_top: 25,
            max_top: 10_000,
            max_skip: 100_000,
            link_retry_limit: 3,
            id_seed: None,
        }
    }
}

impl CoreConfig {
    /// Builder method to set the slot cap.
    #[must_use]
    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }

    /// Builder method to set the string length cap.
    #[must_use]
    pub fn with_max_string_bytes(mut self, bytes: usize) -> Self {
        self.max_string_bytes = bytes;
        self
    }

    /// Builder method to set the complex nesting cap.
    #[must_use]
    pub fn with_max_complex_depth(mut self, depth: usize) -> Self {
        self.max_complex_depth = depth;
        self
    }

    /// Builder method to set the paging limits.
    #[must_use]
    pub fn with_paging(mut self, default_top: usize, max_top: usize, max_skip: usize) -> Self {
        self.default_top = default_top;
        self.max_top = max_top;
        self.max_skip = max_skip;
        self
    }

    /// Builder method to set the link retry limit.
    #[must_use]
    pub fn with_link_retry_limit(mut self, limit: u32) -> Self {
        self.link_retry_limit = limit;
        self
    }

    /// Builder method to make instance ids deterministic.
    #[must_use]
    pub fn with_id_seed(mut self, seed: u64) -> Self {
        self.id_seed = Some(seed);
        self
    }

    /// Write-time coercion inputs for a validation running at `now_ms`.
    #[must_use]
    pub fn write_context(&self, now_ms: i64) -> WriteContext {
        WriteContext {
            now_ms,
            max_string_bytes: self.max_string_bytes,
        }
    }
}
