//! Stored entity documents and their keys.

use std::borrow::Cow;

use entable_foundation::edm::format_datetime;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// Reserved key holding the instance id.
pub const ID_KEY: &str = "__id";
/// Reserved key holding the creation timestamp.
pub const PUBLISHED_KEY: &str = "__published";
/// Reserved key holding the last-update timestamp.
pub const UPDATED_KEY: &str = "__updated";
/// Reserved key a client may echo back; never stored.
pub const METADATA_KEY: &str = "__metadata";

/// Identifies one stored instance.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Collection (schema namespace) name.
    pub collection: String,
    /// Entity type name.
    pub entity_type: String,
    /// Instance id.
    pub id: String,
}

impl DocumentKey {
    /// Creates a key.
    #[must_use]
    pub fn new(
        collection: impl Into<String>,
        entity_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

/// A stored entity instance.
///
/// `body` holds the normalized user properties only; the management fields
/// live beside it and are merged in by [`Document::value`] and
/// [`Document::to_json`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Where the document lives.
    pub key: DocumentKey,
    /// Creation time in epoch milliseconds.
    pub published: i64,
    /// Last update time in epoch milliseconds.
    pub updated: i64,
    /// Normalized property values.
    pub body: Map<String, Json>,
}

impl Document {
    /// Returns a top-level value, resolving the management fields.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<Cow<'_, Json>> {
        match name {
            ID_KEY => Some(Cow::Owned(Json::String(self.key.id.clone()))),
            PUBLISHED_KEY => Some(Cow::Owned(Json::String(format_datetime(self.published)))),
            UPDATED_KEY => Some(Cow::Owned(Json::String(format_datetime(self.updated)))),
            _ => self.body.get(name).map(Cow::Borrowed),
        }
    }

    /// Renders the document as a JSON object, management fields first.
    #[must_use]
    pub fn to_json(&self) -> Json {
        let mut out = Map::with_capacity(self.body.len() + 3);
        out.insert(ID_KEY.into(), Json::String(self.key.id.clone()));
        out.insert(PUBLISHED_KEY.into(), Json::String(format_datetime(self.published)));
        out.insert(UPDATED_KEY.into(), Json::String(format_datetime(self.updated)));
        for (k, v) in &self.body {
            out.insert(k.clone(), v.clone());
        }
        Json::Object(out)
    }
}

/// Generates instance ids: 32 lowercase hex digits.
///
/// Seeded generators produce the same sequence on every run.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    rng: ChaCha8Rng,
}

impl IdGenerator {
    /// Creates a generator with a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a generator seeded from the OS.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Creates a generator from an optional seed.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Returns the next id.
    pub fn next_id(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Returns true if `id` is a valid instance id:
/// `[A-Za-z0-9][A-Za-z0-9_:-]{0,199}`.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    id.len() <= 200
        && first.is_ascii_alphanumeric()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-'))
}
