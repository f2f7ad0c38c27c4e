//! The storage collaborator interface and an in-memory implementation.
//!
//! The core never performs I/O itself. Everything it reads or writes goes
//! through [`EntityStore`]; writes carry the conditions the store must check
//! atomically, so "at most one link per bounded end" and "no duplicate
//! link" hold even when requests race.

use entable_foundation::{ConflictReason, Error, ErrorKind, Result};
use im::{HashMap, OrdMap, Vector};
use serde_json::Value as Json;
use tracing::debug;

use crate::document::{Document, DocumentKey};
use crate::link::{LinkPrecondition, LinkRecord};
use crate::schema::{AssociationId, Side};
use crate::snapshot::SchemaSnapshot;

/// How a put treats an existing document.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PutMode {
    /// The key must be free.
    Create,
    /// The key must already hold a document.
    Replace,
}

/// A document delete together with its link side effects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Document to delete.
    pub key: DocumentKey,
    /// Association ends whose links to this instance are dropped with it.
    pub unlink: Vec<(AssociationId, Side)>,
    /// Conditions that must still hold when the delete is applied.
    pub preconditions: Vec<LinkPrecondition>,
}

/// Document, link and schema storage keyed by collection.
pub trait EntityStore {
    /// Returns the schema of a collection; unknown collections are empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn schema(&self, collection: &str) -> Result<SchemaSnapshot>;

    /// Installs `snapshot` if the current version is still `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` if another writer replaced the schema
    /// first or `snapshot` does not advance the version.
    fn replace_schema(
        &mut self,
        collection: &str,
        expected_version: u64,
        snapshot: SchemaSnapshot,
    ) -> Result<()>;

    /// Reads one document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn document(&self, key: &DocumentKey) -> Result<Option<Document>>;

    /// Lists the documents of an entity type in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn documents(&self, collection: &str, entity_type: &str) -> Result<Vec<Document>>;

    /// Writes a document.
    ///
    /// # Errors
    ///
    /// Returns `EntityAlreadyExists` or `EntityNotFound` when `mode` does not
    /// hold, and a unique-key conflict when a unique property value is taken.
    fn put_document(&mut self, document: Document, mode: PutMode) -> Result<()>;

    /// Deletes a document and drops the requested links atomically.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the document is gone and
    /// `PreconditionFailed` if a precondition no longer holds.
    fn delete_document(&mut self, request: &DeleteRequest) -> Result<()>;

    /// Lists the links of an association held by the instance on `side`,
    /// in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn links(
        &self,
        collection: &str,
        association: AssociationId,
        side: Side,
        id: &str,
    ) -> Result<Vec<LinkRecord>>;

    /// Creates a link if every precondition holds.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` if a precondition no longer holds.
    fn create_link(
        &mut self,
        collection: &str,
        association: AssociationId,
        ids: [String; 2],
        preconditions: &[LinkPrecondition],
    ) -> Result<LinkRecord>;

    /// Deletes the link joining `ids`.
    ///
    /// # Errors
    ///
    /// Returns `LinkNotFound` if no such link exists.
    fn delete_link(
        &mut self,
        collection: &str,
        association: AssociationId,
        ids: &[String; 2],
    ) -> Result<()>;
}

#[derive(Clone, Debug)]
struct StoredDocument {
    sequence: u64,
    document: Document,
}

/// An `im`-backed [`EntityStore`].
///
/// Cloning is O(1); a clone is an independent snapshot of the whole store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    schemas: HashMap<String, SchemaSnapshot>,
    documents: OrdMap<DocumentKey, StoredDocument>,
    links: HashMap<String, Vector<LinkRecord>>,
    next_sequence: u64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a schema unconditionally.
    pub fn install_schema(&mut self, collection: impl Into<String>, snapshot: SchemaSnapshot) {
        self.schemas.insert(collection.into(), snapshot);
    }

    /// Number of stored documents across all collections.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of stored links in a collection.
    #[must_use]
    pub fn link_count(&self, collection: &str) -> usize {
        self.links.get(collection).map_or(0, Vector::len)
    }

    fn sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    fn collection_links(&self, collection: &str) -> impl Iterator<Item = &LinkRecord> + '_ {
        self.links.get(collection).into_iter().flat_map(Vector::iter)
    }

    fn check(&self, collection: &str, preconditions: &[LinkPrecondition]) -> Result<()> {
        for precondition in preconditions {
            if !precondition.holds(self.collection_links(collection)) {
                debug!(%precondition, collection, "link precondition failed");
                return Err(Error::new(ErrorKind::PreconditionFailed(
                    precondition.to_string(),
                )));
            }
        }
        Ok(())
    }

    fn check_unique(&self, document: &Document) -> Result<()> {
        let Some(schema) = self.schemas.get(&document.key.collection) else {
            return Ok(());
        };
        let Some((_, entity_type)) = schema.entity_type(&document.key.entity_type) else {
            return Ok(());
        };
        for property in entity_type.properties.iter().filter(|p| p.unique) {
            let value = match document.body.get(&property.name) {
                None | Some(Json::Null) => continue,
                Some(v) => v,
            };
            let taken = self
                .scan(&document.key.collection, &document.key.entity_type)
                .any(|other| {
                    other.document.key.id != document.key.id
                        && other.document.body.get(&property.name) == Some(value)
                });
            if taken {
                return Err(Error::conflict(ConflictReason::UniqueKeyViolated));
            }
        }
        Ok(())
    }

    fn scan<'a>(
        &'a self,
        collection: &'a str,
        entity_type: &'a str,
    ) -> impl Iterator<Item = &'a StoredDocument> + 'a {
        let start = DocumentKey::new(collection, entity_type, "");
        self.documents
            .range(start..)
            .take_while(move |(k, _)| k.collection == collection && k.entity_type == entity_type)
            .map(|(_, stored)| stored)
    }
}

impl EntityStore for MemoryStore {
    fn schema(&self, collection: &str) -> Result<SchemaSnapshot> {
        Ok(self.schemas.get(collection).cloned().unwrap_or_default())
    }

    fn replace_schema(
        &mut self,
        collection: &str,
        expected_version: u64,
        snapshot: SchemaSnapshot,
    ) -> Result<()> {
        let current = self.schemas.get(collection).map_or(0, SchemaSnapshot::version);
        if current != expected_version || snapshot.version() <= current {
            return Err(Error::new(ErrorKind::PreconditionFailed(format!(
                "schema version is {current}, expected {expected_version}"
            ))));
        }
        debug!(collection, version = snapshot.version(), "schema replaced");
        self.schemas.insert(collection.to_string(), snapshot);
        Ok(())
    }

    fn document(&self, key: &DocumentKey) -> Result<Option<Document>> {
        Ok(self.documents.get(key).map(|s| s.document.clone()))
    }

    fn documents(&self, collection: &str, entity_type: &str) -> Result<Vec<Document>> {
        let mut stored: Vec<&StoredDocument> = self.scan(collection, entity_type).collect();
        stored.sort_by_key(|s| s.sequence);
        Ok(stored.into_iter().map(|s| s.document.clone()).collect())
    }

    fn put_document(&mut self, document: Document, mode: PutMode) -> Result<()> {
        let existing = self.documents.get(&document.key).map(|s| s.sequence);
        let sequence = match (mode, existing) {
            (PutMode::Create, Some(_)) => {
                return Err(Error::new(ErrorKind::EntityAlreadyExists {
                    entity_type: document.key.entity_type.clone(),
                    id: document.key.id.clone(),
                }));
            }
            (PutMode::Replace, None) => {
                return Err(Error::new(ErrorKind::EntityNotFound {
                    entity_type: document.key.entity_type.clone(),
                    id: document.key.id.clone(),
                }));
            }
            (PutMode::Replace, Some(seq)) => seq,
            (PutMode::Create, None) => self.sequence(),
        };
        self.check_unique(&document)?;
        self.documents.insert(
            document.key.clone(),
            StoredDocument { sequence, document },
        );
        Ok(())
    }

    fn delete_document(&mut self, request: &DeleteRequest) -> Result<()> {
        let key = &request.key;
        if !self.documents.contains_key(key) {
            return Err(Error::new(ErrorKind::EntityNotFound {
                entity_type: key.entity_type.clone(),
                id: key.id.clone(),
            }));
        }
        self.check(&key.collection, &request.preconditions)?;

        if let Some(links) = self.links.get(&key.collection) {
            let kept: Vector<LinkRecord> = links
                .iter()
                .filter(|l| {
                    !request
                        .unlink
                        .iter()
                        .any(|(assoc, side)| l.association == *assoc && l.id(*side) == key.id)
                })
                .cloned()
                .collect();
            self.links.insert(key.collection.clone(), kept);
        }
        self.documents.remove(key);
        Ok(())
    }

    fn links(
        &self,
        collection: &str,
        association: AssociationId,
        side: Side,
        id: &str,
    ) -> Result<Vec<LinkRecord>> {
        Ok(self
            .collection_links(collection)
            .filter(|l| l.association == association && l.id(side) == id)
            .cloned()
            .collect())
    }

    fn create_link(
        &mut self,
        collection: &str,
        association: AssociationId,
        ids: [String; 2],
        preconditions: &[LinkPrecondition],
    ) -> Result<LinkRecord> {
        self.check(collection, preconditions)?;
        let record = LinkRecord {
            collection: collection.to_string(),
            association,
            ids,
            sequence: self.sequence(),
        };
        self.links
            .entry(collection.to_string())
            .or_insert_with(Vector::new)
            .push_back(record.clone());
        Ok(record)
    }

    fn delete_link(
        &mut self,
        collection: &str,
        association: AssociationId,
        ids: &[String; 2],
    ) -> Result<()> {
        let links = self
            .links
            .get_mut(collection)
            .ok_or_else(|| Error::new(ErrorKind::LinkNotFound))?;
        let index = links
            .iter()
            .position(|l| l.joins(association, ids))
            .ok_or_else(|| Error::new(ErrorKind::LinkNotFound))?;
        links.remove(index);
        Ok(())
    }
}
