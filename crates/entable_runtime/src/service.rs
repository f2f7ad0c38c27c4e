//! The request-layer facade.
//!
//! [`Core`] owns an [`EntityStore`] and runs every request through the
//! engines: writes through the validator, queries through the filter,
//! order, paging and projection engines, link mutations through the
//! association engine. The engines read one schema snapshot per request and
//! hold no state between requests.

use entable_engine::{
    LinkEndpoint, LinkPlan, NormalizedEntity, Validator, check_link_create as plan_link_create,
    check_link_delete as plan_link_delete, plan_entity_delete, resolve_association,
};
use entable_foundation::edm::current_millis;
use entable_foundation::{CoreConfig, Error, ErrorKind, Primitive, Result};
use entable_query::{
    Paging, Projection, SortKey, TypedPredicate, compile_filter as filter_compiler,
    compile_orderby as orderby_compiler, compile_select as select_compiler, evaluate, project,
    sort_documents,
};
use entable_schema::{
    DeleteRequest, Document, DocumentKey, EntityStore, EntityType, EntityTypeId, ID_KEY,
    IdGenerator, LinkRecord, PutMode, SchemaBuilder, SchemaDefinition, SchemaSnapshot,
};
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{debug, info, warn};

// =============================================================================
// Query Options
// =============================================================================

/// Raw system query options of a collection query.
///
/// Values are taken verbatim from the query string; percent-encoding is
/// decoded by the engines.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct QueryOptions {
    /// `$filter`
    #[serde(rename = "$filter")]
    pub filter: Option<String>,
    /// `$orderby`
    #[serde(rename = "$orderby")]
    pub orderby: Option<String>,
    /// `$select`
    #[serde(rename = "$select")]
    pub select: Option<String>,
    /// `$top`
    #[serde(rename = "$top")]
    pub top: Option<String>,
    /// `$skip`
    #[serde(rename = "$skip")]
    pub skip: Option<String>,
}

impl QueryOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set `$filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Builder method to set `$orderby`.
    #[must_use]
    pub fn with_orderby(mut self, orderby: impl Into<String>) -> Self {
        self.orderby = Some(orderby.into());
        self
    }

    /// Builder method to set `$select`.
    #[must_use]
    pub fn with_select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    /// Builder method to set `$top`.
    #[must_use]
    pub fn with_top(mut self, top: impl Into<String>) -> Self {
        self.top = Some(top.into());
        self
    }

    /// Builder method to set `$skip`.
    #[must_use]
    pub fn with_skip(mut self, skip: impl Into<String>) -> Self {
        self.skip = Some(skip.into());
        self
    }
}

// =============================================================================
// Core
// =============================================================================

/// The Entable core, bound to one storage collaborator.
pub struct Core<S: EntityStore> {
    store: S,
    config: CoreConfig,
    ids: IdGenerator,
    clock: fn() -> i64,
}

impl<S: EntityStore> Core<S> {
    /// Creates a core over `store`.
    #[must_use]
    pub fn new(store: S, config: CoreConfig) -> Self {
        let ids = IdGenerator::new(config.id_seed);
        Self {
            store,
            config,
            ids,
            clock: current_millis,
        }
    }

    /// Builder method to replace the wall clock (epoch milliseconds).
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Returns the storage collaborator.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the storage collaborator mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the core, returning the storage collaborator.
    pub fn into_store(self) -> S {
        self.store
    }

    // -------------------------------------------------------------------------
    // Schema
    // -------------------------------------------------------------------------

    /// Returns the current schema snapshot of `collection`.
    ///
    /// # Errors
    ///
    /// Returns store read errors.
    pub fn schema(&self, collection: &str) -> Result<SchemaSnapshot> {
        self.store.schema(collection)
    }

    /// Builds `definition` and installs it as the schema of `collection`.
    ///
    /// Dynamic property types already recorded for an entity type carry over
    /// to the entity type of the same name, unless the new definition
    /// declares the property.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` for a malformed definition, or
    /// `PreconditionFailed` when concurrent installs keep racing past the
    /// retry limit.
    pub fn install_schema(
        &mut self,
        collection: &str,
        definition: &SchemaDefinition,
    ) -> Result<SchemaSnapshot> {
        let built = SchemaBuilder::from_config(&self.config).build(definition)?;
        self.with_retries("install_schema", |store| {
            let current = store.schema(collection)?;
            let mut next = built.clone();
            for (id, entity_type) in current.entity_types() {
                let Some((new_id, new_type)) = next.entity_type(&entity_type.name) else {
                    continue;
                };
                let carried: Vec<(String, Primitive)> = entity_type
                    .dynamic
                    .iter()
                    .filter(|(name, _)| new_type.property(name).is_none())
                    .map(|(name, ty)| (name.clone(), *ty))
                    .collect();
                if !carried.is_empty() {
                    debug!(
                        entity_type = %entity_type.name,
                        from = id.0,
                        count = carried.len(),
                        "carrying dynamic properties"
                    );
                    next = next.with_dynamic_properties(new_id, &carried)?;
                }
            }
            let next = next.succeeding(&current);
            store.replace_schema(collection, current.version(), next.clone())?;
            info!(collection, version = next.version(), "schema installed");
            Ok(next)
        })
    }

    // -------------------------------------------------------------------------
    // Compilation
    // -------------------------------------------------------------------------

    /// Validates `body` as an instance of `entity_type` without persisting it.
    ///
    /// # Errors
    ///
    /// Returns `EntityTypeNotFound` or the validator's error.
    pub fn validate_and_normalize(
        &mut self,
        collection: &str,
        entity_type: &str,
        body: &Json,
    ) -> Result<NormalizedEntity> {
        let snapshot = self.store.schema(collection)?;
        let (_, et) = lookup(&snapshot, entity_type)?;
        Validator::at(&snapshot, &self.config, (self.clock)()).validate(et, body, &mut self.ids)
    }

    /// Compiles `$filter` text for `entity_type`.
    ///
    /// # Errors
    ///
    /// Returns `EntityTypeNotFound` or the filter engine's error.
    pub fn compile_filter(
        &self,
        collection: &str,
        entity_type: &str,
        filter: &str,
    ) -> Result<TypedPredicate> {
        let snapshot = self.store.schema(collection)?;
        let (_, et) = lookup(&snapshot, entity_type)?;
        filter_compiler(&snapshot, et, filter).inspect_err(|e| {
            debug!(collection, entity_type, code = e.code(), error = %e, "filter rejected");
        })
    }

    /// Compiles `$orderby` text for `entity_type`.
    ///
    /// # Errors
    ///
    /// Returns `EntityTypeNotFound` or the order engine's error.
    pub fn compile_orderby(
        &self,
        collection: &str,
        entity_type: &str,
        orderby: &str,
    ) -> Result<Vec<SortKey>> {
        let snapshot = self.store.schema(collection)?;
        let (_, et) = lookup(&snapshot, entity_type)?;
        orderby_compiler(&snapshot, et, orderby)
    }

    /// Compiles `$select` text for `entity_type`.
    ///
    /// # Errors
    ///
    /// Returns `EntityTypeNotFound` or the projection engine's error.
    pub fn compile_select(
        &self,
        collection: &str,
        entity_type: &str,
        select: &str,
    ) -> Result<Projection> {
        let snapshot = self.store.schema(collection)?;
        let (_, et) = lookup(&snapshot, entity_type)?;
        select_compiler(&snapshot, et, select)
    }

    /// Decides whether `source` may be linked to `target`, without linking.
    ///
    /// # Errors
    ///
    /// Returns the association engine's error.
    pub fn check_link_create(
        &self,
        collection: &str,
        source: &LinkEndpoint,
        target: &LinkEndpoint,
    ) -> Result<LinkPlan> {
        let snapshot = self.store.schema(collection)?;
        plan_link_create(&self.store, collection, &snapshot, source, target)
    }

    /// Decides whether the link between `source` and `target` may be removed.
    ///
    /// # Errors
    ///
    /// Returns the association engine's error.
    pub fn check_link_delete(
        &self,
        collection: &str,
        source: &LinkEndpoint,
        target: &LinkEndpoint,
    ) -> Result<LinkPlan> {
        let snapshot = self.store.schema(collection)?;
        plan_link_delete(&self.store, collection, &snapshot, source, target)
    }

    // -------------------------------------------------------------------------
    // Entities
    // -------------------------------------------------------------------------

    /// Validates and persists a new entity instance.
    ///
    /// Dynamic property types are recorded once the document is stored, so a
    /// rejected write leaves the schema untouched.
    ///
    /// # Errors
    ///
    /// - validation errors
    /// - `EntityAlreadyExists` if the id is taken
    /// - `Conflict` (`UniqueKeyViolated`) from the store
    pub fn create_entity(
        &mut self,
        collection: &str,
        entity_type: &str,
        body: &Json,
    ) -> Result<Document> {
        let normalized = self.validate_and_normalize(collection, entity_type, body)?;
        let now = (self.clock)();
        let document = Document {
            key: DocumentKey::new(collection, entity_type, normalized.id),
            published: now,
            updated: now,
            body: normalized.body,
        };
        self.store.put_document(document.clone(), PutMode::Create)?;
        if let Err(e) = self.record_dynamic(collection, entity_type, &normalized.dynamic) {
            self.store.delete_document(&DeleteRequest {
                key: document.key,
                unlink: Vec::new(),
                preconditions: Vec::new(),
            })?;
            return Err(e);
        }
        debug!(collection, entity_type, id = %document.key.id, "entity created");
        Ok(document)
    }

    /// Replaces the body of an existing entity instance.
    ///
    /// `__published` is kept; `__updated` is restamped.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` if the instance does not exist
    /// - `REQUEST_FIELD_FORMAT_ERROR` if the body names a different `__id`
    /// - validation and store errors
    pub fn update_entity(
        &mut self,
        collection: &str,
        entity_type: &str,
        id: &str,
        body: &Json,
    ) -> Result<Document> {
        let key = DocumentKey::new(collection, entity_type, id);
        let existing = self.existing(&key)?;

        let mut body = body.clone();
        if let Json::Object(map) = &mut body {
            match map.get(ID_KEY) {
                None | Some(Json::Null) => {
                    map.insert(ID_KEY.into(), Json::String(id.to_string()));
                }
                Some(Json::String(given)) if given == id => {}
                Some(_) => return Err(Error::field_format(ID_KEY)),
            }
        }

        let normalized = self.validate_and_normalize(collection, entity_type, &body)?;
        let document = Document {
            key,
            published: existing.published,
            updated: (self.clock)(),
            body: normalized.body,
        };
        self.store.put_document(document.clone(), PutMode::Replace)?;
        if let Err(e) = self.record_dynamic(collection, entity_type, &normalized.dynamic) {
            self.store.put_document(existing, PutMode::Replace)?;
            return Err(e);
        }
        debug!(collection, entity_type, id, "entity replaced");
        Ok(document)
    }

    /// Reads one entity instance, projected through `$select`.
    ///
    /// # Errors
    ///
    /// Returns `EntityTypeNotFound`, `EntityNotFound` or a `$select` error.
    pub fn read_entity(
        &self,
        collection: &str,
        entity_type: &str,
        id: &str,
        select: Option<&str>,
    ) -> Result<Json> {
        let snapshot = self.store.schema(collection)?;
        let (_, et) = lookup(&snapshot, entity_type)?;
        let projection = match select {
            Some(text) => select_compiler(&snapshot, et, text)?,
            None => Projection::All,
        };
        let document = self.existing(&DocumentKey::new(collection, entity_type, id))?;
        Ok(project(&projection, &document))
    }

    /// Runs a collection query: filter, order, skip/top, then select.
    ///
    /// Every option is compiled before any document is read.
    ///
    /// # Errors
    ///
    /// Returns `EntityTypeNotFound` or the first option error.
    pub fn query(
        &self,
        collection: &str,
        entity_type: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Json>> {
        let snapshot = self.store.schema(collection)?;
        let (_, et) = lookup(&snapshot, entity_type)?;

        let predicate = options
            .filter
            .as_deref()
            .map(|f| filter_compiler(&snapshot, et, f))
            .transpose()
            .inspect_err(|e| debug!(collection, entity_type, code = e.code(), "filter rejected"))?;
        let keys = match options.orderby.as_deref() {
            Some(text) => orderby_compiler(&snapshot, et, text)?,
            None => Vec::new(),
        };
        let projection = match options.select.as_deref() {
            Some(text) => select_compiler(&snapshot, et, text)?,
            None => Projection::All,
        };
        let paging = Paging::parse(options.top.as_deref(), options.skip.as_deref(), &self.config)?;

        let mut documents = self.store.documents(collection, entity_type)?;
        if let Some(predicate) = &predicate {
            documents.retain(|d| evaluate(predicate, d));
        }
        sort_documents(&mut documents, &keys);
        Ok(paging
            .apply(documents)
            .iter()
            .map(|d| project(&projection, d))
            .collect())
    }

    /// Deletes an entity instance, applying association rules.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` if the instance does not exist
    /// - `Conflict` (`LinkedEntityExists`) while `*`-end links remain
    pub fn delete_entity(&mut self, collection: &str, entity_type: &str, id: &str) -> Result<()> {
        let key = DocumentKey::new(collection, entity_type, id);
        self.with_retries("delete_entity", |store| {
            let snapshot = store.schema(collection)?;
            let request = plan_entity_delete(&*store, &snapshot, &key)?;
            store.delete_document(&request)
        })?;
        debug!(collection, entity_type, id, "entity deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Links
    // -------------------------------------------------------------------------

    /// Links two existing instances.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` if either instance does not exist
    /// - `Conflict` (`DuplicateLink`, `MultiplicityExceeded`)
    /// - `PreconditionFailed` when re-planning keeps losing races past the
    ///   retry limit
    pub fn create_link(
        &mut self,
        collection: &str,
        source: &LinkEndpoint,
        target: &LinkEndpoint,
    ) -> Result<LinkRecord> {
        self.existing(&endpoint_key(collection, source))?;
        self.existing(&endpoint_key(collection, target))?;
        let record = self.with_retries("create_link", |store| {
            let snapshot = store.schema(collection)?;
            let plan = plan_link_create(&*store, collection, &snapshot, source, target)?;
            store.create_link(collection, plan.association, plan.ids, &plan.preconditions)
        })?;
        debug!(collection, source = %source.id, target = %target.id, "link created");
        Ok(record)
    }

    /// Removes the link between two instances.
    ///
    /// # Errors
    ///
    /// Returns `LinkNotFound` if they are not linked.
    pub fn delete_link(
        &mut self,
        collection: &str,
        source: &LinkEndpoint,
        target: &LinkEndpoint,
    ) -> Result<()> {
        let snapshot = self.store.schema(collection)?;
        let plan = plan_link_delete(&self.store, collection, &snapshot, source, target)?;
        self.store.delete_link(collection, plan.association, &plan.ids)?;
        debug!(collection, source = %source.id, target = %target.id, "link deleted");
        Ok(())
    }

    /// Lists the instances of `target_type` linked from `source`, in link
    /// creation order, windowed by `$top` / `$skip`.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` if the source does not exist
    /// - association resolution errors
    /// - `QUERY_PARSE_ERROR` for bad paging options
    pub fn list_links(
        &self,
        collection: &str,
        source: &LinkEndpoint,
        target_type: &str,
        top: Option<&str>,
        skip: Option<&str>,
    ) -> Result<Vec<DocumentKey>> {
        let snapshot = self.store.schema(collection)?;
        let (association, side) = resolve_association(&snapshot, &source.entity_type, target_type)?;
        let paging = Paging::parse(top, skip, &self.config)?;
        self.existing(&endpoint_key(collection, source))?;

        let mut links = self.store.links(collection, association, side, &source.id)?;
        links.sort_by_key(|l| l.sequence);
        Ok(paging
            .apply(links)
            .into_iter()
            .map(|l| DocumentKey::new(collection, target_type, l.id(side.other())))
            .collect())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn existing(&self, key: &DocumentKey) -> Result<Document> {
        self.store.document(key)?.ok_or_else(|| {
            Error::new(ErrorKind::EntityNotFound {
                entity_type: key.entity_type.clone(),
                id: key.id.clone(),
            })
        })
    }

    /// Records dynamic property types, re-reading the schema when another
    /// writer replaced it first.
    fn record_dynamic(
        &mut self,
        collection: &str,
        entity_type: &str,
        dynamic: &[(String, Primitive)],
    ) -> Result<()> {
        if dynamic.is_empty() {
            return Ok(());
        }
        self.with_retries("record_dynamic", |store| {
            let current = store.schema(collection)?;
            let (id, et) = lookup(&current, entity_type)?;
            let pending = still_pending(et, dynamic);
            if pending.is_empty() {
                return Ok(());
            }
            let next = current.with_dynamic_properties(id, &pending)?;
            store.replace_schema(collection, current.version(), next)?;
            debug!(collection, entity_type, count = pending.len(), "dynamic properties recorded");
            Ok(())
        })
    }

    /// Runs `op`, re-running it while the store reports a stale read, up to
    /// `link_retry_limit` extra attempts.
    fn with_retries<T>(
        &mut self,
        operation: &'static str,
        mut op: impl FnMut(&mut S) -> Result<T>,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            match op(&mut self.store) {
                Err(e)
                    if matches!(e.kind, ErrorKind::PreconditionFailed(_))
                        && attempt < self.config.link_retry_limit =>
                {
                    attempt += 1;
                    warn!(operation, attempt, error = %e, "store precondition failed, retrying");
                }
                other => return other,
            }
        }
    }
}

fn lookup<'a>(snapshot: &'a SchemaSnapshot, name: &str) -> Result<(EntityTypeId, &'a EntityType)> {
    snapshot
        .entity_type(name)
        .ok_or_else(|| Error::new(ErrorKind::EntityTypeNotFound(name.to_string())))
}

fn endpoint_key(collection: &str, endpoint: &LinkEndpoint) -> DocumentKey {
    DocumentKey::new(collection, endpoint.entity_type.clone(), endpoint.id.clone())
}

/// Dynamic types from `dynamic` that `entity_type` does not already hold
/// (new names, or Int32 widened to Double).
fn still_pending(
    entity_type: &EntityType,
    dynamic: &[(String, Primitive)],
) -> Vec<(String, Primitive)> {
    dynamic
        .iter()
        .filter(|(name, ty)| match entity_type.dynamic_type(name) {
            None => true,
            Some(Primitive::Int32) => *ty == Primitive::Double,
            Some(_) => false,
        })
        .cloned()
        .collect()
}
