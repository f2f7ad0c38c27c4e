//! Immutable schema snapshots and the builder that produces them.
//!
//! A [`SchemaSnapshot`] is an arena of entity types, complex types and
//! associations. All maps are persistent (`im`), so cloning a snapshot is
//! O(1) and recording a dynamic property shares everything else with the
//! previous snapshot.

use entable_foundation::{
    ComplexTypeId, CoreConfig, DefaultValue, Error, Primitive, Result, Type,
};
use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::definition::{CollectionKind, PropertyDef, SchemaDefinition};
use crate::schema::{
    Association, AssociationEnd, AssociationId, ComplexType, EntityType, EntityTypeId,
    Multiplicity, Property, Side, is_valid_name,
};

/// A point-in-time view of one collection's schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    version: u64,
    entity_types: Vector<EntityType>,
    entity_index: OrdMap<String, EntityTypeId>,
    complex_types: Vector<ComplexType>,
    complex_index: OrdMap<String, ComplexTypeId>,
    associations: Vector<Association>,
}

impl SchemaSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic version; every derived snapshot is one higher.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Looks up an entity type by exact name.
    #[must_use]
    pub fn entity_type(&self, name: &str) -> Option<(EntityTypeId, &EntityType)> {
        let id = *self.entity_index.get(name)?;
        self.entity_type_by_id(id).map(|et| (id, et))
    }

    /// Looks up an entity type by id.
    #[must_use]
    pub fn entity_type_by_id(&self, id: EntityTypeId) -> Option<&EntityType> {
        self.entity_types.get(id.0 as usize)
    }

    /// Iterates over all entity types in declaration order.
    pub fn entity_types(&self) -> impl Iterator<Item = (EntityTypeId, &EntityType)> + '_ {
        self.entity_types
            .iter()
            .enumerate()
            .map(|(i, et)| (EntityTypeId(index_u32(i)), et))
    }

    /// Looks up a complex type by id.
    #[must_use]
    pub fn complex_type(&self, id: ComplexTypeId) -> Option<&ComplexType> {
        self.complex_types.get(id.0 as usize)
    }

    /// Looks up a complex type by exact name.
    #[must_use]
    pub fn complex_type_by_name(&self, name: &str) -> Option<(ComplexTypeId, &ComplexType)> {
        let id = *self.complex_index.get(name)?;
        self.complex_type(id).map(|ct| (id, ct))
    }

    /// Looks up an association by id.
    #[must_use]
    pub fn association(&self, id: AssociationId) -> Option<&Association> {
        self.associations.get(id.0 as usize)
    }

    /// Iterates over every (association, side) the entity type plays.
    ///
    /// A self-association yields both of its sides.
    pub fn associations_of(
        &self,
        entity_type: EntityTypeId,
    ) -> impl Iterator<Item = (AssociationId, &Association, Side)> + '_ {
        self.associations
            .iter()
            .enumerate()
            .flat_map(move |(i, assoc)| {
                [Side::A, Side::B]
                    .into_iter()
                    .filter(move |s| assoc.end(*s).entity_type == entity_type)
                    .map(move |s| (AssociationId(index_u32(i)), assoc, s))
            })
    }

    /// Finds the association joining `source` to `target`.
    ///
    /// Returns the association id and the side `source` plays.
    #[must_use]
    pub fn association_between(
        &self,
        source: EntityTypeId,
        target: EntityTypeId,
    ) -> Option<(AssociationId, Side)> {
        self.associations.iter().enumerate().find_map(|(i, assoc)| {
            let side = if assoc.end(Side::A).entity_type == source
                && assoc.end(Side::B).entity_type == target
            {
                Side::A
            } else if assoc.end(Side::B).entity_type == source
                && assoc.end(Side::A).entity_type == target
            {
                Side::B
            } else {
                return None;
            };
            Some((AssociationId(index_u32(i)), side))
        })
    }

    /// Returns a new snapshot with the given dynamic property types recorded.
    ///
    /// Existing entries are overwritten. The version is bumped even when
    /// `properties` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if `entity_type` is not part of this snapshot.
    pub fn with_dynamic_properties(
        &self,
        entity_type: EntityTypeId,
        properties: &[(String, Primitive)],
    ) -> Result<SchemaSnapshot> {
        let mut next = self.clone();
        let et = next
            .entity_types
            .get_mut(entity_type.0 as usize)
            .ok_or_else(|| Error::internal(format!("unknown entity type id {}", entity_type.0)))?;
        for (name, ty) in properties {
            et.dynamic.insert(name.clone(), *ty);
        }
        next.version = self.version + 1;
        Ok(next)
    }

    /// Returns a copy of this snapshot one version past `previous`.
    ///
    /// Used when a freshly built snapshot replaces an installed one.
    #[must_use]
    pub fn succeeding(mut self, previous: &SchemaSnapshot) -> SchemaSnapshot {
        self.version = previous.version + 1;
        self
    }
}

#[allow(clippy::cast_possible_truncation)]
fn index_u32(i: usize) -> u32 {
    i as u32
}

/// Checks a [`SchemaDefinition`] and resolves it into a [`SchemaSnapshot`].
#[derive(Clone, Debug)]
pub struct SchemaBuilder {
    max_complex_depth: usize,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::from_config(&CoreConfig::default())
    }
}

impl SchemaBuilder {
    /// Creates a builder with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder using the configured limits.
    #[must_use]
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            max_complex_depth: config.max_complex_depth,
        }
    }

    /// Builder method to set the complex nesting cap.
    #[must_use]
    pub fn with_max_complex_depth(mut self, depth: usize) -> Self {
        self.max_complex_depth = depth;
        self
    }

    /// Builds a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` for duplicate or malformed names, unknown
    /// type references, complex type cycles, nesting past the configured
    /// depth, invalid defaults, and association ends on unknown entity
    /// types.
    pub fn build(&self, definition: &SchemaDefinition) -> Result<SchemaSnapshot> {
        let mut snapshot = SchemaSnapshot::new();

        for (i, ct) in definition.complex_types.iter().enumerate() {
            check_name("complex type", &ct.name)?;
            if snapshot
                .complex_index
                .insert(ct.name.clone(), ComplexTypeId(index_u32(i)))
                .is_some()
            {
                return Err(Error::invalid_schema(format!(
                    "duplicate complex type: {}",
                    ct.name
                )));
            }
        }

        for ct in &definition.complex_types {
            let properties = self.resolve_properties(&snapshot, &ct.name, &ct.properties)?;
            snapshot.complex_types.push_back(ComplexType {
                name: ct.name.clone(),
                properties,
            });
        }
        self.check_depths(&snapshot)?;

        for (i, et) in definition.entity_types.iter().enumerate() {
            check_name("entity type", &et.name)?;
            let properties = self.resolve_properties(&snapshot, &et.name, &et.properties)?;
            if snapshot
                .entity_index
                .insert(et.name.clone(), EntityTypeId(index_u32(i)))
                .is_some()
            {
                return Err(Error::invalid_schema(format!(
                    "duplicate entity type: {}",
                    et.name
                )));
            }
            snapshot.entity_types.push_back(EntityType {
                name: et.name.clone(),
                properties,
                dynamic: OrdMap::new(),
            });
        }

        for assoc in &definition.associations {
            let mut ends = Vec::with_capacity(2);
            for end in &assoc.ends {
                let (entity_type, _) = snapshot.entity_type(&end.entity_type).ok_or_else(|| {
                    Error::invalid_schema(format!(
                        "association {} names unknown entity type {}",
                        assoc.name, end.entity_type
                    ))
                })?;
                ends.push(AssociationEnd {
                    role: end.name.clone(),
                    entity_type,
                    multiplicity: end.multiplicity.parse::<Multiplicity>()?,
                });
            }
            let (Some(b), Some(a)) = (ends.pop(), ends.pop()) else {
                return Err(Error::internal("association without two ends"));
            };
            if snapshot
                .associations
                .iter()
                .any(|existing| existing.name == assoc.name)
            {
                return Err(Error::invalid_schema(format!(
                    "duplicate association: {}",
                    assoc.name
                )));
            }
            if snapshot
                .association_between(a.entity_type, b.entity_type)
                .is_some()
            {
                return Err(Error::invalid_schema(format!(
                    "entity types of association {} are already associated",
                    assoc.name
                )));
            }
            snapshot.associations.push_back(Association {
                name: assoc.name.clone(),
                ends: [a, b],
            });
        }

        debug!(
            entity_types = snapshot.entity_types.len(),
            complex_types = snapshot.complex_types.len(),
            associations = snapshot.associations.len(),
            "schema snapshot built"
        );
        Ok(snapshot)
    }

    fn resolve_properties(
        &self,
        snapshot: &SchemaSnapshot,
        owner: &str,
        defs: &[PropertyDef],
    ) -> Result<Vec<Property>> {
        let mut properties: Vec<Property> = Vec::with_capacity(defs.len());
        for def in defs {
            check_name("property", &def.name)?;
            if properties.iter().any(|p| p.name == def.name) {
                return Err(Error::invalid_schema(format!(
                    "duplicate property {owner}.{}",
                    def.name
                )));
            }
            properties.push(self.resolve_property(snapshot, owner, def)?);
        }
        Ok(properties)
    }

    #[allow(clippy::unused_self)]
    fn resolve_property(
        &self,
        snapshot: &SchemaSnapshot,
        owner: &str,
        def: &PropertyDef,
    ) -> Result<Property> {
        let element = if def.type_name.starts_with("Edm.") {
            Type::Primitive(def.type_name.parse::<Primitive>()?)
        } else {
            let id = snapshot.complex_index.get(&def.type_name).ok_or_else(|| {
                Error::invalid_schema(format!(
                    "{owner}.{} has unknown type {}",
                    def.name, def.type_name
                ))
            })?;
            Type::Complex(*id)
        };
        let ty = match def.collection_kind {
            CollectionKind::None => element,
            CollectionKind::List => Type::list(element),
        };

        let default = match (&def.default_value, ty.as_primitive()) {
            (None, _) => None,
            (Some(text), Some(primitive)) => {
                Some(DefaultValue::parse(primitive, text).map_err(|fault| {
                    Error::invalid_schema(format!(
                        "{owner}.{} default {text:?} is invalid: {fault:?}",
                        def.name
                    ))
                })?)
            }
            (Some(_), None) => {
                return Err(Error::invalid_schema(format!(
                    "{owner}.{} cannot declare a default on a list or complex type",
                    def.name
                )));
            }
        };

        if def.unique && ty.as_primitive().is_none() {
            return Err(Error::invalid_schema(format!(
                "{owner}.{} cannot be unique on a list or complex type",
                def.name
            )));
        }

        Ok(Property {
            name: def.name.clone(),
            ty,
            nullable: def.nullable,
            default,
            unique: def.unique,
        })
    }

    /// Rejects reference cycles and nesting past the configured depth.
    fn check_depths(&self, snapshot: &SchemaSnapshot) -> Result<()> {
        #[derive(Clone, Copy)]
        enum Mark {
            Unvisited,
            Visiting,
            Done(usize),
        }

        fn depth(
            snapshot: &SchemaSnapshot,
            marks: &mut [Mark],
            id: ComplexTypeId,
        ) -> Result<usize> {
            let idx = id.0 as usize;
            match marks[idx] {
                Mark::Done(d) => return Ok(d),
                Mark::Visiting => {
                    let name = snapshot
                        .complex_type(id)
                        .map_or("?", |ct| ct.name.as_str());
                    return Err(Error::invalid_schema(format!(
                        "complex type {name} references itself"
                    )));
                }
                Mark::Unvisited => {}
            }
            marks[idx] = Mark::Visiting;
            let mut deepest = 0;
            if let Some(ct) = snapshot.complex_type(id) {
                for prop in &ct.properties {
                    if let Type::Complex(child) = prop.element() {
                        deepest = deepest.max(depth(snapshot, marks, *child)?);
                    }
                }
            }
            marks[idx] = Mark::Done(deepest + 1);
            Ok(deepest + 1)
        }

        let mut marks = vec![Mark::Unvisited; snapshot.complex_types.len()];
        for i in 0..snapshot.complex_types.len() {
            let id = ComplexTypeId(index_u32(i));
            let d = depth(snapshot, &mut marks, id)?;
            if d > self.max_complex_depth {
                let name = snapshot.complex_type(id).map_or("?", |ct| ct.name.as_str());
                return Err(Error::invalid_schema(format!(
                    "complex type {name} nests {d} levels (limit {})",
                    self.max_complex_depth
                )));
            }
        }
        Ok(())
    }
}

fn check_name(what: &str, name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(Error::invalid_schema(format!("invalid {what} name: {name:?}")))
    }
}
