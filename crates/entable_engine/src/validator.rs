//! Entity validation and normalization.
//!
//! The validator walks a submitted JSON body against the property tree of an
//! [`EntityType`] and produces a [`NormalizedEntity`]: every declared
//! property present (defaulted or `null`), every value in canonical storage
//! form, dynamic properties typed. Validation is all-or-nothing and touches
//! no shared state; the caller persists the result.
//!
//! Slots: every primitive position in the normalized tree counts once,
//! including `null` scalars and each list element. An empty or `null` list
//! and a `null` complex value contribute nothing.

use entable_foundation::edm::{coerce_json, infer_dynamic};
use entable_foundation::{
    CoreConfig, Error, ErrorContext, Primitive, Result, Type, WriteContext,
};
use entable_schema::{
    EntityType, ID_KEY, IdGenerator, METADATA_KEY, PUBLISHED_KEY, Property, SchemaSnapshot,
    UPDATED_KEY, is_valid_id, is_valid_name,
};
use serde_json::{Map, Value as Json};
use tracing::debug;

// =============================================================================
// Normalized Entity
// =============================================================================

/// A validated entity body, ready to persist.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedEntity {
    /// Instance id (supplied or generated).
    pub id: String,
    /// Declared properties in declaration order, then dynamic properties in
    /// body order. Management fields are not part of the body.
    pub body: Map<String, Json>,
    /// Dynamic property types this body introduces or widens.
    pub dynamic: Vec<(String, Primitive)>,
    /// Primitive slots the body expands to.
    pub slots: usize,
}

impl NormalizedEntity {
    /// Renders the entity with its `__id`, as a client would resubmit it.
    #[must_use]
    pub fn to_json(&self) -> Json {
        let mut out = Map::with_capacity(self.body.len() + 1);
        out.insert(ID_KEY.into(), Json::String(self.id.clone()));
        for (k, v) in &self.body {
            out.insert(k.clone(), v.clone());
        }
        Json::Object(out)
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Validates entity bodies against one schema snapshot.
#[derive(Clone, Debug)]
pub struct Validator<'a> {
    snapshot: &'a SchemaSnapshot,
    max_slots: usize,
    write: WriteContext,
}

impl<'a> Validator<'a> {
    /// Creates a validator reading the wall clock for time defaults.
    #[must_use]
    pub fn new(snapshot: &'a SchemaSnapshot, config: &CoreConfig) -> Self {
        Self::at(snapshot, config, entable_foundation::edm::current_millis())
    }

    /// Creates a validator with a fixed clock (epoch milliseconds).
    #[must_use]
    pub fn at(snapshot: &'a SchemaSnapshot, config: &CoreConfig, now_ms: i64) -> Self {
        Self {
            snapshot,
            max_slots: config.max_slots,
            write: config.write_context(now_ms),
        }
    }

    /// Validates `body` as an instance of `entity_type`.
    ///
    /// A missing `__id` is drawn from `ids`.
    ///
    /// # Errors
    ///
    /// - `INPUT_REQUIRED_FIELD_MISSING` naming the first required leaf that is
    ///   absent or `null`
    /// - `REQUEST_FIELD_FORMAT_ERROR` naming the first value outside its
    ///   type's grammar or bound, or a malformed key
    /// - `ENTITYTYPE_STRUCTUAL_LIMITATION_EXCEEDED` when the body expands to
    ///   more than `max_slots` primitive slots
    pub fn validate(
        &self,
        entity_type: &EntityType,
        body: &Json,
        ids: &mut IdGenerator,
    ) -> Result<NormalizedEntity> {
        let result = self.validate_inner(entity_type, body, ids);
        if let Err(e) = &result {
            debug!(
                entity_type = %entity_type.name,
                code = e.code(),
                error = %e,
                "validation failed"
            );
        }
        result
    }

    fn validate_inner(
        &self,
        entity_type: &EntityType,
        body: &Json,
        ids: &mut IdGenerator,
    ) -> Result<NormalizedEntity> {
        let Json::Object(input) = body else {
            return Err(Error::field_format(entity_type.name.clone()));
        };

        let id = match input.get(ID_KEY) {
            None | Some(Json::Null) => ids.next_id(),
            Some(Json::String(id)) if is_valid_id(id) => id.clone(),
            Some(_) => return Err(Error::field_format(ID_KEY)),
        };

        let mut walk = Walk {
            entity_type: &entity_type.name,
            path: Vec::new(),
            slots: 0,
        };
        let mut out = Map::with_capacity(input.len());
        for property in &entity_type.properties {
            walk.path.push(property.name.clone());
            let value = self.property(&mut walk, property, input.get(&property.name))?;
            walk.path.pop();
            out.insert(property.name.clone(), value);
        }

        let mut dynamic = Vec::new();
        for (key, value) in input {
            if matches!(key.as_str(), ID_KEY | PUBLISHED_KEY | UPDATED_KEY | METADATA_KEY)
                || entity_type.property(key).is_some()
            {
                continue;
            }
            if key.starts_with('_') || !is_valid_name(key) {
                return Err(walk.fail(Error::field_format(key.clone()), key));
            }
            match value {
                Json::Object(_) | Json::Array(_) => {
                    return Err(walk.fail(Error::field_format(key.clone()), key));
                }
                Json::Null => {}
                _ => {
                    if let Some(ty) = dynamic_type(entity_type.dynamic_type(key), value) {
                        dynamic.push((key.clone(), ty));
                    }
                }
            }
            walk.slots += 1;
            out.insert(key.clone(), value.clone());
        }

        if walk.slots > self.max_slots {
            return Err(Error::structural_limit(walk.slots, self.max_slots).with_context(
                ErrorContext::new().with_entity_type(entity_type.name.clone()),
            ));
        }

        Ok(NormalizedEntity {
            id,
            body: out,
            dynamic,
            slots: walk.slots,
        })
    }

    fn property(
        &self,
        walk: &mut Walk<'_>,
        property: &Property,
        value: Option<&Json>,
    ) -> Result<Json> {
        let explicit_null = matches!(value, Some(Json::Null));
        let value = value.filter(|v| !v.is_null());
        let is_empty_list =
            property.is_list() && matches!(value, Some(Json::Array(a)) if a.is_empty());

        let Some(value) = value else {
            if explicit_null && !property.nullable {
                return Err(walk.required(&property.name));
            }
            if let Some(default) = &property.default {
                walk.slots += 1;
                return Ok(default.resolve(self.write.now_ms));
            }
            if !property.nullable {
                return Err(walk.required(&property.name));
            }
            if property.ty.as_primitive().is_some() {
                walk.slots += 1;
            }
            return Ok(Json::Null);
        };

        if is_empty_list && !property.nullable {
            return Err(walk.required(&property.name));
        }

        match &property.ty {
            Type::List(element) => {
                let Json::Array(items) = value else {
                    return Err(walk.format(&property.name));
                };
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    walk.path.push(index.to_string());
                    let element = self.element(walk, property, element, item)?;
                    walk.path.pop();
                    out.push(element);
                }
                Ok(Json::Array(out))
            }
            ty => self.element(walk, property, ty, value),
        }
    }

    /// Validates one non-null scalar position of `property` (the value itself,
    /// or a list element).
    fn element(
        &self,
        walk: &mut Walk<'_>,
        property: &Property,
        ty: &Type,
        value: &Json,
    ) -> Result<Json> {
        match ty {
            Type::Primitive(primitive) => {
                if value.is_null() {
                    return Err(walk.format(&property.name));
                }
                let coerced = coerce_json(*primitive, value, &self.write)
                    .map_err(|_| walk.format(&property.name))?;
                walk.slots += 1;
                Ok(coerced)
            }
            Type::Complex(id) => {
                let Json::Object(fields) = value else {
                    return Err(walk.format(&property.name));
                };
                let complex = self.snapshot.complex_type(*id).ok_or_else(|| {
                    Error::internal(format!("complex type {} missing from snapshot", id.0))
                })?;
                if let Some(unknown) = fields.keys().find(|k| complex.property(k).is_none()) {
                    return Err(walk.format(unknown));
                }
                let mut out = Map::with_capacity(complex.properties.len());
                for child in &complex.properties {
                    walk.path.push(child.name.clone());
                    let v = self.property(walk, child, fields.get(&child.name))?;
                    walk.path.pop();
                    out.insert(child.name.clone(), v);
                }
                Ok(Json::Object(out))
            }
            Type::List(_) => Err(Error::internal(format!(
                "nested list type on property {}",
                property.name
            ))),
        }
    }
}

/// Traversal state: the path of the value being checked and the running
/// slot count.
struct Walk<'a> {
    entity_type: &'a str,
    path: Vec<String>,
    slots: usize,
}

impl Walk<'_> {
    fn context(&self) -> ErrorContext {
        ErrorContext::new()
            .with_entity_type(self.entity_type)
            .with_path(self.path.clone())
    }

    fn required(&self, name: &str) -> Error {
        Error::required_field_missing(name).with_context(self.context())
    }

    fn format(&self, name: &str) -> Error {
        Error::field_format(name).with_context(self.context())
    }

    fn fail(&self, error: Error, key: &str) -> Error {
        error.with_context(self.context().with_path(vec![key.to_string()]))
    }
}

/// Returns the type to record for a dynamic value, if it changes anything.
///
/// The first value fixes the type; an Int32 property later receiving a value
/// only a Double can hold is widened.
fn dynamic_type(recorded: Option<Primitive>, value: &Json) -> Option<Primitive> {
    let inferred = infer_dynamic(value)?;
    match recorded {
        None => Some(inferred),
        Some(Primitive::Int32) if inferred == Primitive::Double => Some(Primitive::Double),
        Some(_) => None,
    }
}
