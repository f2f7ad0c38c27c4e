//! Declarative schema definitions.
//!
//! A [`SchemaDefinition`] is what a host submits: names and type strings,
//! not yet resolved. [`SchemaBuilder`](crate::SchemaBuilder) checks it and
//! turns it into a [`SchemaSnapshot`](crate::SchemaSnapshot).
//!
//! The JSON form uses the OData metadata field names:
//!
//! ```json
//! {
//!   "EntityTypes": [
//!     { "Name": "Sales", "Properties": [
//!       { "Name": "string", "Type": "Edm.String", "Nullable": false },
//!       { "Name": "tags", "Type": "Edm.String", "CollectionKind": "List" }
//!     ] }
//!   ],
//!   "Associations": [
//!     { "Name": "Sales-Product", "Ends": [
//!       { "Name": "Sales", "EntityType": "Sales", "Multiplicity": "*" },
//!       { "Name": "Product", "EntityType": "Product", "Multiplicity": "1" }
//!     ] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Whether a property holds one value or a list.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionKind {
    /// A single value.
    #[default]
    None,
    /// A homogeneous list.
    List,
}

/// A property as declared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyDef {
    /// Property name.
    pub name: String,
    /// `Edm.*` primitive name or a complex type name.
    #[serde(rename = "Type")]
    pub type_name: String,
    /// Whether absent or null values are accepted.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Default literal text.
    #[serde(default)]
    pub default_value: Option<String>,
    /// Single value or list.
    #[serde(default)]
    pub collection_kind: CollectionKind,
    /// Whether values must be unique per entity type.
    #[serde(default)]
    pub unique: bool,
}

const fn default_nullable() -> bool {
    true
}

impl PropertyDef {
    /// Creates a nullable single-valued property.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            default_value: None,
            collection_kind: CollectionKind::None,
            unique: false,
        }
    }

    /// Marks the property as non-nullable.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default literal.
    #[must_use]
    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.default_value = Some(text.into());
        self
    }

    /// Makes the property list-valued.
    #[must_use]
    pub fn list(mut self) -> Self {
        self.collection_kind = CollectionKind::List;
        self
    }

    /// Marks the property as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// An entity type as declared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityTypeDef {
    /// Entity type name.
    pub name: String,
    /// Declared properties.
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

impl EntityTypeDef {
    /// Creates an entity type with no declared properties.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }
}

/// A complex type as declared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComplexTypeDef {
    /// Complex type name.
    pub name: String,
    /// Declared properties.
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

impl ComplexTypeDef {
    /// Creates a complex type with no properties.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }
}

/// One association end as declared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssociationEndDef {
    /// Role name.
    pub name: String,
    /// Entity type name at this end.
    pub entity_type: String,
    /// `0..1`, `1` or `*`.
    pub multiplicity: String,
}

impl AssociationEndDef {
    /// Creates an end whose role name is the entity type name.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, multiplicity: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        Self {
            name: entity_type.clone(),
            entity_type,
            multiplicity: multiplicity.into(),
        }
    }
}

/// An association as declared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssociationDef {
    /// Association name.
    pub name: String,
    /// The two ends.
    pub ends: [AssociationEndDef; 2],
}

impl AssociationDef {
    /// Creates an association named `<a>-<b>` from its two ends.
    #[must_use]
    pub fn new(a: AssociationEndDef, b: AssociationEndDef) -> Self {
        Self {
            name: format!("{}-{}", a.entity_type, b.entity_type),
            ends: [a, b],
        }
    }
}

/// A complete schema as submitted by a host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchemaDefinition {
    /// Entity types.
    #[serde(default)]
    pub entity_types: Vec<EntityTypeDef>,
    /// Complex types.
    #[serde(default)]
    pub complex_types: Vec<ComplexTypeDef>,
    /// Associations.
    #[serde(default)]
    pub associations: Vec<AssociationDef>,
}

impl SchemaDefinition {
    /// Creates an empty definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity type.
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: EntityTypeDef) -> Self {
        self.entity_types.push(entity_type);
        self
    }

    /// Adds a complex type.
    #[must_use]
    pub fn with_complex_type(mut self, complex_type: ComplexTypeDef) -> Self {
        self.complex_types.push(complex_type);
        self
    }

    /// Adds an association.
    #[must_use]
    pub fn with_association(mut self, association: AssociationDef) -> Self {
        self.associations.push(association);
        self
    }
}
