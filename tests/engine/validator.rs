//! Integration tests for the entity validator
//!
//! Validation must be idempotent: a normalized body validates to itself.

use entable_engine::Validator;
use entable_foundation::{CoreConfig, ErrorKind, Primitive};
use entable_schema::{
    ComplexTypeDef, EntityTypeDef, IdGenerator, PropertyDef, SchemaBuilder, SchemaDefinition,
    SchemaSnapshot,
};
use proptest::prelude::*;
use serde_json::{Map, Value as Json, json};

const NOW: i64 = 1_700_000_000_000;

fn snapshot() -> SchemaSnapshot {
    let def = SchemaDefinition::new()
        .with_complex_type(
            ComplexTypeDef::new("Address")
                .with_property(PropertyDef::new("city", "Edm.String").required())
                .with_property(PropertyDef::new("zip", "Edm.Int32").with_default("0")),
        )
        .with_entity_type(
            EntityTypeDef::new("Sales")
                .with_property(PropertyDef::new("name", "Edm.String"))
                .with_property(PropertyDef::new("rank", "Edm.Int32").with_default("3"))
                .with_property(PropertyDef::new("price", "Edm.Double"))
                .with_property(PropertyDef::new("active", "Edm.Boolean"))
                .with_property(
                    PropertyDef::new("stamp", "Edm.DateTime").with_default("SYSUTCDATETIME()"),
                )
                .with_property(PropertyDef::new("tags", "Edm.String").list())
                .with_property(PropertyDef::new("past", "Address").list()),
        )
        .with_entity_type(
            (0..5).fold(EntityTypeDef::new("Strict"), |et, i| {
                et.with_property(PropertyDef::new(format!("p{i}"), "Edm.Int32").required())
            }),
        );
    SchemaBuilder::new().build(&def).unwrap()
}

fn validate(
    snapshot: &SchemaSnapshot,
    entity_type: &str,
    body: &Json,
) -> entable_foundation::Result<Json> {
    let (_, et) = snapshot.entity_type(entity_type).unwrap();
    let mut ids = IdGenerator::seeded(1);
    Validator::at(snapshot, &CoreConfig::default(), NOW)
        .validate(et, body, &mut ids)
        .map(|n| n.to_json())
}

// =============================================================================
// Normalization
// =============================================================================

#[test]
fn array_of_complex_defaults() {
    let snapshot = snapshot();
    let out = validate(
        &snapshot,
        "Sales",
        &json!({"__id": "s1", "past": [{"city": "Osaka"}, {"city": "Kyoto", "zip": 600}]}),
    )
    .unwrap();
    assert_eq!(
        out,
        json!({
            "__id": "s1",
            "name": null,
            "rank": 3,
            "price": null,
            "active": null,
            "stamp": format!("/Date({NOW})/"),
            "tags": null,
            "past": [{"city": "Osaka", "zip": 0}, {"city": "Kyoto", "zip": 600}]
        })
    );
}

#[test]
fn missing_ids_are_generated() {
    let snapshot = snapshot();
    let out = validate(&snapshot, "Sales", &json!({})).unwrap();
    let id = out["__id"].as_str().unwrap();
    assert_eq!(id.len(), 32);
    assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
}

#[test]
fn required_path_includes_list_index() {
    let snapshot = snapshot();
    let err = validate(
        &snapshot,
        "Sales",
        &json!({"past": [{"city": "Osaka"}, {"zip": 1}]}),
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InputRequiredFieldMissing("city".into()));
    let path = err.context.map(|c| c.path).unwrap_or_default();
    assert_eq!(path, vec!["past", "1", "city"]);
}

#[test]
fn format_errors() {
    let snapshot = snapshot();
    for (body, name) in [
        (json!({"rank": "3"}), "rank"),
        (json!({"rank": 2_147_483_648i64}), "rank"),
        (json!({"price": "1.5"}), "price"),
        (json!({"active": 1}), "active"),
        (json!({"stamp": "2020-01-01"}), "stamp"),
        (json!({"tags": "red"}), "tags"),
        (json!({"tags": ["red", null]}), "tags"),
        (json!({"past": [{"city": "Osaka", "country": "JP"}]}), "country"),
        (json!({"_secret": 1}), "_secret"),
        (json!({"nested": {"a": 1}}), "nested"),
    ] {
        let err = validate(&snapshot, "Sales", &body).unwrap_err();
        assert_eq!(err.code(), "REQUEST_FIELD_FORMAT_ERROR", "{body}");
        assert_eq!(err.kind.subject(), Some(name), "{body}");
    }
}

#[test]
fn dynamic_types_are_reported() {
    let snapshot = snapshot();
    let (_, et) = snapshot.entity_type("Sales").unwrap();
    let mut ids = IdGenerator::seeded(1);
    let normalized = Validator::at(&snapshot, &CoreConfig::default(), NOW)
        .validate(et, &json!({"extra": 1, "note": "x", "gone": null}), &mut ids)
        .unwrap();
    assert_eq!(
        normalized.dynamic,
        vec![("extra".to_string(), Primitive::Int32), ("note".to_string(), Primitive::String)]
    );
    assert_eq!(normalized.body["gone"], Json::Null);
}

#[test]
fn slot_limit_counts_every_position() {
    let snapshot = snapshot();
    let (_, et) = snapshot.entity_type("Sales").unwrap();
    let mut ids = IdGenerator::seeded(1);
    let body = json!({"tags": ["a", "b"], "past": [{"city": "x"}]});
    // name rank price active stamp, 2 tags, city + zip
    let counted = Validator::at(&snapshot, &CoreConfig::default(), NOW)
        .validate(et, &body, &mut ids)
        .unwrap()
        .slots;
    assert_eq!(counted, 9);

    let tight = CoreConfig::default().with_max_slots(8);
    let err = Validator::at(&snapshot, &tight, NOW)
        .validate(et, &body, &mut ids)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StructuralLimitExceeded { slots: 9, limit: 8 });
}

// =============================================================================
// Property Tests
// =============================================================================

fn sales_body() -> impl Strategy<Value = Json> {
    (
        proptest::option::of("[a-zA-Z ]{0,20}"),
        proptest::option::of(any::<i32>()),
        proptest::option::of(-1.0e6f64..1.0e6),
        proptest::option::of(any::<bool>()),
        proptest::option::of(0i64..253_402_300_799_999),
        proptest::collection::vec("[a-z]{1,8}", 0..4),
        proptest::collection::vec(("[a-z]{1,8}", proptest::option::of(0i32..99_999)), 0..3),
    )
        .prop_map(|(name, rank, price, active, stamp, tags, past)| {
            let mut body = Map::new();
            if let Some(name) = name {
                body.insert("name".into(), json!(name));
            }
            if let Some(rank) = rank {
                body.insert("rank".into(), json!(rank));
            }
            if let Some(price) = price {
                body.insert("price".into(), json!(price));
            }
            if let Some(active) = active {
                body.insert("active".into(), json!(active));
            }
            if let Some(stamp) = stamp {
                body.insert("stamp".into(), json!(format!("/Date({stamp})/")));
            }
            if !tags.is_empty() {
                body.insert("tags".into(), json!(tags));
            }
            let past: Vec<Json> = past
                .into_iter()
                .map(|(city, zip)| match zip {
                    Some(zip) => json!({"city": city, "zip": zip}),
                    None => json!({"city": city}),
                })
                .collect();
            body.insert("past".into(), Json::Array(past));
            Json::Object(body)
        })
}

proptest! {
    #[test]
    fn normalization_is_idempotent(body in sales_body()) {
        let snapshot = snapshot();
        let once = validate(&snapshot, "Sales", &body).unwrap();
        let twice = validate(&snapshot, "Sales", &once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn first_missing_required_leaf_is_named(
        missing in proptest::collection::btree_set(0usize..5, 1..5)
    ) {
        let snapshot = snapshot();
        let mut body = Map::new();
        for i in 0..5 {
            if !missing.contains(&i) {
                body.insert(format!("p{i}"), json!(i));
            }
        }
        let err = validate(&snapshot, "Strict", &Json::Object(body)).unwrap_err();
        let first = missing.iter().next().copied().unwrap_or_default();
        prop_assert_eq!(err.kind, ErrorKind::InputRequiredFieldMissing(format!("p{first}")));
    }

    #[test]
    fn explicit_nulls_on_required_leaves_are_missing(which in 0usize..5) {
        let snapshot = snapshot();
        let mut body = Map::new();
        for i in 0..5 {
            body.insert(format!("p{i}"), if i == which { Json::Null } else { json!(i) });
        }
        let err = validate(&snapshot, "Strict", &Json::Object(body)).unwrap_err();
        prop_assert_eq!(err.code(), "INPUT_REQUIRED_FIELD_MISSING");
    }
}
