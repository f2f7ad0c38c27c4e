//! Query scenarios: filter literals, ordering, projection and paging

use entable_runtime::QueryOptions;
use entable_schema::{EntityTypeDef, PropertyDef, SchemaDefinition};
use serde_json::{Value as Json, json};

use crate::{BOX, core};

fn definition() -> SchemaDefinition {
    SchemaDefinition::new().with_entity_type(
        EntityTypeDef::new("entity")
            .with_property(PropertyDef::new("string", "Edm.String"))
            .with_property(PropertyDef::new("int32", "Edm.Int32"))
            .with_property(PropertyDef::new("tags", "Edm.String").list()),
    )
}

fn seeded() -> entable_runtime::Core<entable_schema::MemoryStore> {
    let mut core = core(&definition());
    for body in [
        json!({"__id": "e1", "string": "string data", "int32": 5, "tags": ["a"]}),
        json!({"__id": "e2", "string": "other", "int32": 1}),
        json!({"__id": "e3", "int32": 5}),
    ] {
        core.create_entity(BOX, "entity", &body).unwrap();
    }
    core
}

fn ids(rows: &[Json]) -> Vec<&str> {
    rows.iter().filter_map(|r| r["__id"].as_str()).collect()
}

// =============================================================================
// Filter Literals
// =============================================================================

#[test]
fn string_literal_matches() {
    let core = seeded();
    let rows = core
        .query(BOX, "entity", &QueryOptions::new().with_filter("string eq 'string data'"))
        .unwrap();
    assert_eq!(ids(&rows), vec!["e1"]);
}

#[test]
fn numeric_literal_against_string_is_rejected() {
    let core = seeded();
    let err = core
        .query(BOX, "entity", &QueryOptions::new().with_filter("string eq 1111"))
        .unwrap_err();
    assert_eq!(err.code(), "OPERATOR_AND_OPERAND_TYPE_MISMATCHED");
    assert_eq!(err.kind.subject(), Some("string"));
    assert_eq!(err.status(), 400);
}

#[test]
fn boolean_literal_against_other_types_is_rejected() {
    let core = seeded();
    for filter in ["int32 gt true", "string lt false", "int32 eq false"] {
        let err = core
            .query(BOX, "entity", &QueryOptions::new().with_filter(filter))
            .unwrap_err();
        assert_eq!(err.code(), "OPERATOR_AND_OPERAND_TYPE_MISMATCHED", "{filter}");
    }
}

#[test]
fn int32_bounds() {
    let core = seeded();
    let err = core
        .query(BOX, "entity", &QueryOptions::new().with_filter("int32 eq 2147483648"))
        .unwrap_err();
    assert_eq!(err.code(), "UNSUPPORTED_OPERAND_FORMAT");
    assert_eq!(err.kind.subject(), Some("int32"));

    let rows = core
        .query(BOX, "entity", &QueryOptions::new().with_filter("int32 eq 2147483647"))
        .unwrap();
    assert!(rows.is_empty());
}

// =============================================================================
// Ordering, Projection, Paging
// =============================================================================

#[test]
fn ordering_on_a_list_is_rejected() {
    let core = seeded();
    let err = core
        .query(BOX, "entity", &QueryOptions::new().with_orderby("tags"))
        .unwrap_err();
    assert_eq!(err.code(), "CANNOT_SPECIFY_THE_LIST_TYPE_TO_ORDERBY");
    assert_eq!(err.status(), 400);
}

#[test]
fn unknown_select_returns_ids_only() {
    let core = seeded();
    let rows = core
        .query(BOX, "entity", &QueryOptions::new().with_select("noSuch"))
        .unwrap();
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.as_object().map(serde_json::Map::len), Some(1));
    }
    let one = core.read_entity(BOX, "entity", "e2", Some("noSuch")).unwrap();
    assert_eq!(one, json!({"__id": "e2"}));
}

#[test]
fn full_pipeline() {
    let core = seeded();
    let options = QueryOptions::new()
        .with_filter("int32 ge 1")
        .with_orderby("int32 desc,string")
        .with_select("string")
        .with_top("2")
        .with_skip("1");
    let rows = core.query(BOX, "entity", &options).unwrap();
    // int32 desc: e3 (5, null string), e1 (5), e2 (1); skip 1, top 2
    assert_eq!(
        rows,
        vec![
            json!({"__id": "e1", "string": "string data"}),
            json!({"__id": "e2", "string": "other"}),
        ]
    );
}

#[test]
fn options_are_checked_before_reading() {
    let core = seeded();
    let err = core
        .query(
            BOX,
            "entity",
            &QueryOptions::new().with_filter("int32 eq 1").with_top("x"),
        )
        .unwrap_err();
    assert_eq!(err.code(), "QUERY_PARSE_ERROR");
}

#[test]
fn options_deserialize_from_query_keys() {
    let options: QueryOptions =
        serde_json::from_value(json!({"$filter": "int32 eq 5", "$orderby": "__id desc"})).unwrap();
    let rows = seeded().query(BOX, "entity", &options).unwrap();
    assert_eq!(ids(&rows), vec!["e3", "e1"]);
}
