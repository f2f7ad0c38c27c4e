//! Integration tests for MemoryStore
//!
//! Preconditions are checked atomically with the write they guard.

use entable_schema::{
    AssociationDef, AssociationEndDef, DeleteRequest, Document, DocumentKey, EntityStore,
    EntityTypeDef, IdGenerator, LinkPrecondition, MemoryStore, PutMode, SchemaBuilder,
    SchemaDefinition, Side, is_valid_id,
};
use serde_json::{Map, json};

fn doc(entity_type: &str, id: &str) -> Document {
    Document {
        key: DocumentKey::new("box", entity_type, id),
        published: 0,
        updated: 0,
        body: Map::new(),
    }
}

fn ids(a: &str, b: &str) -> [String; 2] {
    [a.to_string(), b.to_string()]
}

fn store() -> (MemoryStore, entable_schema::AssociationId) {
    let snapshot = SchemaBuilder::new()
        .build(
            &SchemaDefinition::new()
                .with_entity_type(EntityTypeDef::new("Sales"))
                .with_entity_type(EntityTypeDef::new("Product"))
                .with_association(AssociationDef::new(
                    AssociationEndDef::new("Sales", "*"),
                    AssociationEndDef::new("Product", "1"),
                )),
        )
        .unwrap();
    let (sales, _) = snapshot.entity_type("Sales").unwrap();
    let (product, _) = snapshot.entity_type("Product").unwrap();
    let (assoc, _) = snapshot.association_between(sales, product).unwrap();
    let mut store = MemoryStore::new();
    store.install_schema("box", snapshot);
    for (et, id) in [("Sales", "s1"), ("Sales", "s2"), ("Product", "p1")] {
        store.put_document(doc(et, id), PutMode::Create).unwrap();
    }
    (store, assoc)
}

// =============================================================================
// Links
// =============================================================================

#[test]
fn create_link_checks_preconditions() {
    let (mut store, assoc) = store();
    let guard = [LinkPrecondition::NoLinkForRole {
        association: assoc,
        side: Side::A,
        id: "s1".into(),
    }];
    store.create_link("box", assoc, ids("s1", "p1"), &guard).unwrap();
    let err = store
        .create_link("box", assoc, ids("s1", "p1"), &guard)
        .unwrap_err();
    assert_eq!(err.code(), "PRECONDITION_FAILED");
    assert_eq!(err.status(), 412);
    assert_eq!(store.link_count("box"), 1);
}

#[test]
fn links_are_listed_per_side() {
    let (mut store, assoc) = store();
    store.create_link("box", assoc, ids("s1", "p1"), &[]).unwrap();
    store.create_link("box", assoc, ids("s2", "p1"), &[]).unwrap();
    let from_product = store.links("box", assoc, Side::B, "p1").unwrap();
    assert_eq!(from_product.len(), 2);
    assert!(from_product[0].sequence < from_product[1].sequence);
    assert_eq!(store.links("box", assoc, Side::A, "s2").unwrap().len(), 1);
    assert!(store.links("other", assoc, Side::A, "s2").unwrap().is_empty());
}

#[test]
fn delete_link_requires_the_pair() {
    let (mut store, assoc) = store();
    store.create_link("box", assoc, ids("s1", "p1"), &[]).unwrap();
    let err = store.delete_link("box", assoc, &ids("s2", "p1")).unwrap_err();
    assert_eq!(err.code(), "LINK_NOT_FOUND");
    store.delete_link("box", assoc, &ids("s1", "p1")).unwrap();
    assert_eq!(store.link_count("box"), 0);
}

// =============================================================================
// Documents
// =============================================================================

#[test]
fn delete_drops_requested_links() {
    let (mut store, assoc) = store();
    store.create_link("box", assoc, ids("s1", "p1"), &[]).unwrap();
    store.create_link("box", assoc, ids("s2", "p1"), &[]).unwrap();
    store
        .delete_document(&DeleteRequest {
            key: DocumentKey::new("box", "Sales", "s1"),
            unlink: vec![(assoc, Side::A)],
            preconditions: Vec::new(),
        })
        .unwrap();
    assert_eq!(store.link_count("box"), 1);
    assert_eq!(store.document_count(), 2);
}

#[test]
fn delete_is_refused_when_guard_fails() {
    let (mut store, assoc) = store();
    store.create_link("box", assoc, ids("s1", "p1"), &[]).unwrap();
    let err = store
        .delete_document(&DeleteRequest {
            key: DocumentKey::new("box", "Product", "p1"),
            unlink: Vec::new(),
            preconditions: vec![LinkPrecondition::NoLinkForRole {
                association: assoc,
                side: Side::B,
                id: "p1".into(),
            }],
        })
        .unwrap_err();
    assert_eq!(err.code(), "PRECONDITION_FAILED");
    assert_eq!(store.document_count(), 3);
}

#[test]
fn document_json_carries_management_fields() {
    let mut document = doc("Sales", "s1");
    document.published = 5;
    document.updated = 6;
    document.body.insert("rank".into(), json!(1));
    let rendered = document.to_json();
    assert_eq!(rendered["__id"], json!("s1"));
    assert_eq!(rendered["__published"], json!("/Date(5)/"));
    assert_eq!(rendered["__updated"], json!("/Date(6)/"));
    assert_eq!(rendered["rank"], json!(1));
}

#[test]
fn generated_ids_are_valid() {
    let mut a = IdGenerator::seeded(7);
    let mut b = IdGenerator::seeded(7);
    for _ in 0..16 {
        let id = a.next_id();
        assert!(is_valid_id(&id));
        assert_eq!(id.len(), 32);
        assert_eq!(id, b.next_id());
    }
    assert!(!is_valid_id("_hidden"));
    assert!(!is_valid_id(""));
}
