//! Link scenarios for each multiplicity pairing

use entable_engine::LinkEndpoint;
use entable_foundation::{ConflictReason, CoreConfig, ErrorKind};
use entable_runtime::Core;
use entable_schema::{
    AssociationDef, AssociationEndDef, EntityTypeDef, MemoryStore, SchemaDefinition,
};
use serde_json::json;

use crate::{BOX, core};

fn linked(m_sales: &str, m_product: &str) -> Core<MemoryStore> {
    let mut core = core(
        &SchemaDefinition::new()
            .with_entity_type(EntityTypeDef::new("Sales"))
            .with_entity_type(EntityTypeDef::new("Product"))
            .with_association(AssociationDef::new(
                AssociationEndDef::new("Sales", m_sales),
                AssociationEndDef::new("Product", m_product),
            )),
    );
    for (et, id) in [("Sales", "s1"), ("Sales", "s2"), ("Product", "p1"), ("Product", "p2")] {
        core.create_entity(BOX, et, &json!({"__id": id})).unwrap();
    }
    core.create_link(BOX, &sales("s1"), &product("p1")).unwrap();
    core
}

fn sales(id: &str) -> LinkEndpoint {
    LinkEndpoint::new("Sales", id)
}

fn product(id: &str) -> LinkEndpoint {
    LinkEndpoint::new("Product", id)
}

#[test]
fn many_to_one_lifecycle() {
    let mut core = linked("*", "1");

    let err = core.create_link(BOX, &sales("s1"), &product("p2")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict(ConflictReason::MultiplicityExceeded));
    assert_eq!(err.status(), 409);

    let err = core.delete_entity(BOX, "Product", "p1").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict(ConflictReason::LinkedEntityExists));

    core.delete_link(BOX, &sales("s1"), &product("p1")).unwrap();
    core.delete_entity(BOX, "Product", "p1").unwrap();
    assert_eq!(
        core.read_entity(BOX, "Product", "p1", None).unwrap_err().code(),
        "ENTITY_NOT_FOUND"
    );
}

#[test]
fn one_to_many_delete_takes_the_link() {
    let mut core = linked("1", "*");
    core.delete_entity(BOX, "Product", "p1").unwrap();
    assert_eq!(core.store().link_count(BOX), 0);
    assert!(core.list_links(BOX, &sales("s1"), "Product", None, None).unwrap().is_empty());
}

#[test]
fn duplicate_link() {
    let mut core = linked("*", "*");
    let err = core.create_link(BOX, &product("p1"), &sales("s1")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict(ConflictReason::DuplicateLink));
}

#[test]
fn link_listing_follows_creation_order() {
    let mut core = linked("*", "*");
    core.create_link(BOX, &sales("s2"), &product("p2")).unwrap();
    core.create_link(BOX, &sales("s1"), &product("p2")).unwrap();
    let targets: Vec<String> = core
        .list_links(BOX, &sales("s1"), "Product", None, None)
        .unwrap()
        .into_iter()
        .map(|k| k.id)
        .collect();
    assert_eq!(targets, vec!["p1", "p2"]);
    let sources: Vec<String> = core
        .list_links(BOX, &product("p2"), "Sales", Some("1"), Some("1"))
        .unwrap()
        .into_iter()
        .map(|k| k.id)
        .collect();
    assert_eq!(sources, vec!["s1"]);
}

#[test]
fn link_listing_pages_past_ten_entries() {
    let config = CoreConfig::default().with_paging(10, 100, 100);
    let mut core = Core::new(MemoryStore::new(), config);
    core.install_schema(
        BOX,
        &SchemaDefinition::new()
            .with_entity_type(EntityTypeDef::new("Sales"))
            .with_entity_type(EntityTypeDef::new("Product"))
            .with_association(AssociationDef::new(
                AssociationEndDef::new("Sales", "*"),
                AssociationEndDef::new("Product", "*"),
            )),
    )
    .unwrap();
    core.create_entity(BOX, "Sales", &json!({"__id": "s1"})).unwrap();
    // Linked in reverse id order so creation order differs from id order.
    let created: Vec<String> = (0..14).rev().map(|i| format!("p{i:02}")).collect();
    for id in &created {
        core.create_entity(BOX, "Product", &json!({"__id": id})).unwrap();
        core.create_link(BOX, &sales("s1"), &product(id)).unwrap();
    }

    let page = |top: Option<&str>, skip: Option<&str>| -> Vec<String> {
        core.list_links(BOX, &sales("s1"), "Product", top, skip)
            .unwrap()
            .into_iter()
            .map(|k| k.id)
            .collect()
    };
    let mut walked = Vec::new();
    for skip in ["0", "5", "10"] {
        walked.extend(page(Some("5"), Some(skip)));
    }
    assert_eq!(walked, created);
    assert_eq!(page(None, None), created[..10].to_vec());
    assert_eq!(page(None, Some("10")), created[10..].to_vec());
    assert!(page(Some("5"), Some("14")).is_empty());
}

#[test]
fn links_need_both_instances() {
    let mut core = linked("*", "*");
    let err = core.create_link(BOX, &sales("s1"), &product("p9")).unwrap_err();
    assert_eq!(err.code(), "ENTITY_NOT_FOUND");
    let err = core.check_link_delete(BOX, &sales("s2"), &product("p1")).unwrap_err();
    assert_eq!(err.code(), "LINK_NOT_FOUND");
}
