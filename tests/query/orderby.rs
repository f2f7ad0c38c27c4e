//! Integration tests for `$orderby` and paging

use entable_foundation::CoreConfig;
use entable_query::{Paging, SortDirection, compile_orderby, sort_documents};
use entable_schema::Document;
use serde_json::json;

use crate::{doc, ids, sales, snapshot};

fn documents() -> Vec<Document> {
    vec![
        doc("a", &json!({"int32": 2, "string": "x", "address": {"city": "b"}})),
        doc("b", &json!({"int32": null, "string": "y", "address": null})),
        doc("c", &json!({"int32": 1, "string": "x", "address": {"city": "a"}})),
        doc("d", &json!({"int32": 2, "string": "w"})),
    ]
}

fn sorted(orderby: &str) -> Vec<String> {
    let snapshot = snapshot();
    let keys = compile_orderby(&snapshot, sales(&snapshot), orderby).unwrap();
    let mut docs = documents();
    sort_documents(&mut docs, &keys);
    ids(&docs).into_iter().map(String::from).collect()
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn nulls_first_ascending_last_descending() {
    assert_eq!(sorted("int32"), vec!["b", "c", "a", "d"]);
    assert_eq!(sorted("int32 desc"), vec!["a", "d", "c", "b"]);
}

#[test]
fn later_keys_break_ties() {
    assert_eq!(sorted("int32 desc,string"), vec!["d", "a", "c", "b"]);
    assert_eq!(sorted("string,int32 desc"), vec!["d", "a", "c", "b"]);
}

#[test]
fn complex_leaves_sort() {
    assert_eq!(sorted("address/city"), vec!["b", "d", "c", "a"]);
}

#[test]
fn unknown_names_keep_input_order() {
    assert_eq!(sorted("neverWritten"), vec!["a", "b", "c", "d"]);
}

#[test]
fn keys_carry_direction() {
    let snapshot = snapshot();
    let keys = compile_orderby(&snapshot, sales(&snapshot), "int32%20desc,__id").unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].direction, SortDirection::Descending);
    assert_eq!(keys[1].direction, SortDirection::Ascending);
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn lists_cannot_order() {
    let snapshot = snapshot();
    for orderby in ["tags", "past/city", "int32,tags desc"] {
        let err = compile_orderby(&snapshot, sales(&snapshot), orderby).unwrap_err();
        assert_eq!(err.code(), "CANNOT_SPECIFY_THE_LIST_TYPE_TO_ORDERBY");
        assert_eq!(err.status(), 400);
    }
}

#[test]
fn malformed_terms() {
    let snapshot = snapshot();
    for orderby in ["", "int32 ASC", "int32,", "int32 asc extra"] {
        let err = compile_orderby(&snapshot, sales(&snapshot), orderby).unwrap_err();
        assert_eq!(err.code(), "QUERY_PARSE_ERROR", "{orderby:?}");
    }
}

// =============================================================================
// Paging
// =============================================================================

#[test]
fn paging_windows() {
    let config = CoreConfig::default();
    let paging = Paging::parse(Some("2"), Some("1"), &config).unwrap();
    assert_eq!(paging.apply(vec![1, 2, 3, 4]), vec![2, 3]);
    assert_eq!(Paging::parse(None, None, &config).unwrap(), Paging::new(25, 0));
    assert_eq!(Paging::parse(Some("0"), None, &config).unwrap().apply(vec![1]), Vec::<i32>::new());
}

#[test]
fn paging_limits() {
    let config = CoreConfig::default().with_paging(5, 10, 20);
    assert!(Paging::parse(Some("10"), Some("20"), &config).is_ok());
    let rejected = [
        (Some("11"), None),
        (None, Some("21")),
        (Some("-1"), None),
        (Some("x"), None),
    ];
    for (top, skip) in rejected {
        let err = Paging::parse(top, skip, &config).unwrap_err();
        assert_eq!(err.code(), "QUERY_PARSE_ERROR");
    }
}
