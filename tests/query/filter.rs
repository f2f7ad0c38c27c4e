//! Integration tests for `$filter`
//!
//! Parsing, type checking against the coercion table, and evaluation.

use entable_foundation::ErrorKind;
use entable_query::{compile_filter, filter_documents};
use entable_schema::Document;
use proptest::prelude::*;
use serde_json::json;

use crate::{doc, ids, sales, snapshot};

fn documents() -> Vec<Document> {
    vec![
        doc(
            "s1",
            &json!({
                "string": "string data",
                "int32": 10,
                "double": 1.5,
                "boolean": true,
                "datetime": "/Date(1000)/",
                "tags": ["red", "blue"],
                "address": {"city": "Tokyo", "zip": 100},
                "past": [{"city": "Osaka", "zip": 530}, {"city": "Kyoto", "zip": 600}]
            }),
        ),
        doc(
            "s2",
            &json!({
                "string": "other",
                "int32": -3,
                "double": 20.25,
                "boolean": false,
                "datetime": "/Date(5000)/",
                "tags": ["green"],
                "address": {"city": "Nagoya", "zip": null},
                "past": null
            }),
        ),
        doc(
            "s3",
            &json!({
                "string": null,
                "int32": null,
                "double": null,
                "boolean": null,
                "datetime": null,
                "tags": null,
                "address": null,
                "past": null
            }),
        ),
    ]
}

fn run(filter: &str) -> Vec<String> {
    let snapshot = snapshot();
    let predicate = compile_filter(&snapshot, sales(&snapshot), filter).unwrap();
    ids(&filter_documents(&predicate, documents()))
        .into_iter()
        .map(String::from)
        .collect()
}

fn code(filter: &str) -> &'static str {
    let snapshot = snapshot();
    compile_filter(&snapshot, sales(&snapshot), filter)
        .unwrap_err()
        .code()
}

// =============================================================================
// Matching
// =============================================================================

#[test]
fn string_equality() {
    assert_eq!(run("string eq 'string data'"), vec!["s1"]);
    assert_eq!(run("string ne 'string data'"), vec!["s2", "s3"]);
}

#[test]
fn percent_encoded_filters_decode() {
    assert_eq!(run("string%20eq%20%27string%20data%27"), vec!["s1"]);
}

#[test]
fn null_comparisons() {
    assert_eq!(run("int32 eq null"), vec!["s3"]);
    assert_eq!(run("int32 ne null"), vec!["s1", "s2"]);
    assert!(run("int32 gt null").is_empty());
}

#[test]
fn numeric_ranges() {
    assert_eq!(run("int32 gt 0"), vec!["s1"]);
    assert_eq!(run("int32 le -3"), vec!["s2"]);
    assert_eq!(run("double ge 1.5 and double lt 20"), vec!["s1"]);
    assert_eq!(run("int32 eq 2147483647"), Vec::<String>::new());
}

#[test]
fn datetime_as_milliseconds() {
    assert_eq!(run("datetime gt 1000"), vec!["s2"]);
    assert_eq!(run("datetime ge 1000"), vec!["s1", "s2"]);
    assert_eq!(run("__updated eq 2000"), vec!["s1", "s2", "s3"]);
}

#[test]
fn lists_match_any_element() {
    assert_eq!(run("tags eq 'blue'"), vec!["s1"]);
    assert_eq!(run("past/city eq 'Kyoto'"), vec!["s1"]);
    assert_eq!(run("past/zip gt 550"), vec!["s1"]);
    assert_eq!(run("address/zip eq null"), vec!["s2", "s3"]);
}

#[test]
fn string_functions() {
    assert_eq!(run("startswith(string, 'str')"), vec!["s1"]);
    assert_eq!(run("substringof('the', string)"), vec!["s2"]);
    assert!(run("substringof('', string)").is_empty());
    assert_eq!(run("startswith(address/city, 'N')"), vec!["s2"]);
}

#[test]
fn precedence_and_grouping() {
    assert_eq!(
        run("int32 eq 10 or int32 eq -3 and boolean eq true"),
        vec!["s1"]
    );
    assert_eq!(
        run("(int32 eq 10 or int32 eq -3) and boolean eq false"),
        vec!["s2"]
    );
}

#[test]
fn unset_names_match_nothing() {
    assert!(run("neverWritten eq 1").is_empty());
    assert_eq!(run("neverWritten eq 1 or int32 eq 10"), vec!["s1"]);
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn literal_kind_mismatches() {
    let snapshot = snapshot();
    let err = compile_filter(&snapshot, sales(&snapshot), "string eq 1111").unwrap_err();
    assert_eq!(err.code(), "OPERATOR_AND_OPERAND_TYPE_MISMATCHED");
    assert_eq!(err.kind.subject(), Some("string"));

    assert_eq!(code("int32 eq '1'"), "OPERATOR_AND_OPERAND_TYPE_MISMATCHED");
    assert_eq!(code("double eq 1e5"), "OPERATOR_AND_OPERAND_TYPE_MISMATCHED");
    assert_eq!(code("double eq 1.5d"), "OPERATOR_AND_OPERAND_TYPE_MISMATCHED");
    assert_eq!(code("boolean eq 1"), "OPERATOR_AND_OPERAND_TYPE_MISMATCHED");
    assert_eq!(code("address eq 'x'"), "OPERATOR_AND_OPERAND_TYPE_MISMATCHED");
    assert_eq!(code("startswith(int32, '1')"), "OPERATOR_AND_OPERAND_TYPE_MISMATCHED");
}

#[test]
fn out_of_bound_literals() {
    let snapshot = snapshot();
    let err = compile_filter(&snapshot, sales(&snapshot), "int32 eq 2147483648").unwrap_err();
    assert_eq!(err.code(), "UNSUPPORTED_OPERAND_FORMAT");
    assert_eq!(err.kind.subject(), Some("int32"));
    assert_eq!(code("int32 eq -2147483649"), "UNSUPPORTED_OPERAND_FORMAT");
    assert_eq!(code("datetime eq 253402300800000"), "UNSUPPORTED_OPERAND_FORMAT");
}

#[test]
fn unknown_keys() {
    assert_eq!(code("__metadata eq 'x'"), "UNKNOWN_QUERY_KEY");
    assert_eq!(code("_private eq 'x'"), "UNKNOWN_QUERY_KEY");
    assert_eq!(code("address/country eq 'x'"), "UNKNOWN_QUERY_KEY");
}

#[test]
fn boolean_relational_operators() {
    let snapshot = snapshot();
    let err = compile_filter(&snapshot, sales(&snapshot), "boolean gt true").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::FilterParseError { column: 9, .. }));
}

#[test]
fn grammar_errors() {
    let malformed = [
        "",
        "string eq",
        "string EQ 'a'",
        "(int32 eq 1",
        "int32 eq 1 and",
        "not int32 eq 1",
    ];
    for bad in malformed {
        assert_eq!(code(bad), "FILTER_PARSE_ERROR", "{bad:?}");
    }
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn int32_literals_in_range_compile(n in any::<i32>()) {
        let snapshot = snapshot();
        let filter = format!("int32 eq {n}");
        prop_assert!(compile_filter(&snapshot, sales(&snapshot), &filter).is_ok());
    }

    #[test]
    fn int32_literals_past_the_bound_are_unsupported(
        n in prop_oneof![
            -9_000_000_000_000i64..i64::from(i32::MIN),
            i64::from(i32::MAX) + 1..9_000_000_000_000i64,
        ]
    ) {
        prop_assert_eq!(code(&format!("int32 eq {n}")), "UNSUPPORTED_OPERAND_FORMAT");
    }

    #[test]
    fn quoted_literals_never_fit_numbers(
        s in "[a-z0-9 ]{0,16}",
        property in prop::sample::select(vec!["int32", "double", "datetime"]),
        op in prop::sample::select(vec!["eq", "ne", "gt", "ge", "lt", "le"]),
    ) {
        prop_assert_eq!(
            code(&format!("{property} {op} '{s}'")),
            "OPERATOR_AND_OPERAND_TYPE_MISMATCHED"
        );
    }

    #[test]
    fn boolean_literals_only_fit_booleans(
        b in any::<bool>(),
        property in prop::sample::select(vec!["string", "int32", "double", "datetime"]),
        op in prop::sample::select(vec!["eq", "ne", "gt", "ge", "lt", "le"]),
    ) {
        prop_assert_eq!(
            code(&format!("{property} {op} {b}")),
            "OPERATOR_AND_OPERAND_TYPE_MISMATCHED"
        );
    }

    #[test]
    fn ge_partitions_by_value(threshold in -20i64..30) {
        let expected: Vec<String> = [("s1", 10i64), ("s2", -3)]
            .into_iter()
            .filter(|(_, v)| *v >= threshold)
            .map(|(id, _)| id.to_string())
            .collect();
        prop_assert_eq!(run(&format!("int32 ge {threshold}")), expected);
    }
}
