//! Integration tests for Error types
//!
//! Tests error construction, codes, statuses, and context.

use entable_foundation::{ConflictReason, Error, ErrorContext, ErrorKind};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn required_field_missing_names_the_leaf() {
    let err = Error::required_field_missing("city");
    assert_eq!(err.code(), "INPUT_REQUIRED_FIELD_MISSING");
    assert_eq!(err.kind.subject(), Some("city"));
    assert!(format!("{err}").contains("city"));
}

#[test]
fn structural_limit() {
    let err = Error::structural_limit(401, 400);
    assert_eq!(err.code(), "ENTITYTYPE_STRUCTUAL_LIMITATION_EXCEEDED");
    let msg = format!("{err}");
    assert!(msg.contains("401"));
    assert!(msg.contains("400"));
}

#[test]
fn filter_parse_carries_column() {
    let err = Error::filter_parse("unexpected token", 7);
    assert!(matches!(err.kind, ErrorKind::FilterParseError { column: 7, .. }));
    assert!(format!("{err}").contains("column 7"));
}

#[test]
fn query_parse_names_the_option() {
    let err = Error::query_parse("$orderby", "unknown direction: ASC");
    assert!(format!("{err}").contains("$orderby"));
    assert_eq!(err.code(), "QUERY_PARSE_ERROR");
}

// =============================================================================
// Codes and Statuses
// =============================================================================

#[test]
fn operand_errors_are_bad_requests() {
    for err in [
        Error::type_mismatch("string"),
        Error::unsupported_operand("int32"),
        Error::unknown_query_key("__metadata"),
        Error::field_format("rank"),
        Error::new(ErrorKind::CannotOrderByListType("tags".into())),
    ] {
        assert_eq!(err.status(), 400, "{err}");
        assert!(err.kind.subject().is_some());
    }
}

#[test]
fn conflicts_have_reason_codes() {
    let cases = [
        (ConflictReason::DuplicateLink, "CONFLICT_DUPLICATED_LINK"),
        (ConflictReason::MultiplicityExceeded, "CONFLICT_LINKS_MULTIPLICITY"),
        (ConflictReason::LinkedEntityExists, "CONFLICT_LINKED_ENTITY"),
        (ConflictReason::UniqueKeyViolated, "CONFLICT_UNIQUE_KEY"),
    ];
    for (reason, code) in cases {
        let err = Error::conflict(reason);
        assert_eq!(err.code(), code);
        assert_eq!(err.status(), 409);
    }
}

#[test]
fn lookup_failures_are_not_found() {
    let err = Error::new(ErrorKind::EntityNotFound {
        entity_type: "Sales".into(),
        id: "s1".into(),
    });
    assert_eq!(err.status(), 404);
    assert!(format!("{err}").contains("Sales('s1')"));
    assert_eq!(Error::new(ErrorKind::LinkNotFound).status(), 404);
    assert_eq!(
        Error::new(ErrorKind::PreconditionFailed("stale".into())).status(),
        412
    );
    assert_eq!(Error::internal("boom").status(), 500);
}

// =============================================================================
// Context
// =============================================================================

#[test]
fn context_display() {
    let ctx = ErrorContext::new()
        .with_collection("box")
        .with_entity_type("Sales")
        .with_path(vec!["past".into(), "0".into(), "city".into()]);
    let err = Error::required_field_missing("city").with_context(ctx);
    let rendered = err.context.as_ref().map(ToString::to_string).unwrap_or_default();
    assert!(rendered.contains("box"));
    assert!(rendered.contains("past/0/city"));
}
