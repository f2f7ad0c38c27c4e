//! Integration tests for CoreConfig

use entable_foundation::CoreConfig;

#[test]
fn hosts_load_partial_json() {
    let config: CoreConfig =
        serde_json::from_str(r#"{"max_slots": 50, "default_top": 10, "id_seed": 3}"#).unwrap();
    assert_eq!(config.max_slots, 50);
    assert_eq!(config.default_top, 10);
    assert_eq!(config.id_seed, Some(3));
    assert_eq!(config.link_retry_limit, 3);
}

#[test]
fn builders_compose() {
    let config = CoreConfig::default()
        .with_max_slots(1)
        .with_max_string_bytes(2)
        .with_max_complex_depth(3)
        .with_link_retry_limit(0);
    assert_eq!(
        (config.max_slots, config.max_string_bytes, config.max_complex_depth),
        (1, 2, 3)
    );
    assert_eq!(config.link_retry_limit, 0);
}
