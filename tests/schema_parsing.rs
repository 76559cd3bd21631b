//! Integration tests for schema payload parsing.
//!
//! These exercise the normalisation of `list_tables` and `describe_table`
//! payloads exactly as the tool server produces them.

use mysql_mcp_client::schema::{parse_columns, parse_table_names, ColumnSchema, SchemaError};

// =============================================================================
// Table Listing Tests
// =============================================================================

#[test]
fn test_table_names_from_server_payload() {
    let text = r#"[{"Tables_in_selldata":"orders"}, {"Tables_in_selldata":"users"}]"#;
    let names = parse_table_names(text).unwrap();
    assert_eq!(names, vec!["orders", "users"]);
}

#[test]
fn test_table_names_with_unexpected_database_name() {
    // The active database may differ from the configured one; any key
    // carrying the marker prefix is accepted.
    let text = r#"[{"Tables_in_staging":"events"}]"#;
    let names = parse_table_names(text).unwrap();
    assert_eq!(names, vec!["events"]);
}

#[test]
fn test_empty_table_listing() {
    let names = parse_table_names("[]").unwrap();
    assert!(names.is_empty());
}

#[test]
fn test_table_listing_rejects_garbage() {
    assert!(matches!(
        parse_table_names("not json"),
        Err(SchemaError::Parse { .. })
    ));
    assert!(matches!(
        parse_table_names(r#"["orders"]"#),
        Err(SchemaError::Parse { .. })
    ));
}

// =============================================================================
// Column Descriptor Tests
// =============================================================================

#[test]
fn test_primary_key_column_round_trip() {
    let text = r#"[{"Field":"id","Type":"int","Null":"NO","Key":"PRI"}]"#;
    let schema = parse_columns("orders", text).unwrap();

    assert_eq!(
        schema.columns,
        vec![ColumnSchema {
            name: "id".to_string(),
            column_type: "int".to_string(),
            nullable: false,
            primary_key: true,
        }]
    );
}

#[test]
fn test_full_mysql_descriptor_row() {
    // The server includes Default and Extra, which this client ignores.
    let text = r#"[{
        "Field": "created_at",
        "Type": "datetime",
        "Null": "YES",
        "Key": "",
        "Default": null,
        "Extra": "on update CURRENT_TIMESTAMP"
    }]"#;

    let schema = parse_columns("orders", text).unwrap();
    assert_eq!(schema.name, "orders");
    assert!(schema.columns[0].nullable);
    assert!(!schema.columns[0].primary_key);
}

#[test]
fn test_multi_column_table_keeps_order() {
    let text = r#"[
        {"Field":"id","Type":"int","Null":"NO","Key":"PRI"},
        {"Field":"user_id","Type":"int","Null":"NO","Key":"MUL"},
        {"Field":"total","Type":"decimal(10,2)","Null":"YES","Key":""}
    ]"#;

    let schema = parse_columns("orders", text).unwrap();
    let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "user_id", "total"]);
    // MUL is an index, not a primary key.
    assert!(!schema.columns[1].primary_key);
}

#[test]
fn test_malformed_descriptor_is_rejected() {
    assert!(matches!(
        parse_columns("orders", r#"[{"Field":"id"}]"#),
        Err(SchemaError::Parse { .. })
    ));
    assert!(matches!(
        parse_columns("orders", "{}"),
        Err(SchemaError::Parse { .. })
    ));
}
