use sql_diagnostic_engine::schema::{PermissiveSchema, Schema, SchemaIntrospector, StaticSchema};

#[test]
fn test_parse_simple_table() {
    let sql = "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(255))";
    let schema = Schema::parse(sql).unwrap();
    assert_eq!(schema.tables.len(), 1);
    assert!(schema.tables.contains_key("users"));
    let users = &schema.tables["users"];
    assert_eq!(users.columns.len(), 2);
    assert_eq!(users.columns[0].name, "id");
    assert!(users.columns[0].is_primary);
}

#[test]
fn test_parse_multiple_tables() {
    let sql = r#"
        CREATE TABLE users (id INT PRIMARY KEY);
        CREATE TABLE orders (id INT PRIMARY KEY, user_id INT);
    "#;
    let schema = Schema::parse(sql).unwrap();
    assert_eq!(schema.tables.len(), 2);
    assert!(schema.tables.contains_key("users"));
    assert!(schema.tables.contains_key("orders"));
}

#[test]
fn test_parse_not_null() {
    let sql = "CREATE TABLE users (id INT NOT NULL, name VARCHAR(255))";
    let schema = Schema::parse(sql).unwrap();
    let users = &schema.tables["users"];
    assert!(!users.columns[0].is_nullable);
    assert!(users.columns[1].is_nullable);
}

#[test]
fn test_parse_index() {
    let sql = r#"
        CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255));
        CREATE INDEX idx_email ON users(email);
    "#;
    let schema = Schema::parse(sql).unwrap();
    let users = &schema.tables["users"];
    assert_eq!(users.indexes.len(), 1);
    assert_eq!(users.indexes[0].columns[0], "email");
}

#[test]
fn test_parse_unique_index() {
    let sql = r#"
        CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255));
        CREATE UNIQUE INDEX idx_email ON users(email);
    "#;
    let schema = Schema::parse(sql).unwrap();
    let users = &schema.tables["users"];
    assert!(users.indexes[0].is_unique);
}

#[test]
fn test_parse_composite_index() {
    let sql = r#"
        CREATE TABLE orders (id INT, user_id INT, created_at TIMESTAMP);
        CREATE INDEX idx_user_created ON orders(user_id, created_at);
    "#;
    let schema = Schema::parse(sql).unwrap();
    let orders = &schema.tables["orders"];
    assert_eq!(orders.indexes[0].columns.len(), 2);
}

#[test]
fn test_parse_various_types() {
    let sql = r#"
        CREATE TABLE test (
            id BIGINT,
            price DECIMAL(10,2),
            active BOOLEAN,
            data TEXT,
            created_at TIMESTAMP
        )
    "#;
    let schema = Schema::parse(sql).unwrap();
    let test = &schema.tables["test"];
    assert_eq!(test.columns.len(), 5);
}

#[test]
fn test_parse_invalid_schema() {
    let sql = "CREATE TABEL users (id INT)";
    let result = Schema::parse(sql);
    assert!(result.is_err());
}

#[test]
fn test_empty_schema() {
    let sql = "";
    let schema = Schema::parse(sql).unwrap();
    assert!(schema.tables.is_empty());
}

#[test]
fn static_schema_introspects_parsed_ddl() {
    let ddl = r#"
        CREATE TABLE orders (id INT PRIMARY KEY, user_id INT);
        CREATE INDEX idx_user ON orders(user_id);
    "#;
    let schema = StaticSchema::parse(ddl).unwrap();
    assert!(schema.table_exists("orders"));
    assert!(!schema.table_exists("ghosts"));
    assert!(schema.column_exists("orders", "user_id"));
    assert!(!schema.column_exists("orders", "ghost_column"));
    assert_eq!(schema.list_tables(), vec!["orders".to_string()]);
    assert!(schema.list_columns("orders").contains(&"id".to_string()));
}

#[test]
fn permissive_schema_resolves_everything_as_present() {
    let schema = PermissiveSchema;
    assert!(schema.table_exists("anything"));
    assert!(schema.column_exists("anything", "whatever"));
    assert!(schema.list_tables().is_empty());
}
