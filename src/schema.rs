//! Database schema parsing and representation.
//!
//! This module parses SQL DDL statements (CREATE TABLE, CREATE INDEX) into a
//! structured representation that can be used for schema-aware query analysis.
//!
//! # Supported Statements
//!
//! - `CREATE TABLE` with columns, types, constraints
//! - `CREATE INDEX` with column lists and uniqueness
//! - Primary key constraints (inline and table-level)
//! - NOT NULL constraints
//!
//! # Example
//!
//! ```
//! use sql_diagnostic_engine::schema::Schema;
//!
//! let sql = r#"
//!     CREATE TABLE users (
//!         id INT PRIMARY KEY,
//!         email VARCHAR(255) NOT NULL
//!     );
//!     CREATE INDEX idx_email ON users(email);
//! "#;
//!
//! let schema = Schema::parse(sql).unwrap();
//!
//! let users = schema.tables.get("users").unwrap();
//! assert_eq!(users.columns.len(), 2);
//! assert_eq!(users.indexes.len(), 1);
//! ```

use std::collections::BTreeMap;

use sqlparser::{dialect::GenericDialect, parser::Parser};

use crate::error::{AppResult, schema_parse_error};

/// Complete information about a database table.
#[derive(Debug, Clone)]
pub struct TableInfo {
    /// Table name
    pub name:    String,
    /// Ordered list of columns
    pub columns: Vec<ColumnInfo>,
    /// Indexes defined on this table
    pub indexes: Vec<IndexInfo>
}

/// Column metadata extracted from CREATE TABLE.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column name
    pub name:        String,
    /// SQL data type (e.g., "INT", "VARCHAR(255)")
    pub data_type:   String,
    /// Whether NULL values are allowed
    pub is_nullable: bool,
    /// Whether this is a primary key column
    pub is_primary:  bool
}

/// Index metadata extracted from CREATE INDEX or table constraints.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    /// Index name (may be empty for anonymous indexes)
    pub name:      String,
    /// Ordered list of indexed columns
    pub columns:   Vec<String>,
    /// Whether this is a unique index
    pub is_unique: bool
}

/// Parsed database schema containing all tables and their metadata.
///
/// Tables are stored in a `BTreeMap` for deterministic iteration order.
#[derive(Debug, Default, Clone)]
pub struct Schema {
    /// Map of table name to table information
    pub tables: BTreeMap<String, TableInfo>
}

impl Schema {
    /// Parse SQL schema from string
    ///
    /// # Arguments
    ///
    /// * `sql` - SQL schema definition
    ///
    /// # Returns
    ///
    /// Parsed schema with tables and indexes
    ///
    /// # Errors
    ///
    /// Returns error if SQL parsing fails
    pub fn parse(sql: &str) -> AppResult<Self> {
        let dialect = GenericDialect {};
        let statements =
            Parser::parse_sql(&dialect, sql).map_err(|e| schema_parse_error(e.to_string()))?;

        let mut schema = Self::default();

        for stmt in statements {
            schema.process_statement(stmt)?;
        }

        Ok(schema)
    }

    fn process_statement(&mut self, stmt: sqlparser::ast::Statement) -> AppResult<()> {
        use sqlparser::ast::Statement;

        match stmt {
            Statement::CreateTable(create) => {
                let table_name = create.name.to_string();
                let mut columns = Vec::new();
                let mut indexes = Vec::new();

                for column in create.columns {
                    let is_primary = column.options.iter().any(|opt| {
                        matches!(
                            opt.option,
                            sqlparser::ast::ColumnOption::Unique {
                                is_primary: true,
                                ..
                            }
                        )
                    });

                    columns.push(ColumnInfo {
                        name: column.name.to_string(),
                        data_type: column.data_type.to_string(),
                        is_nullable: !column.options.iter().any(|opt| {
                            matches!(opt.option, sqlparser::ast::ColumnOption::NotNull)
                        }),
                        is_primary
                    });
                }

                for constraint in create.constraints {
                    if let sqlparser::ast::TableConstraint::Index {
                        name,
                        columns: idx_cols,
                        ..
                    } = constraint
                    {
                        indexes.push(IndexInfo {
                            name:      name.map(|n| n.to_string()).unwrap_or_default(),
                            columns:   idx_cols.iter().map(|c| c.to_string()).collect(),
                            is_unique: false
                        });
                    }
                }

                self.tables.insert(
                    table_name.clone(),
                    TableInfo {
                        name: table_name,
                        columns,
                        indexes
                    }
                );
            }
            Statement::CreateIndex(create_index) => {
                let table_name = create_index.table_name.to_string();
                if let Some(table) = self.tables.get_mut(&table_name) {
                    table.indexes.push(IndexInfo {
                        name:      create_index.name.map(|n| n.to_string()).unwrap_or_default(),
                        columns:   create_index.columns.iter().map(|c| c.to_string()).collect(),
                        is_unique: create_index.unique
                    });
                }
            }
            _ => {}
        }

        Ok(())
    }

}

/// Table/column existence and enumeration port.
///
/// Implementations for MySQL, PostgreSQL, and SQLite would query their
/// respective catalog tables; this crate ships the two that do not
/// require a live connection: [`StaticSchema`] (DDL text parsed up
/// front) and [`PermissiveSchema`] (a no-op for tests and SQLite's
/// relaxed mode).
pub trait SchemaIntrospector: Send + Sync {
    fn table_exists(&self, name: &str) -> bool;

    fn list_tables(&self) -> Vec<String>;

    fn column_exists(&self, table: &str, column: &str) -> bool;

    fn list_columns(&self, table: &str) -> Vec<String>;
}

/// A [`SchemaIntrospector`] backed by schema parsed once from DDL text.
#[derive(Debug, Clone)]
pub struct StaticSchema {
    schema: Schema
}

impl StaticSchema {
    pub fn parse(ddl: &str) -> AppResult<Self> {
        Ok(Self {
            schema: Schema::parse(ddl)?
        })
    }

    pub fn from_schema(schema: Schema) -> Self {
        Self { schema }
    }
}

impl SchemaIntrospector for StaticSchema {
    fn table_exists(&self, name: &str) -> bool {
        self.schema.tables.contains_key(name)
    }

    fn list_tables(&self) -> Vec<String> {
        self.schema.tables.keys().cloned().collect()
    }

    fn column_exists(&self, table: &str, column: &str) -> bool {
        self.schema
            .tables
            .get(table)
            .map(|t| t.columns.iter().any(|c| c.name == column))
            .unwrap_or(false)
    }

    fn list_columns(&self, table: &str) -> Vec<String> {
        self.schema
            .tables
            .get(table)
            .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }
}

/// A no-op introspector: every table and column resolves as present.
///
/// Used in "permissive" validation mode (tests, SQLite) where the
/// pipeline short-circuits the schema/column/join stages entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveSchema;

impl SchemaIntrospector for PermissiveSchema {
    fn table_exists(&self, _name: &str) -> bool {
        true
    }

    fn list_tables(&self) -> Vec<String> {
        Vec::new()
    }

    fn column_exists(&self, _table: &str, _column: &str) -> bool {
        true
    }

    fn list_columns(&self, _table: &str) -> Vec<String> {
        Vec::new()
    }
}
