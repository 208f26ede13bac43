//! Catalog introspection and the plain-text schema description handed to the
//! model.
//!
//! The description is written once by `read-schema` and loaded read-only by
//! the analyst. Nothing checks it against the live database afterwards.

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use crate::config::DatabaseSettings;
use crate::error::{Error, Result};
use crate::executor::connect;

pub const CATALOG_QUERY: &str = r#"
SELECT
    t.table_name::text,
    c.column_name::text,
    c.data_type::text
FROM information_schema.tables AS t
JOIN information_schema.columns AS c
    ON c.table_schema = t.table_schema
   AND c.table_name = t.table_name
WHERE t.table_schema = $1
  AND t.table_type = 'BASE TABLE'
ORDER BY t.table_name, c.ordinal_position
"#;

/// One `(table, column, type)` row of the catalog query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub table: String,
    pub column: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

/// Tables in catalog order, each with its columns in ordinal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaText {
    tables: Vec<Table>,
}

impl SchemaText {
    /// Group catalog rows by table, keeping first-seen table order and the
    /// row order within each table.
    pub fn from_rows(rows: impl IntoIterator<Item = CatalogRow>) -> Self {
        let mut tables: Vec<Table> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for row in rows {
            let index = *positions.entry(row.table.clone()).or_insert_with(|| {
                tables.push(Table {
                    name: row.table.clone(),
                    columns: Vec::new(),
                });
                tables.len() - 1
            });

            tables[index].columns.push(Column {
                name: row.column,
                data_type: row.data_type,
            });
        }

        Self { tables }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl fmt::Display for SchemaText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in &self.tables {
            writeln!(f, "Table: {}", table.name)?;

            for column in &table.columns {
                writeln!(f, "  - {} ({})", column.name, column.data_type)?;
            }
        }

        Ok(())
    }
}

/// Read the base tables of the configured schema.
pub fn introspect(database: &DatabaseSettings) -> Result<SchemaText> {
    let mut client = connect(database)?;

    info!(schema = %database.schema, "reading catalog");

    let rows = client
        .query(CATALOG_QUERY, &[&database.schema])
        .map_err(Error::catalog)?;

    let rows = rows
        .iter()
        .map(|row| {
            Ok(CatalogRow {
                table: row.try_get(0).map_err(|e| Error::Catalog(e.to_string()))?,
                column: row.try_get(1).map_err(|e| Error::Catalog(e.to_string()))?,
                data_type: row.try_get(2).map_err(|e| Error::Catalog(e.to_string()))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(rows = rows.len(), "catalog rows fetched");

    Ok(SchemaText::from_rows(rows))
}

/// Overwrite the schema file.
pub fn write_artifact(path: &Path, schema: &SchemaText) -> Result<()> {
    std::fs::write(path, schema.to_string())?;

    info!(path = %path.display(), tables = schema.tables().len(), "schema written");

    Ok(())
}

pub fn load_artifact(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(Error::SchemaMissing(path.to_path_buf())),
        Err(err) => Err(err.into()),
    }
}
