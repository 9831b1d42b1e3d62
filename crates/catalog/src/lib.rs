//! In-memory registry mapping table and column names to live storage
//! handles.
//!
//! The catalog does not persist itself: it is rebuilt by replaying
//! `CREATE TABLE` / `CREATE INDEX` statements each process run, consistent
//! with the storage core's non-durability.

use btree::BTreeIndex;
use common::{DbError, DbResult};
use hashbrown::HashMap;
use heap::HeapFile;
use tracing::info;
use types::SqlType;

/// Describes a single column within a table's schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: SqlType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self { name: name.into(), ty }
    }
}

/// A registered table: its schema, storage handle, and indexed columns.
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<Column>,
    pub heap: HeapFile,
    /// Column name -> index metadata, for columns with a registered index.
    indexes: HashMap<String, IndexMeta>,
}

impl TableMeta {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<&SqlType> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.ty)
    }

    pub fn index(&self, column: &str) -> Option<&IndexMeta> {
        self.indexes.get(column)
    }

    pub fn index_mut(&mut self, column: &str) -> Option<&mut IndexMeta> {
        self.indexes.get_mut(column)
    }

    /// Every column that currently has a registered index.
    pub fn indexed_columns(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }
}

/// A registered index over a single table column.
pub struct IndexMeta {
    pub name: String,
    pub table: String,
    pub column: String,
    pub tree: BTreeIndex,
}

/// In-memory registry the planner and engine consult to resolve table and
/// column names to live [`HeapFile`]/[`BTreeIndex`] handles.
pub struct Catalog {
    tables: HashMap<String, TableMeta>,
    default_buffer_pool_pages: usize,
    default_btree_order: usize,
}

impl Catalog {
    pub fn new(default_buffer_pool_pages: usize, default_btree_order: usize) -> Self {
        Self {
            tables: HashMap::new(),
            default_buffer_pool_pages,
            default_btree_order,
        }
    }

    /// Register a table with its column schema and open a fresh heap file
    /// for it. Fails if the name is already registered.
    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> DbResult<()> {
        if self.tables.contains_key(name) {
            return Err(DbError::Catalog(format!("table '{name}' already exists")));
        }
        if columns.is_empty() {
            return Err(DbError::Catalog("table must have at least one column".into()));
        }
        let heap = HeapFile::new(self.default_buffer_pool_pages);
        self.tables.insert(
            name.to_string(),
            TableMeta {
                name: name.to_string(),
                columns,
                heap,
                indexes: HashMap::new(),
            },
        );
        info!(table = name, "created table");
        Ok(())
    }

    /// Open a fresh B+Tree index over an existing table/column. Fails if the
    /// table or column doesn't exist, or the column is already indexed.
    pub fn create_index(&mut self, table: &str, column: &str, order: Option<usize>) -> DbResult<()> {
        let order = order.unwrap_or(self.default_btree_order);
        let frames = self.default_buffer_pool_pages;
        let meta = self.table_mut(table)?;
        match meta.column_type(column) {
            None => {
                return Err(DbError::Catalog(format!(
                    "unknown column '{column}' on table '{table}'"
                )));
            }
            Some(ty) if *ty != SqlType::Int => {
                return Err(DbError::Catalog(format!(
                    "column '{column}' on table '{table}' is not INT; only INT columns can be indexed"
                )));
            }
            Some(_) => {}
        }
        if meta.indexes.contains_key(column) {
            return Err(DbError::Catalog(format!(
                "column '{column}' on table '{table}' is already indexed"
            )));
        }
        let tree = BTreeIndex::new(order, frames)?;
        meta.indexes.insert(
            column.to_string(),
            IndexMeta {
                name: format!("{table}_{column}_idx"),
                table: table.to_string(),
                column: column.to_string(),
                tree,
            },
        );
        info!(table, column, "created index");
        Ok(())
    }

    pub fn table(&self, name: &str) -> DbResult<&TableMeta> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))
    }

    pub fn table_mut(&mut self, name: &str) -> DbResult<&mut TableMeta> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))
    }

    pub fn index_for(&self, table: &str, column: &str) -> Option<&IndexMeta> {
        self.tables.get(table)?.index(column)
    }

    pub fn index_for_mut(&mut self, table: &str, column: &str) -> Option<&mut IndexMeta> {
        self.tables.get_mut(table)?.index_mut(column)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableMeta> {
        self.tables.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_columns() -> Vec<Column> {
        vec![
            Column::new("id", SqlType::Int),
            Column::new("name", SqlType::Text),
        ]
    }

    #[test]
    fn create_and_lookup_table() {
        let mut catalog = Catalog::new(16, 4);
        catalog.create_table("users", sample_columns()).unwrap();
        let table = catalog.table("users").unwrap();
        assert_eq!(table.column_index("name"), Some(1));
        assert_eq!(table.column_type("id"), Some(&SqlType::Int));
    }

    #[test]
    fn rejects_duplicate_tables() {
        let mut catalog = Catalog::new(16, 4);
        catalog.create_table("users", sample_columns()).unwrap();
        let err = catalog.create_table("users", sample_columns()).unwrap_err();
        assert!(matches!(err, DbError::Catalog(_)));
    }

    #[test]
    fn rejects_empty_schema() {
        let mut catalog = Catalog::new(16, 4);
        let err = catalog.create_table("empty", vec![]).unwrap_err();
        assert!(matches!(err, DbError::Catalog(_)));
    }

    #[test]
    fn create_index_requires_known_table_and_column() {
        let mut catalog = Catalog::new(16, 4);
        assert!(catalog.create_index("missing", "id", None).is_err());

        catalog.create_table("users", sample_columns()).unwrap();
        assert!(catalog.create_index("users", "bogus", None).is_err());

        catalog.create_index("users", "id", None).unwrap();
        assert!(catalog.index_for("users", "id").is_some());
    }

    #[test]
    fn rejects_double_index_on_same_column() {
        let mut catalog = Catalog::new(16, 4);
        catalog.create_table("users", sample_columns()).unwrap();
        catalog.create_index("users", "id", None).unwrap();
        let err = catalog.create_index("users", "id", None).unwrap_err();
        assert!(matches!(err, DbError::Catalog(_)));
    }

    #[test]
    fn rejects_index_on_non_int_column() {
        let mut catalog = Catalog::new(16, 4);
        catalog.create_table("users", sample_columns()).unwrap();
        let err = catalog.create_index("users", "name", None).unwrap_err();
        assert!(matches!(err, DbError::Catalog(_)));
    }

    #[test]
    fn indexed_columns_reports_registered_indexes() {
        let mut catalog = Catalog::new(16, 4);
        catalog.create_table("users", sample_columns()).unwrap();
        catalog.create_index("users", "id", None).unwrap();
        let table = catalog.table("users").unwrap();
        let cols: Vec<&str> = table.indexed_columns().collect();
        assert_eq!(cols, vec!["id"]);
    }
}
