//! Dictionary: table and index metadata
//!
//! Tables are created through `TableBuilder`, which assigns column ordinals,
//! marks key columns, and derives the implicit indexes:
//! - every table gets an ordered index named `PRIMARY` over its primary key
//! - a unique index `u` is stored as a hash index named `u$unique` plus an
//!   ordered index named `u`
//! - a non-unique index is an ordered index
//!
//! Lookups take the user-visible name; the `$unique` suffix is internal and
//! is stripped by `IndexMeta::alias`.

use clusterbind_core::{ColumnDescriptor, StorageClass};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};

/// Name of the primary key index
pub const PRIMARY_INDEX: &str = "PRIMARY";

const UNIQUE_SUFFIX: &str = "$unique";

/// Physical kind of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Hash index: equality lookups only
    Hash,
    /// Ordered index: equality and range scans
    Ordered,
}

/// Metadata for one index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMeta {
    /// Internal name (unique hash indexes carry the `$unique` suffix)
    pub name: String,
    /// Owning table
    pub table: String,
    /// Hash or ordered
    pub kind: IndexKind,
    /// Whether index keys are unique
    pub unique: bool,
    /// Indexed columns, in index order
    pub columns: Vec<String>,
}

impl IndexMeta {
    /// User-visible index name
    pub fn alias(&self) -> &str {
        self.name.strip_suffix(UNIQUE_SUFFIX).unwrap_or(&self.name)
    }

    /// Whether this is a hash index
    pub fn is_hash(&self) -> bool {
        self.kind == IndexKind::Hash
    }

    /// Whether this is the ordered index over the primary key
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_INDEX
    }
}

/// Metadata for one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableMeta {
    /// Table name
    pub name: String,
    /// Columns in ordinal order
    pub columns: Vec<ColumnDescriptor>,
    /// Primary key column names, in key order
    pub primary_key: Vec<String>,
    /// Partition key column names (a subset of the primary key)
    pub partition_key: Vec<String>,
    /// Secondary and implicit indexes (not including the primary hash key)
    pub indexes: Vec<IndexMeta>,
}

impl TableMeta {
    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column by name, failing if absent
    pub fn require_column(&self, name: &str) -> StoreResult<&ColumnDescriptor> {
        self.column(name).ok_or_else(|| StoreError::NoSuchColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Primary key columns, in key order
    pub fn primary_key_columns(&self) -> Vec<&ColumnDescriptor> {
        self.primary_key
            .iter()
            .filter_map(|name| self.column(name))
            .collect()
    }

    /// Look up an index by internal name or alias
    ///
    /// Hash indexes win over the ordered index of the same alias when
    /// `prefer_hash` is set.
    pub fn index(&self, name: &str, prefer_hash: bool) -> Option<&IndexMeta> {
        let unique_name = format!("{}{}", name, UNIQUE_SUFFIX);
        let hash = self.indexes.iter().find(|i| i.name == unique_name || (i.name == name && i.is_hash()));
        let ordered = self.indexes.iter().find(|i| i.name == name && !i.is_hash());
        if prefer_hash {
            hash.or(ordered)
        } else {
            ordered.or(hash)
        }
    }

    /// Extract the primary key of a full row
    pub fn key_of(&self, row: &[clusterbind_core::Value]) -> Vec<clusterbind_core::Value> {
        self.primary_key_columns()
            .iter()
            .map(|c| row[c.ordinal].clone())
            .collect()
    }
}

/// Builder for a table definition
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: Vec<String>,
    partition_key: Option<Vec<String>>,
    indexes: Vec<(String, bool, Vec<String>)>,
}

impl TableBuilder {
    /// Start a table definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            partition_key: None,
            indexes: Vec::new(),
        }
    }

    /// Add a column
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the primary key columns
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Set the partition key columns (defaults to the primary key)
    pub fn partition_key(mut self, columns: &[&str]) -> Self {
        self.partition_key = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Add a unique index (hash + ordered)
    pub fn unique_index(mut self, name: impl Into<String>, columns: &[&str]) -> Self {
        self.indexes
            .push((name.into(), true, columns.iter().map(|c| c.to_string()).collect()));
        self
    }

    /// Add a non-unique ordered index
    pub fn ordered_index(mut self, name: impl Into<String>, columns: &[&str]) -> Self {
        self.indexes
            .push((name.into(), false, columns.iter().map(|c| c.to_string()).collect()));
        self
    }

    /// Validate and produce the table metadata
    pub fn build(self) -> StoreResult<TableMeta> {
        let invalid = |reason: String| StoreError::InvalidTable {
            table: self.name.clone(),
            reason,
        };

        if self.columns.is_empty() {
            return Err(invalid("table has no columns".to_string()));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(invalid(format!("duplicate column {}", column.name)));
            }
            if column.storage_class() == StorageClass::Unsupported {
                return Err(invalid(format!("column {} has an undefined type", column.name)));
            }
        }
        if self.primary_key.is_empty() {
            return Err(invalid("table has no primary key".to_string()));
        }
        let partition_key = self.partition_key.clone().unwrap_or_else(|| self.primary_key.clone());
        for name in &partition_key {
            if !self.primary_key.contains(name) {
                return Err(invalid(format!(
                    "partition key column {} is not part of the primary key",
                    name
                )));
            }
        }

        let mut columns = self.columns.clone();
        for (ordinal, column) in columns.iter_mut().enumerate() {
            column.ordinal = ordinal;
            column.primary_key = self.primary_key.contains(&column.name);
            column.partition_key = partition_key.contains(&column.name);
            if column.primary_key {
                column.nullable = false;
            }
        }

        let known = |name: &String| columns.iter().any(|c| &c.name == name);
        if let Some(missing) = self.primary_key.iter().find(|c| !known(c)) {
            return Err(invalid(format!("primary key column {} does not exist", missing)));
        }

        let mut indexes = vec![IndexMeta {
            name: PRIMARY_INDEX.to_string(),
            table: self.name.clone(),
            kind: IndexKind::Ordered,
            unique: true,
            columns: self.primary_key.clone(),
        }];
        for (name, unique, index_columns) in &self.indexes {
            if let Some(missing) = index_columns.iter().find(|c| !known(c)) {
                return Err(invalid(format!("index {} names unknown column {}", name, missing)));
            }
            if *unique {
                indexes.push(IndexMeta {
                    name: format!("{}{}", name, UNIQUE_SUFFIX),
                    table: self.name.clone(),
                    kind: IndexKind::Hash,
                    unique: true,
                    columns: index_columns.clone(),
                });
            }
            indexes.push(IndexMeta {
                name: name.clone(),
                table: self.name.clone(),
                kind: IndexKind::Ordered,
                unique: *unique,
                columns: index_columns.clone(),
            });
        }

        Ok(TableMeta {
            name: self.name,
            columns,
            primary_key: self.primary_key,
            partition_key,
            indexes,
        })
    }
}

/// Engine dictionary: the set of defined tables
///
/// The schema version is bumped on every create/drop so that caches built
/// from dictionary metadata can detect staleness.
#[derive(Debug, Default)]
pub struct Dictionary {
    tables: DashMap<String, Arc<TableMeta>>,
    schema_version: AtomicU64,
}

impl Dictionary {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table definition
    pub fn create_table(&self, table: TableMeta) -> StoreResult<Arc<TableMeta>> {
        if self.tables.contains_key(&table.name) {
            return Err(StoreError::InvalidTable {
                table: table.name.clone(),
                reason: "table already exists".to_string(),
            });
        }
        let table = Arc::new(table);
        self.tables.insert(table.name.clone(), Arc::clone(&table));
        self.schema_version.fetch_add(1, Ordering::SeqCst);
        Ok(table)
    }

    /// Remove a table definition
    pub fn drop_table(&self, name: &str) -> StoreResult<()> {
        self.tables
            .remove(name)
            .map(|_| {
                self.schema_version.fetch_add(1, Ordering::SeqCst);
            })
            .ok_or_else(|| StoreError::NoSuchTable(name.to_string()))
    }

    /// Look up a table
    pub fn get_table(&self, name: &str) -> StoreResult<Arc<TableMeta>> {
        self.tables
            .get(name)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| StoreError::NoSuchTable(name.to_string()))
    }

    /// Look up an index of a table by its user-visible name
    ///
    /// Returns the unique hash index when one exists for the alias,
    /// otherwise the ordered index.
    pub fn get_index(&self, index_name: &str, table_name: &str) -> StoreResult<IndexMeta> {
        let table = self.get_table(table_name)?;
        table
            .index(index_name, true)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchIndex {
                table: table_name.to_string(),
                index: index_name.to_string(),
            })
    }

    /// Names of all tables
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Current schema version
    pub fn schema_version(&self) -> u64 {
        self.schema_version.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterbind_core::ColumnType;

    fn employee() -> TableMeta {
        TableBuilder::new("employee")
            .column(ColumnDescriptor::new("id", ColumnType::Int))
            .column(ColumnDescriptor::new("name", ColumnType::Varchar).with_length(64))
            .column(ColumnDescriptor::new("email", ColumnType::Varchar).with_length(64))
            .column(ColumnDescriptor::new("salary", ColumnType::Decimal).with_precision(10, 2))
            .primary_key(&["id"])
            .unique_index("idx_email", &["email"])
            .ordered_index("idx_name", &["name"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_ordinals_and_key_flags() {
        let t = employee();
        assert_eq!(t.column("salary").unwrap().ordinal, 3);
        let id = t.column("id").unwrap();
        assert!(id.primary_key);
        assert!(id.partition_key);
        assert!(!id.nullable);
        assert!(!t.column("name").unwrap().primary_key);
    }

    #[test]
    fn test_unique_index_alias() {
        let t = employee();
        let hash = t.index("idx_email", true).unwrap();
        assert_eq!(hash.name, "idx_email$unique");
        assert_eq!(hash.alias(), "idx_email");
        assert!(hash.is_hash());
        let ordered = t.index("idx_email", false).unwrap();
        assert_eq!(ordered.kind, IndexKind::Ordered);
    }

    #[test]
    fn test_primary_ordered_index_exists() {
        let t = employee();
        let primary = t.index(PRIMARY_INDEX, false).unwrap();
        assert!(primary.is_primary());
        assert_eq!(primary.columns, vec!["id".to_string()]);
    }

    #[test]
    fn test_missing_primary_key_rejected() {
        let result = TableBuilder::new("t")
            .column(ColumnDescriptor::new("a", ColumnType::Int))
            .build();
        assert!(matches!(result, Err(StoreError::InvalidTable { .. })));
    }

    #[test]
    fn test_partition_key_must_be_in_primary_key() {
        let result = TableBuilder::new("t")
            .column(ColumnDescriptor::new("a", ColumnType::Int))
            .column(ColumnDescriptor::new("b", ColumnType::Int))
            .primary_key(&["a"])
            .partition_key(&["b"])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_dictionary_lookup() {
        let dict = Dictionary::new();
        dict.create_table(employee()).unwrap();
        assert_eq!(dict.schema_version(), 1);
        assert!(dict.get_table("employee").is_ok());
        assert!(matches!(dict.get_table("nope"), Err(StoreError::NoSuchTable(_))));
        assert_eq!(dict.get_index("idx_email", "employee").unwrap().alias(), "idx_email");
        assert!(dict.get_index("idx_zzz", "employee").is_err());
        dict.drop_table("employee").unwrap();
        assert_eq!(dict.schema_version(), 2);
    }
}
