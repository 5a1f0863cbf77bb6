//! Partition keys
//!
//! A partition key accumulates the values of a table's partition key
//! columns, in key order, and hashes them to a partition number. Only the
//! types usable as key columns can contribute a part.

use clusterbind_core::Value;
use xxhash_rust::xxh3::Xxh3;

use crate::dictionary::TableMeta;
use crate::error::{StoreError, StoreResult};

/// Distribution key for routing a transaction to a partition
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionKey {
    table: String,
    columns: Vec<String>,
    parts: Vec<Value>,
}

impl PartitionKey {
    /// Empty key for a table
    pub fn new(table: &TableMeta) -> Self {
        Self {
            table: table.name.clone(),
            columns: table.partition_key.clone(),
            parts: Vec::with_capacity(table.partition_key.len()),
        }
    }

    /// Table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Parts added so far
    pub fn parts(&self) -> &[Value] {
        &self.parts
    }

    /// Whether every partition key column has a part
    pub fn is_complete(&self) -> bool {
        self.parts.len() == self.columns.len()
    }

    /// Add an `i32` part
    pub fn add_int_key(&mut self, value: i32) -> StoreResult<()> {
        self.add_part(Value::Int(value))
    }

    /// Add an `i64` part
    pub fn add_long_key(&mut self, value: i64) -> StoreResult<()> {
        self.add_part(Value::Long(value))
    }

    /// Add a string part
    pub fn add_string_key(&mut self, value: &str) -> StoreResult<()> {
        self.add_part(Value::String(value.to_string()))
    }

    /// Add a bytes part
    pub fn add_bytes_key(&mut self, value: &[u8]) -> StoreResult<()> {
        self.add_part(Value::Bytes(value.to_vec()))
    }

    fn add_part(&mut self, value: Value) -> StoreResult<()> {
        if self.is_complete() {
            return Err(StoreError::InvalidOperation(format!(
                "partition key for {} already has {} part(s)",
                self.table,
                self.parts.len()
            )));
        }
        self.parts.push(value);
        Ok(())
    }

    /// Partition number in `0..partition_count`
    pub fn partition_id(&self, partition_count: u32) -> StoreResult<u32> {
        if !self.is_complete() {
            return Err(StoreError::IncompleteKey {
                target: self.table.clone(),
                missing: self.columns[self.parts.len()].clone(),
            });
        }
        let mut hasher = Xxh3::new();
        for part in &self.parts {
            match part {
                Value::Int(v) => hasher.update(&v.to_le_bytes()),
                Value::Long(v) => hasher.update(&v.to_le_bytes()),
                Value::String(s) => hasher.update(s.as_bytes()),
                Value::Bytes(b) => hasher.update(b),
                _ => {}
            }
            hasher.update(&[0xff]);
        }
        Ok((hasher.digest() % u64::from(partition_count.max(1))) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::TableBuilder;
    use clusterbind_core::{ColumnDescriptor, ColumnType};

    fn table() -> TableMeta {
        TableBuilder::new("orders")
            .column(ColumnDescriptor::new("customer", ColumnType::Int))
            .column(ColumnDescriptor::new("order_no", ColumnType::Bigint))
            .primary_key(&["customer", "order_no"])
            .partition_key(&["customer"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_incomplete_key() {
        let key = PartitionKey::new(&table());
        assert!(matches!(key.partition_id(4), Err(StoreError::IncompleteKey { .. })));
    }

    #[test]
    fn test_too_many_parts() {
        let mut key = PartitionKey::new(&table());
        key.add_int_key(1).unwrap();
        assert!(key.add_long_key(2).is_err());
    }

    #[test]
    fn test_deterministic_and_in_range() {
        let t = table();
        for customer in 0..100 {
            let mut a = PartitionKey::new(&t);
            a.add_int_key(customer).unwrap();
            let mut b = PartitionKey::new(&t);
            b.add_int_key(customer).unwrap();
            let id = a.partition_id(8).unwrap();
            assert!(id < 8);
            assert_eq!(id, b.partition_id(8).unwrap());
        }
    }
}
