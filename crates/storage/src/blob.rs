//! Blob handles for large-object columns
//!
//! A handle obtained from an operation before execute is *inactive*: it can
//! be held, but reading or writing it fails. When the owning transaction
//! executes the operation it activates the handle with the column's current
//! content. Writes to an active handle are staged and flushed into the row
//! by the transaction on its next execute.
//!
//! Text columns are exposed as UTF-8 bytes.

use clusterbind_core::{ColumnDescriptor, StorageClass, Value};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};

#[derive(Debug)]
struct BlobState {
    active: bool,
    data: Option<Vec<u8>>,
    pending: Option<Option<Vec<u8>>>,
}

/// Shared handle to one LOB column of one row
#[derive(Debug, Clone)]
pub struct BlobHandle {
    column: Arc<ColumnDescriptor>,
    state: Arc<Mutex<BlobState>>,
}

impl BlobHandle {
    /// Inactive handle, as returned before execute
    pub fn new(column: &ColumnDescriptor) -> Self {
        Self {
            column: Arc::new(column.clone()),
            state: Arc::new(Mutex::new(BlobState {
                active: false,
                data: None,
                pending: None,
            })),
        }
    }

    /// Active handle over existing content, as returned from a fetched row
    pub fn with_value(column: &ColumnDescriptor, value: &Value) -> Self {
        let handle = Self::new(column);
        handle.activate(value);
        handle
    }

    /// Column this handle addresses
    pub fn column(&self) -> &ColumnDescriptor {
        &self.column
    }

    /// Make the handle usable, loading the column's current content
    pub fn activate(&self, value: &Value) {
        let mut state = self.state.lock();
        state.active = true;
        state.data = value_bytes(value);
    }

    /// Whether the handle may be read or written
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Stage new content for the column
    pub fn write_data(&self, data: &[u8]) -> StoreResult<()> {
        let mut state = self.require_active()?;
        state.data = Some(data.to_vec());
        state.pending = Some(Some(data.to_vec()));
        Ok(())
    }

    /// Stage a UTF-8 string as new content
    pub fn write_string(&self, data: &str) -> StoreResult<()> {
        self.write_data(data.as_bytes())
    }

    /// Stage NULL as new content
    pub fn set_null(&self) -> StoreResult<()> {
        if !self.column.nullable {
            return Err(StoreError::NullNotAllowed {
                column: self.column.name.clone(),
            });
        }
        let mut state = self.require_active()?;
        state.data = None;
        state.pending = Some(None);
        Ok(())
    }

    /// Whether the content is NULL
    pub fn is_null(&self) -> StoreResult<bool> {
        Ok(self.require_active()?.data.is_none())
    }

    /// Content length in bytes (zero for NULL)
    pub fn length(&self) -> StoreResult<u64> {
        Ok(self
            .require_active()?
            .data
            .as_ref()
            .map_or(0, |d| d.len() as u64))
    }

    /// Current content
    pub fn read_data(&self) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.require_active()?.data.clone())
    }

    /// Current content decoded as UTF-8
    pub fn read_string(&self) -> StoreResult<Option<String>> {
        match self.read_data()? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| {
                StoreError::InvalidOperation(format!(
                    "column {} holds invalid UTF-8: {}",
                    self.column.name, e
                ))
            }),
        }
    }

    /// Take the staged write, if any, as a column value
    ///
    /// Called by the transaction when it flushes blob writes into rows.
    pub fn take_pending(&self) -> StoreResult<Option<Value>> {
        let pending = self.state.lock().pending.take();
        pending
            .map(|data| bytes_value(&self.column, data))
            .transpose()
    }

    fn require_active(&self) -> StoreResult<parking_lot::MutexGuard<'_, BlobState>> {
        let state = self.state.lock();
        if state.active {
            Ok(state)
        } else {
            Err(StoreError::BlobNotActive {
                column: self.column.name.clone(),
            })
        }
    }
}

fn value_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Bytes(b) => Some(b.clone()),
        Value::String(s) => Some(s.as_bytes().to_vec()),
        _ => None,
    }
}

fn bytes_value(column: &ColumnDescriptor, data: Option<Vec<u8>>) -> StoreResult<Value> {
    match data {
        None => Ok(Value::Null),
        Some(bytes) if column.storage_class() == StorageClass::String => String::from_utf8(bytes)
            .map(Value::String)
            .map_err(|e| {
                StoreError::InvalidOperation(format!(
                    "column {} holds invalid UTF-8: {}",
                    column.name, e
                ))
            }),
        Some(bytes) => Ok(Value::Bytes(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterbind_core::ColumnType;

    #[test]
    fn test_inactive_handle_rejects_access() {
        let h = BlobHandle::new(&ColumnDescriptor::new("photo", ColumnType::Blob));
        assert!(!h.is_active());
        assert!(matches!(h.write_data(b"x"), Err(StoreError::BlobNotActive { .. })));
        assert!(h.length().is_err());
    }

    #[test]
    fn test_write_is_staged_until_taken() {
        let h = BlobHandle::new(&ColumnDescriptor::new("photo", ColumnType::Blob));
        h.activate(&Value::Bytes(Vec::new()));
        assert_eq!(h.length().unwrap(), 0);
        h.write_data(&[1, 2, 3]).unwrap();
        assert_eq!(h.length().unwrap(), 3);
        assert_eq!(h.take_pending().unwrap(), Some(Value::Bytes(vec![1, 2, 3])));
        assert_eq!(h.take_pending().unwrap(), None);
    }

    #[test]
    fn test_text_round_trip() {
        let h = BlobHandle::with_value(
            &ColumnDescriptor::new("notes", ColumnType::Text),
            &Value::from("héllo"),
        );
        assert_eq!(h.read_string().unwrap(), Some("héllo".to_string()));
        h.write_string("bye").unwrap();
        assert_eq!(h.take_pending().unwrap(), Some(Value::from("bye")));
    }

    #[test]
    fn test_null_content() {
        let h = BlobHandle::with_value(&ColumnDescriptor::new("photo", ColumnType::Blob), &Value::Null);
        assert!(h.is_null().unwrap());
        assert_eq!(h.length().unwrap(), 0);
        h.write_data(b"a").unwrap();
        h.set_null().unwrap();
        assert_eq!(h.take_pending().unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_clones_share_state() {
        let h = BlobHandle::new(&ColumnDescriptor::new("photo", ColumnType::Blob));
        let other = h.clone();
        h.activate(&Value::Null);
        assert!(other.is_active());
    }
}
