//! Scan filters
//!
//! `ScanFilterBuilder` implements the `ScanFilter` builder protocol and
//! produces a `FilterNode` tree that scans evaluate against each row.
//!
//! Comparisons follow SQL semantics: any comparison with a NULL column is
//! false, including `Ne`. Byte columns holding unsigned data compare as
//! `u8` (see [`column_cmp`]). `Like` supports `%` (any run) and `_` (any one
//! character) on character columns.

use clusterbind_core::{ColumnDescriptor, ColumnType, StorageClass, Value};
use std::cmp::Ordering;

use crate::error::{StoreError, StoreResult};
use crate::operation::{check_column_value, BinaryCondition, FilterGroup, ScanFilter};

/// Evaluable filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// Grouped members
    Group {
        /// Grouping operator
        group: FilterGroup,
        /// Member nodes
        members: Vec<FilterNode>,
    },
    /// Column comparison
    Cmp {
        /// Comparison
        condition: BinaryCondition,
        /// Column ordinal in the row
        ordinal: usize,
        /// Column type, for ordering
        column_type: ColumnType,
        /// Comparison operand
        value: Value,
    },
    /// Column IS NULL
    IsNull {
        /// Column ordinal in the row
        ordinal: usize,
    },
    /// Column IS NOT NULL
    IsNotNull {
        /// Column ordinal in the row
        ordinal: usize,
    },
}

impl FilterNode {
    /// Evaluate against a full row
    pub fn evaluate(&self, row: &[Value]) -> bool {
        match self {
            FilterNode::Group { group, members } => {
                let mut results = members.iter().map(|m| m.evaluate(row));
                match group {
                    FilterGroup::And => results.all(|r| r),
                    FilterGroup::Or => results.any(|r| r),
                    FilterGroup::Nand => !results.all(|r| r),
                    FilterGroup::Nor => !results.any(|r| r),
                }
            }
            FilterNode::Cmp {
                condition,
                ordinal,
                column_type,
                value,
            } => match row.get(*ordinal) {
                None | Some(Value::Null) => false,
                Some(column_value) => compare(*condition, *column_type, column_value, value),
            },
            FilterNode::IsNull { ordinal } => row.get(*ordinal).map_or(true, Value::is_null),
            FilterNode::IsNotNull { ordinal } => row.get(*ordinal).map_or(false, |v| !v.is_null()),
        }
    }
}

/// Order two values of one column
///
/// Same as `Value`'s order, except that byte columns of unsigned data
/// ([`ColumnType::orders_unsigned`]) compare their bytes as `u8`.
pub fn column_cmp(column_type: ColumnType, a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Byte(x), Value::Byte(y)) if column_type.orders_unsigned() => {
            (*x as u8).cmp(&(*y as u8))
        }
        _ => a.cmp(b),
    }
}

fn compare(condition: BinaryCondition, column_type: ColumnType, column_value: &Value, operand: &Value) -> bool {
    let ordering = column_cmp(column_type, column_value, operand);
    match condition {
        BinaryCondition::Eq => ordering == Ordering::Equal,
        BinaryCondition::Ne => ordering != Ordering::Equal,
        BinaryCondition::Lt => ordering == Ordering::Less,
        BinaryCondition::Le => ordering != Ordering::Greater,
        BinaryCondition::Gt => ordering == Ordering::Greater,
        BinaryCondition::Ge => ordering != Ordering::Less,
        BinaryCondition::Like | BinaryCondition::NotLike => {
            let matched = match (column_value, operand) {
                (Value::String(s), Value::String(p)) => like(s, p),
                _ => false,
            };
            matched == (condition == BinaryCondition::Like)
        }
    }
}

/// SQL LIKE match with `%` and `_` wildcards
pub fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    // matches[j]: pattern[..i] matches text[..j]
    let mut matches = vec![false; text.len() + 1];
    matches[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= matches[j];
                    next[j] = seen;
                }
            }
            _ => {
                for j in 1..=text.len() {
                    next[j] = matches[j - 1] && (*p == '_' || *p == text[j - 1]);
                }
            }
        }
        matches = next;
    }
    matches[text.len()]
}

/// Builder implementing the `ScanFilter` protocol
#[derive(Debug, Default)]
pub struct ScanFilterBuilder {
    stack: Vec<(FilterGroup, Vec<FilterNode>)>,
    root: Option<FilterNode>,
}

impl ScanFilterBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been defined
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty() && self.root.is_none()
    }

    /// The finished filter tree, if any
    pub fn finish(&self) -> StoreResult<Option<FilterNode>> {
        if !self.stack.is_empty() {
            return Err(StoreError::InvalidFilter(format!(
                "{} unclosed group(s)",
                self.stack.len()
            )));
        }
        Ok(self.root.clone())
    }

    fn push(&mut self, node: FilterNode) -> StoreResult<()> {
        match self.stack.last_mut() {
            Some((_, members)) => {
                members.push(node);
                Ok(())
            }
            None => Err(StoreError::InvalidFilter(
                "predicate outside of a begin/end group".to_string(),
            )),
        }
    }
}

impl ScanFilter for ScanFilterBuilder {
    fn begin(&mut self, group: FilterGroup) -> StoreResult<()> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(StoreError::InvalidFilter("filter already defined".to_string()));
        }
        self.stack.push((group, Vec::new()));
        Ok(())
    }

    fn end(&mut self) -> StoreResult<()> {
        let (group, members) = self
            .stack
            .pop()
            .ok_or_else(|| StoreError::InvalidFilter("end without begin".to_string()))?;
        let node = FilterNode::Group { group, members };
        if self.stack.is_empty() {
            self.root = Some(node);
            Ok(())
        } else {
            self.push(node)
        }
    }

    fn cmp(&mut self, condition: BinaryCondition, column: &ColumnDescriptor, value: Value) -> StoreResult<()> {
        if value.is_null() {
            return Err(StoreError::InvalidFilter(format!(
                "cannot compare column {} with NULL",
                column.name
            )));
        }
        if matches!(condition, BinaryCondition::Like | BinaryCondition::NotLike)
            && column.storage_class() != StorageClass::String
        {
            return Err(StoreError::InvalidFilter(format!(
                "LIKE on non-character column {}",
                column.name
            )));
        }
        check_column_value(column, &value)?;
        self.push(FilterNode::Cmp {
            condition,
            ordinal: column.ordinal,
            column_type: column.column_type,
            value,
        })
    }

    fn is_null(&mut self, column: &ColumnDescriptor) -> StoreResult<()> {
        self.push(FilterNode::IsNull {
            ordinal: column.ordinal,
        })
    }

    fn is_not_null(&mut self, column: &ColumnDescriptor) -> StoreResult<()> {
        self.push(FilterNode::IsNotNull {
            ordinal: column.ordinal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, column_type: ColumnType, ordinal: usize) -> ColumnDescriptor {
        let mut c = ColumnDescriptor::new(name, column_type);
        c.ordinal = ordinal;
        c
    }

    #[test]
    fn test_like() {
        assert!(like("Ann", "A%"));
        assert!(like("Ann", "_nn"));
        assert!(like("Ann", "%"));
        assert!(like("", "%"));
        assert!(!like("Ann", "B%"));
        assert!(!like("Ann", "A_"));
        assert!(like("a%b", "a%b"));
    }

    #[test]
    fn test_and_group() {
        let id = col("id", ColumnType::Int, 0);
        let name = col("name", ColumnType::Varchar, 1);
        let mut f = ScanFilterBuilder::new();
        f.begin(FilterGroup::And).unwrap();
        f.cmp_int(BinaryCondition::Gt, &id, 1).unwrap();
        f.cmp_string(BinaryCondition::Like, &name, "A%".into()).unwrap();
        f.end().unwrap();
        let node = f.finish().unwrap().unwrap();
        assert!(node.evaluate(&[Value::Int(2), Value::from("Ann")]));
        assert!(!node.evaluate(&[Value::Int(1), Value::from("Ann")]));
        assert!(!node.evaluate(&[Value::Int(2), Value::from("Bob")]));
    }

    #[test]
    fn test_nested_groups_and_null() {
        let id = col("id", ColumnType::Int, 0);
        let salary = col("salary", ColumnType::Int, 1);
        let mut f = ScanFilterBuilder::new();
        f.begin(FilterGroup::Or).unwrap();
        f.is_null(&salary).unwrap();
        f.begin(FilterGroup::Nor).unwrap();
        f.cmp_int(BinaryCondition::Eq, &id, 5).unwrap();
        f.end().unwrap();
        f.end().unwrap();
        let node = f.finish().unwrap().unwrap();
        assert!(node.evaluate(&[Value::Int(5), Value::Null]));
        assert!(node.evaluate(&[Value::Int(4), Value::Int(10)]));
        assert!(!node.evaluate(&[Value::Int(5), Value::Int(10)]));
    }

    #[test]
    fn test_comparison_with_null_column_is_false() {
        let salary = col("salary", ColumnType::Int, 0);
        let mut f = ScanFilterBuilder::new();
        f.begin(FilterGroup::And).unwrap();
        f.cmp_int(BinaryCondition::Ne, &salary, 3).unwrap();
        f.end().unwrap();
        assert!(!f.finish().unwrap().unwrap().evaluate(&[Value::Null]));
    }

    #[test]
    fn test_year_bytes_compare_unsigned() {
        // 2030 is stored as 130u8, i.e. -126i8
        let born = col("born", ColumnType::Year, 0);
        let mut f = ScanFilterBuilder::new();
        f.begin(FilterGroup::And).unwrap();
        f.cmp_byte(BinaryCondition::Gt, &born, 120).unwrap();
        f.end().unwrap();
        let node = f.finish().unwrap().unwrap();
        assert!(node.evaluate(&[Value::Byte(130u8 as i8)]));
        assert!(node.evaluate(&[Value::Byte(127)]));
        assert!(!node.evaluate(&[Value::Byte(110)]));

        let level = col("level", ColumnType::Tinyint, 0);
        let mut f = ScanFilterBuilder::new();
        f.begin(FilterGroup::And).unwrap();
        f.cmp_byte(BinaryCondition::Gt, &level, 120).unwrap();
        f.end().unwrap();
        assert!(!f.finish().unwrap().unwrap().evaluate(&[Value::Byte(-126)]));
    }

    #[test]
    fn test_column_cmp() {
        assert_eq!(column_cmp(ColumnType::Year, &Value::Byte(-1), &Value::Byte(1)), Ordering::Greater);
        assert_eq!(column_cmp(ColumnType::Tinyint, &Value::Byte(-1), &Value::Byte(1)), Ordering::Less);
        assert_eq!(column_cmp(ColumnType::Int, &Value::Int(3), &Value::Int(3)), Ordering::Equal);
    }

    #[test]
    fn test_protocol_errors() {
        let id = col("id", ColumnType::Int, 0);
        let mut f = ScanFilterBuilder::new();
        assert!(f.cmp_int(BinaryCondition::Eq, &id, 1).is_err());
        assert!(f.end().is_err());
        f.begin(FilterGroup::And).unwrap();
        assert!(f.finish().is_err());
        assert!(f.cmp_long(BinaryCondition::Eq, &id, 1).is_err());
        assert!(f.cmp_int(BinaryCondition::Like, &id, 1).is_err());
    }
}
