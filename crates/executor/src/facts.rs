//! Statement facts handed over by the SQL parser.
//!
//! The parser itself is a black box. What reaches the bridge is a small,
//! self-contained description of the statement:
//! - **Kind**: insert, select, delete, or anything else
//! - **Table** and **column list**, as written in the statement
//! - **Values** of an insert, positional parameters or literals
//! - **WHERE tree** over column names, with positional parameters
//!
//! Facts are plain data and serialize to JSON, so a parser in another
//! process can hand them over as text.
//!
//! # Example
//!
//! ```text
//! SELECT id, name FROM employee WHERE id = ?
//! ```
//!
//! ```json
//! {
//!   "kind": "select",
//!   "table": "employee",
//!   "columns": ["id", "name"],
//!   "where_clause": { "compare": { "column": "id", "op": "eq", "operand": { "parameter": 0 } } }
//! }
//! ```

use clusterbind_core::{Error, Result, Value};
use clusterbind_metadata::{Comparison, DomainTypeHandler, FieldHandler, Operand, Parameters, Predicate};
use serde::{Deserialize, Serialize};

/// Statement kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// `INSERT INTO t (..) VALUES (..)`
    Insert,
    /// `SELECT .. FROM t [WHERE ..]`
    Select,
    /// `DELETE FROM t [WHERE ..]`
    Delete,
    /// Anything the bridge does not route
    Other,
}

/// Comparison operator of a WHERE condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
}

impl From<CompareOp> for Comparison {
    fn from(op: CompareOp) -> Self {
        match op {
            CompareOp::Eq => Comparison::Eq,
            CompareOp::Ne => Comparison::Ne,
            CompareOp::Lt => Comparison::Lt,
            CompareOp::Le => Comparison::Le,
            CompareOp::Gt => Comparison::Gt,
            CompareOp::Ge => Comparison::Ge,
            CompareOp::Like => Comparison::Like,
            CompareOp::NotLike => Comparison::NotLike,
        }
    }
}

/// Right-hand side of a condition, or one insert value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlOperand {
    /// `?` at a 0-based position
    Parameter(usize),
    /// Literal written in the statement
    Literal(Value),
}

/// WHERE tree over column names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlPredicate {
    /// `column op operand`
    Compare {
        /// Column name
        column: String,
        /// Operator
        op: CompareOp,
        /// Right-hand side
        operand: SqlOperand,
    },
    /// `column BETWEEN lower AND upper`
    Between {
        /// Column name
        column: String,
        /// Lower bound, inclusive
        lower: SqlOperand,
        /// Upper bound, inclusive
        upper: SqlOperand,
    },
    /// `column IN (..)`
    In {
        /// Column name
        column: String,
        /// Members of the list
        operands: Vec<SqlOperand>,
    },
    /// `column IS NULL`
    IsNull(String),
    /// `column IS NOT NULL`
    IsNotNull(String),
    /// Conjunction
    And(Vec<SqlPredicate>),
    /// Disjunction
    Or(Vec<SqlPredicate>),
    /// Negation
    Not(Box<SqlPredicate>),
}

/// Parser output for one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementFacts {
    /// Statement kind
    pub kind: StatementKind,
    /// Target table
    pub table: String,
    /// Column list; empty (or `*`) selects every column
    #[serde(default)]
    pub columns: Vec<String>,
    /// Insert values, parallel to `columns`
    #[serde(default)]
    pub values: Vec<SqlOperand>,
    /// WHERE tree
    #[serde(default)]
    pub where_clause: Option<SqlPredicate>,
}

impl StatementFacts {
    /// `INSERT INTO table (columns) VALUES (?, ?, ..)`
    pub fn insert(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            kind: StatementKind::Insert,
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values: (0..columns.len()).map(SqlOperand::Parameter).collect(),
            where_clause: None,
        }
    }

    /// `SELECT columns FROM table`
    pub fn select(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            kind: StatementKind::Select,
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values: Vec::new(),
            where_clause: None,
        }
    }

    /// `DELETE FROM table`
    pub fn delete(table: impl Into<String>) -> Self {
        Self {
            kind: StatementKind::Delete,
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
            where_clause: None,
        }
    }

    /// A statement the bridge never routes
    pub fn other(table: impl Into<String>) -> Self {
        Self {
            kind: StatementKind::Other,
            ..Self::delete(table)
        }
    }

    /// Add a WHERE tree
    pub fn with_where(mut self, predicate: SqlPredicate) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    /// Replace the insert values
    pub fn with_values(mut self, values: Vec<SqlOperand>) -> Self {
        self.values = values;
        self
    }

    /// Parse facts from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::user(format!("Invalid statement facts: {}", e)))
    }

    /// Serialize facts to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::fatal(format!("Failed to serialize statement facts: {}", e)))
    }

    /// Whether the column list selects everything
    pub fn selects_all(&self) -> bool {
        self.columns.is_empty() || (self.columns.len() == 1 && self.columns[0] == "*")
    }
}

// ============================================================================
// Translation
// ============================================================================

/// Name under which a positional parameter is bound
pub fn parameter_name(position: usize) -> String {
    format!("?{}", position)
}

/// Positional bindings as named parameters
pub fn parameters(bindings: &[Value]) -> Parameters {
    bindings
        .iter()
        .enumerate()
        .map(|(position, value)| (parameter_name(position), value.clone()))
        .collect()
}

/// Persistent field of the handler mapping a column
pub(crate) fn resolve_column<'a>(
    handler: &'a DomainTypeHandler,
    column: &str,
) -> std::result::Result<&'a FieldHandler, String> {
    handler
        .field_for_column(column)
        .filter(|f| f.is_persistent())
        .ok_or_else(|| format!("column {} of {} is not mapped", column, handler.table().name))
}

fn operand(operand: &SqlOperand) -> Operand {
    match operand {
        SqlOperand::Parameter(position) => Operand::param(parameter_name(*position)),
        SqlOperand::Literal(value) => Operand::Literal(value.clone()),
    }
}

impl SqlPredicate {
    /// Rewrite over field numbers; `Err` carries the reason the tree cannot
    /// be translated
    pub fn translate(&self, handler: &DomainTypeHandler) -> std::result::Result<Predicate, String> {
        let field = |column: &str| {
            let field = resolve_column(handler, column)?;
            if field.is_lob() {
                return Err(format!("large object column {} in WHERE", column));
            }
            Ok(field.number())
        };
        Ok(match self {
            SqlPredicate::Compare { column, op, operand: rhs } => {
                if matches!(op, CompareOp::Like | CompareOp::NotLike)
                    && !matches!(rhs, SqlOperand::Parameter(_) | SqlOperand::Literal(Value::String(_)))
                {
                    return Err(format!("LIKE on {} needs a string pattern", column));
                }
                Predicate::compare(field(column)?, (*op).into(), operand(rhs))
            }
            SqlPredicate::Between { column, lower, upper } => {
                Predicate::between(field(column)?, operand(lower), operand(upper))
            }
            SqlPredicate::In { column, operands } => {
                if operands.is_empty() {
                    return Err(format!("empty IN list on {}", column));
                }
                Predicate::In {
                    field: field(column)?,
                    operands: operands.iter().map(operand).collect(),
                }
            }
            SqlPredicate::IsNull(column) => Predicate::IsNull(field(column)?),
            SqlPredicate::IsNotNull(column) => Predicate::IsNotNull(field(column)?),
            SqlPredicate::And(members) => Predicate::And(translate_all(members, handler)?),
            SqlPredicate::Or(members) => Predicate::Or(translate_all(members, handler)?),
            SqlPredicate::Not(member) => Predicate::not(member.translate(handler)?),
        })
    }
}

fn translate_all(members: &[SqlPredicate], handler: &DomainTypeHandler) -> std::result::Result<Vec<Predicate>, String> {
    if members.is_empty() {
        return Err("empty AND/OR group".to_string());
    }
    members.iter().map(|m| m.translate(handler)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterbind_core::{ColumnDescriptor, ColumnType};
    use clusterbind_storage::{Dictionary, TableBuilder};

    fn handler() -> DomainTypeHandler {
        let dictionary = Dictionary::new();
        dictionary
            .create_table(
                TableBuilder::new("employee")
                    .column(ColumnDescriptor::new("id", ColumnType::Int))
                    .column(ColumnDescriptor::new("name", ColumnType::Varchar).with_length(32))
                    .column(ColumnDescriptor::new("notes", ColumnType::Text))
                    .primary_key(&["id"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        DomainTypeHandler::for_table("employee", &dictionary).unwrap()
    }

    #[test]
    fn test_translate_over_field_numbers() {
        let p = SqlPredicate::And(vec![
            SqlPredicate::Compare {
                column: "id".into(),
                op: CompareOp::Eq,
                operand: SqlOperand::Parameter(0),
            },
            SqlPredicate::IsNotNull("name".into()),
        ]);
        let translated = p.translate(&handler()).unwrap();
        assert_eq!(
            translated,
            Predicate::And(vec![
                Predicate::equal(0, Operand::param("?0")),
                Predicate::IsNotNull(1),
            ])
        );
    }

    #[test]
    fn test_untranslatable_trees() {
        let handler = handler();
        let unknown = SqlPredicate::IsNull("salary".into());
        assert!(unknown.translate(&handler).unwrap_err().contains("salary"));
        assert!(SqlPredicate::And(vec![]).translate(&handler).is_err());
        let like = SqlPredicate::Compare {
            column: "name".into(),
            op: CompareOp::Like,
            operand: SqlOperand::Literal(Value::Int(3)),
        };
        assert!(like.translate(&handler).is_err());
        let lob = SqlPredicate::IsNull("notes".into());
        assert!(lob.translate(&handler).unwrap_err().contains("large object"));
    }

    #[test]
    fn test_parameters_by_position() {
        let params = parameters(&[Value::Int(1), Value::from("a")]);
        assert_eq!(params.get("?0"), Some(&Value::Int(1)));
        assert_eq!(params.get("?1"), Some(&Value::from("a")));
    }

    #[test]
    fn test_insert_facts_bind_in_order() {
        let facts = StatementFacts::insert("employee", &["id", "name"]);
        assert_eq!(facts.values, vec![SqlOperand::Parameter(0), SqlOperand::Parameter(1)]);
        assert!(StatementFacts::select("employee", &["*"]).selects_all());
        assert!(!StatementFacts::select("employee", &["id"]).selects_all());
    }
}
