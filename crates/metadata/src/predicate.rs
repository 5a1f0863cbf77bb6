//! Query predicates over mapped fields
//!
//! A `Predicate` is a tree of comparisons on field numbers whose right-hand
//! sides are literals or named parameters. The same tree drives every step
//! of running a query:
//! - `mark_bounds` feeds the candidate indexes
//! - `operation_equal` sets the key of a primary key or unique lookup
//! - `operation_set_bounds` bounds an ordered index scan
//! - `filter_cmp` builds the scan filter that re-checks every row
//!
//! Only the top-level conjunction contributes bounds; anything under `Or`
//! or `Not` is left to the filter.
//!
//! A comparison whose operand is null matches no row on every access path,
//! `=` and `<>` included; only `IsNull` and `IsNotNull` test for null.

use clusterbind_core::{Error, Result, Value};
use clusterbind_storage::{BinaryCondition, BoundType, FilterGroup, IndexScanOperation, Operation, ScanFilter};
use std::collections::{BTreeMap, BTreeSet};

use crate::candidate::CandidateIndex;
use crate::field::FieldHandler;

/// Named query parameter values
pub type Parameters = BTreeMap<String, Value>;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
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

impl Comparison {
    fn condition(self) -> BinaryCondition {
        match self {
            Comparison::Eq => BinaryCondition::Eq,
            Comparison::Ne => BinaryCondition::Ne,
            Comparison::Lt => BinaryCondition::Lt,
            Comparison::Le => BinaryCondition::Le,
            Comparison::Gt => BinaryCondition::Gt,
            Comparison::Ge => BinaryCondition::Ge,
            Comparison::Like => BinaryCondition::Like,
            Comparison::NotLike => BinaryCondition::NotLike,
        }
    }

    fn bound(self) -> Option<BoundType> {
        match self {
            Comparison::Eq => Some(BoundType::Eq),
            Comparison::Lt => Some(BoundType::Lt),
            Comparison::Le => Some(BoundType::Le),
            Comparison::Gt => Some(BoundType::Gt),
            Comparison::Ge => Some(BoundType::Ge),
            _ => None,
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Named parameter, bound at execution
    Parameter(String),
    /// Constant
    Literal(Value),
}

impl Operand {
    /// Named parameter
    pub fn param(name: impl Into<String>) -> Self {
        Operand::Parameter(name.into())
    }

    /// Constant
    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }

    /// Value of the operand under a parameter binding
    pub fn resolve(&self, params: &Parameters) -> Result<Value> {
        match self {
            Operand::Literal(v) => Ok(v.clone()),
            Operand::Parameter(name) => params
                .get(name)
                .cloned()
                .ok_or_else(|| Error::user(format!("Parameter {} is not bound", name))),
        }
    }
}

/// Condition tree over field numbers
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field <comparison> operand`
    Compare {
        /// Field number
        field: usize,
        /// Operator
        comparison: Comparison,
        /// Right-hand side
        operand: Operand,
    },
    /// `field BETWEEN lower AND upper`, both ends inclusive
    Between {
        /// Field number
        field: usize,
        /// Low end
        lower: Operand,
        /// High end
        upper: Operand,
    },
    /// `field IN (operands)`
    In {
        /// Field number
        field: usize,
        /// Candidate values
        operands: Vec<Operand>,
    },
    /// `field IS NULL`
    IsNull(usize),
    /// `field IS NOT NULL`
    IsNotNull(usize),
    /// Every member holds
    And(Vec<Predicate>),
    /// Some member holds
    Or(Vec<Predicate>),
    /// The member does not hold
    Not(Box<Predicate>),
}

fn field_at(fields: &[FieldHandler], number: usize) -> Result<&FieldHandler> {
    fields
        .get(number)
        .ok_or_else(|| Error::fatal(format!("Predicate names unknown field number {}", number)))
}

fn group(filter: &mut dyn ScanFilter, kind: FilterGroup) -> Result<()> {
    filter.begin(kind).map_err(Error::from)
}

fn end(filter: &mut dyn ScanFilter) -> Result<()> {
    filter.end().map_err(Error::from)
}

/// An empty `Or` group, false for every row
fn match_nothing(filter: &mut dyn ScanFilter) -> Result<()> {
    group(filter, FilterGroup::Or)?;
    end(filter)
}

impl Predicate {
    /// `field <comparison> operand`
    pub fn compare(field: usize, comparison: Comparison, operand: Operand) -> Self {
        Predicate::Compare {
            field,
            comparison,
            operand,
        }
    }

    /// `field = operand`
    pub fn equal(field: usize, operand: Operand) -> Self {
        Self::compare(field, Comparison::Eq, operand)
    }

    /// `field BETWEEN lower AND upper`
    pub fn between(field: usize, lower: Operand, upper: Operand) -> Self {
        Predicate::Between { field, lower, upper }
    }

    /// Negation
    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    /// Top-level conjuncts
    fn conjuncts(&self) -> Vec<&Predicate> {
        match self {
            Predicate::And(members) => members.iter().flat_map(|m| m.conjuncts()).collect(),
            other => vec![other],
        }
    }

    /// Field numbers referenced anywhere in the tree
    pub fn fields(&self) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut BTreeSet<usize>) {
        match self {
            Predicate::Compare { field, .. }
            | Predicate::Between { field, .. }
            | Predicate::In { field, .. }
            | Predicate::IsNull(field)
            | Predicate::IsNotNull(field) => {
                out.insert(*field);
            }
            Predicate::And(members) | Predicate::Or(members) => {
                members.iter().for_each(|m| m.collect_fields(out));
            }
            Predicate::Not(member) => member.collect_fields(out),
        }
    }

    /// Fields pinned by equality, when the predicate is nothing but a
    /// conjunction of equalities on distinct fields
    pub fn equality_fields(&self) -> Option<BTreeSet<usize>> {
        let mut out = BTreeSet::new();
        for conjunct in self.conjuncts() {
            match conjunct {
                Predicate::Compare {
                    field,
                    comparison: Comparison::Eq,
                    operand,
                } if !matches!(operand, Operand::Literal(Value::Null)) => {
                    if !out.insert(*field) {
                        return None;
                    }
                }
                _ => return None,
            }
        }
        Some(out)
    }

    /// Whether an equality of the top-level conjunction compares against
    /// null once parameters are bound; such a predicate matches no row
    pub fn binds_null_equality(&self, params: &Parameters) -> Result<bool> {
        for conjunct in self.conjuncts() {
            if let Predicate::Compare {
                comparison: Comparison::Eq,
                operand,
                ..
            } = conjunct
            {
                if operand.resolve(params)?.is_null() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Mark the bounds of the top-level conjunction on the candidates
    pub fn mark_bounds(&self, fields: &[FieldHandler], candidates: &mut [CandidateIndex]) {
        for conjunct in self.conjuncts() {
            match conjunct {
                Predicate::Compare {
                    field,
                    comparison,
                    operand,
                } => {
                    if matches!(operand, Operand::Literal(Value::Null)) {
                        continue;
                    }
                    let Some(f) = fields.get(*field) else { continue };
                    match comparison {
                        Comparison::Eq => f.mark_equal_bound(candidates),
                        Comparison::Gt | Comparison::Ge => f.mark_lower_bound(candidates),
                        Comparison::Lt | Comparison::Le => f.mark_upper_bound(candidates),
                        _ => {}
                    }
                }
                Predicate::Between { field, .. } => {
                    if let Some(f) = fields.get(*field) {
                        f.mark_lower_bound(candidates);
                        f.mark_upper_bound(candidates);
                    }
                }
                _ => {}
            }
        }
    }

    /// Set the equality key of a lookup
    ///
    /// Only valid when `equality_fields` is `Some`.
    pub fn operation_equal(&self, fields: &[FieldHandler], params: &Parameters, op: &mut dyn Operation) -> Result<()> {
        for conjunct in self.conjuncts() {
            match conjunct {
                Predicate::Compare {
                    field,
                    comparison: Comparison::Eq,
                    operand,
                } => {
                    let value = operand.resolve(params)?;
                    field_at(fields, *field)?.operation_equal(&value, op)?;
                }
                other => {
                    return Err(Error::fatal(format!(
                        "Predicate {:?} cannot be used for a key lookup",
                        other
                    )))
                }
            }
        }
        Ok(())
    }

    /// Bound an index scan with the top-level conjunction
    ///
    /// Conditions on columns outside the scanned index, and null-valued
    /// ones, are left to the filter.
    pub fn operation_set_bounds(
        &self,
        fields: &[FieldHandler],
        params: &Parameters,
        op: &mut dyn IndexScanOperation,
    ) -> Result<()> {
        let index_columns = op.index().columns.clone();
        let in_index = |f: &FieldHandler| {
            f.column_name()
                .map_or(false, |c| index_columns.iter().any(|i| i == c))
        };
        for conjunct in self.conjuncts() {
            match conjunct {
                Predicate::Compare {
                    field,
                    comparison,
                    operand,
                } => {
                    let Some(bound) = comparison.bound() else { continue };
                    let f = field_at(fields, *field)?;
                    let value = operand.resolve(params)?;
                    if in_index(f) && !value.is_null() {
                        f.operation_set_bounds(&value, bound, op)?;
                    }
                }
                Predicate::Between { field, lower, upper } => {
                    let f = field_at(fields, *field)?;
                    if !in_index(f) {
                        continue;
                    }
                    let lower = lower.resolve(params)?;
                    let upper = upper.resolve(params)?;
                    if !lower.is_null() {
                        f.operation_set_bounds(&lower, BoundType::Ge, op)?;
                    }
                    if !upper.is_null() {
                        f.operation_set_bounds(&upper, BoundType::Le, op)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Build the scan filter for the whole tree
    pub fn filter_cmp(&self, fields: &[FieldHandler], params: &Parameters, filter: &mut dyn ScanFilter) -> Result<()> {
        group(filter, FilterGroup::And)?;
        self.add_to_filter(fields, params, filter)?;
        end(filter)
    }

    fn add_to_filter(&self, fields: &[FieldHandler], params: &Parameters, filter: &mut dyn ScanFilter) -> Result<()> {
        match self {
            Predicate::Compare {
                field,
                comparison,
                operand,
            } => {
                let f = field_at(fields, *field)?;
                let value = operand.resolve(params)?;
                if value.is_null() {
                    return match_nothing(filter);
                }
                f.filter_compare_value(&value, comparison.condition(), filter)
            }
            Predicate::Between { field, lower, upper } => {
                let f = field_at(fields, *field)?;
                let lower = lower.resolve(params)?;
                let upper = upper.resolve(params)?;
                if lower.is_null() || upper.is_null() {
                    return match_nothing(filter);
                }
                group(filter, FilterGroup::And)?;
                f.filter_compare_value(&lower, BinaryCondition::Ge, filter)?;
                f.filter_compare_value(&upper, BinaryCondition::Le, filter)?;
                end(filter)
            }
            Predicate::In { field, operands } => {
                let f = field_at(fields, *field)?;
                group(filter, FilterGroup::Or)?;
                for operand in operands {
                    let value = operand.resolve(params)?;
                    if !value.is_null() {
                        f.filter_compare_value(&value, BinaryCondition::Eq, filter)?;
                    }
                }
                end(filter)
            }
            Predicate::IsNull(field) => {
                field_at(fields, *field)?.filter_compare_value(&Value::Null, BinaryCondition::Eq, filter)
            }
            Predicate::IsNotNull(field) => {
                field_at(fields, *field)?.filter_compare_value(&Value::Null, BinaryCondition::Ne, filter)
            }
            Predicate::And(members) | Predicate::Or(members) => {
                let kind = if matches!(self, Predicate::And(_)) {
                    FilterGroup::And
                } else {
                    FilterGroup::Or
                };
                group(filter, kind)?;
                for member in members {
                    member.add_to_filter(fields, params, filter)?;
                }
                end(filter)
            }
            Predicate::Not(member) => {
                group(filter, FilterGroup::Nand)?;
                member.add_to_filter(fields, params, filter)?;
                end(filter)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainTypeHandler, TypeMapping};
    use crate::field::FieldMapping;
    use crate::test_support::employee_dictionary;
    use clusterbind_core::FieldType;
    use clusterbind_storage::ScanFilterBuilder;
    use rust_decimal::Decimal;

    fn employee() -> DomainTypeHandler {
        let mapping = TypeMapping::new("Employee", "employee")
            .field(FieldMapping::new("id", FieldType::INT))
            .field(FieldMapping::new("name", FieldType::STRING))
            .field(FieldMapping::new("salary", FieldType::DECIMAL));
        DomainTypeHandler::new(&mapping, &employee_dictionary()).unwrap()
    }

    fn row(id: i32, name: &str, salary: Option<i64>) -> Vec<Value> {
        vec![
            Value::Int(id),
            Value::from(name),
            salary.map_or(Value::Null, |s| Value::Decimal(Decimal::from(s))),
            Value::Null,
            Value::Null,
        ]
    }

    #[test]
    fn test_binds_null_equality() {
        let p = Predicate::equal(0, Operand::param("id"));
        let mut params = Parameters::new();
        params.insert("id".into(), Value::Null);
        assert!(p.binds_null_equality(&params).unwrap());
        params.insert("id".into(), Value::Int(3));
        assert!(!p.binds_null_equality(&params).unwrap());
        assert!(p.binds_null_equality(&Parameters::new()).is_err());
    }

    #[test]
    fn test_equality_fields() {
        let p = Predicate::And(vec![
            Predicate::equal(0, Operand::param("id")),
            Predicate::equal(1, Operand::literal("Ann")),
        ]);
        assert_eq!(p.equality_fields(), Some([0, 1].into_iter().collect()));
        let p = Predicate::And(vec![
            Predicate::equal(0, Operand::param("id")),
            Predicate::compare(2, Comparison::Gt, Operand::literal(1)),
        ]);
        assert_eq!(p.equality_fields(), None);
        assert_eq!(Predicate::equal(2, Operand::Literal(Value::Null)).equality_fields(), None);
    }

    #[test]
    fn test_filter_matches_rows() {
        let handler = employee();
        let p = Predicate::Or(vec![
            Predicate::compare(1, Comparison::Like, Operand::literal("A%")),
            Predicate::IsNull(2),
        ]);
        let mut filter = ScanFilterBuilder::new();
        p.filter_cmp(handler.fields(), &Parameters::new(), &mut filter).unwrap();
        let node = filter.finish().unwrap().unwrap();
        assert!(node.evaluate(&row(1, "Ann", Some(10))));
        assert!(node.evaluate(&row(2, "Bob", None)));
        assert!(!node.evaluate(&row(3, "Bob", Some(10))));
    }

    #[test]
    fn test_not_between_and_in() {
        let handler = employee();
        let mut params = Parameters::new();
        params.insert("lo".into(), Value::Decimal(Decimal::from(10)));
        params.insert("hi".into(), Value::Decimal(Decimal::from(20)));
        let p = Predicate::And(vec![
            Predicate::not(Predicate::between(2, Operand::param("lo"), Operand::param("hi"))),
            Predicate::In {
                field: 0,
                operands: vec![Operand::literal(1), Operand::literal(2)],
            },
        ]);
        let mut filter = ScanFilterBuilder::new();
        p.filter_cmp(handler.fields(), &params, &mut filter).unwrap();
        let node = filter.finish().unwrap().unwrap();
        assert!(node.evaluate(&row(1, "Ann", Some(30))));
        assert!(!node.evaluate(&row(1, "Ann", Some(15))));
        assert!(!node.evaluate(&row(3, "Ann", Some(30))));
    }

    #[test]
    fn test_null_operand_matches_nothing() {
        let handler = employee();
        let mut params = Parameters::new();
        params.insert("salary".into(), Value::Null);
        for comparison in [Comparison::Eq, Comparison::Ne, Comparison::Ge] {
            let p = Predicate::compare(2, comparison, Operand::param("salary"));
            let mut filter = ScanFilterBuilder::new();
            p.filter_cmp(handler.fields(), &params, &mut filter).unwrap();
            let node = filter.finish().unwrap().unwrap();
            assert!(!node.evaluate(&row(1, "Ann", None)), "{:?}", comparison);
            assert!(!node.evaluate(&row(2, "Bob", Some(10))), "{:?}", comparison);
        }

        let p = Predicate::In {
            field: 2,
            operands: vec![Operand::param("salary"), Operand::literal(Decimal::from(10))],
        };
        let mut filter = ScanFilterBuilder::new();
        p.filter_cmp(handler.fields(), &params, &mut filter).unwrap();
        let node = filter.finish().unwrap().unwrap();
        assert!(!node.evaluate(&row(1, "Ann", None)));
        assert!(node.evaluate(&row(2, "Bob", Some(10))));

        let p = Predicate::between(2, Operand::param("salary"), Operand::literal(Decimal::from(20)));
        let mut filter = ScanFilterBuilder::new();
        p.filter_cmp(handler.fields(), &params, &mut filter).unwrap();
        assert!(!filter.finish().unwrap().unwrap().evaluate(&row(2, "Bob", Some(10))));

        let mut filter = ScanFilterBuilder::new();
        Predicate::IsNull(2).filter_cmp(handler.fields(), &params, &mut filter).unwrap();
        assert!(filter.finish().unwrap().unwrap().evaluate(&row(1, "Ann", None)));
    }

    #[test]
    fn test_unbound_parameter() {
        let handler = employee();
        let p = Predicate::equal(0, Operand::param("id"));
        let mut filter = ScanFilterBuilder::new();
        let err = p.filter_cmp(handler.fields(), &Parameters::new(), &mut filter).unwrap_err();
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn test_mark_bounds_top_level_only() {
        let handler = employee();
        let mut candidates = handler.create_candidate_indexes();
        let p = Predicate::Or(vec![Predicate::equal(0, Operand::literal(1))]);
        p.mark_bounds(handler.fields(), &mut candidates);
        assert!(!candidates[0].all_equal());
        Predicate::equal(0, Operand::literal(1)).mark_bounds(handler.fields(), &mut candidates);
        assert!(candidates[0].all_equal());
    }
}
