//! Candidate indexes for access path selection
//!
//! A query gets one `CandidateIndex` per index handler of its domain type.
//! The predicate marks, per index column position, whether it constrains the
//! column by equality or by a lower/upper bound. The candidates are then
//! scored:
//! - primary key, every position equal: `PrimaryKey` lookup
//! - unique hash index, every position equal: `UniqueKey` lookup
//! - ordered index with a bounded leading prefix: `IndexScan`, longer
//!   prefixes win
//! - otherwise `TableScan`
//!
//! Lookups are only chosen when the predicate is nothing but the equalities
//! on exactly the index's fields; anything else needs the scan filter.

use std::collections::BTreeSet;

use crate::index::IndexHandler;

/// Access path kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScanType {
    /// Read by primary key
    PrimaryKey,
    /// Read by unique hash index
    UniqueKey,
    /// Ordered index scan
    IndexScan,
    /// Full table scan
    TableScan,
}

/// Chosen access path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPath {
    /// Kind of access
    pub scan_type: ScanType,
    /// Index ordinal, for everything but table scans
    pub index: Option<usize>,
}

/// Bound bookkeeping for one index
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateIndex {
    ordinal: usize,
    name: String,
    unique: bool,
    hash: bool,
    primary: bool,
    usable: bool,
    fields: Vec<Option<usize>>,
    equal: Vec<bool>,
    lower: Vec<bool>,
    upper: Vec<bool>,
}

impl CandidateIndex {
    /// Fresh candidate for index `ordinal`
    pub fn new(ordinal: usize, index: &IndexHandler) -> Self {
        let len = index.columns().len();
        Self {
            ordinal,
            name: index.name().to_string(),
            unique: index.is_unique(),
            hash: index.is_hash(),
            primary: index.is_primary(),
            usable: index.is_usable(),
            fields: index.fields().to_vec(),
            equal: vec![false; len],
            lower: vec![false; len],
            upper: vec![false; len],
        }
    }

    /// Index ordinal in the domain type
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Index name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field numbers per position
    pub fn fields(&self) -> &[Option<usize>] {
        &self.fields
    }

    /// Record an equality on a position
    pub fn mark_equal(&mut self, position: usize) {
        if let Some(slot) = self.equal.get_mut(position) {
            *slot = true;
        }
    }

    /// Record a lower bound on a position
    pub fn mark_lower(&mut self, position: usize) {
        if let Some(slot) = self.lower.get_mut(position) {
            *slot = true;
        }
    }

    /// Record an upper bound on a position
    pub fn mark_upper(&mut self, position: usize) {
        if let Some(slot) = self.upper.get_mut(position) {
            *slot = true;
        }
    }

    /// Forget every mark
    pub fn reset(&mut self) {
        self.equal.iter_mut().for_each(|b| *b = false);
        self.lower.iter_mut().for_each(|b| *b = false);
        self.upper.iter_mut().for_each(|b| *b = false);
    }

    /// Whether every position has an equality
    pub fn all_equal(&self) -> bool {
        !self.equal.is_empty() && self.equal.iter().all(|b| *b)
    }

    /// Leading equality positions, plus one when the next position is range
    /// bounded
    pub fn prefix_length(&self) -> usize {
        let equal = self.equal.iter().take_while(|b| **b).count();
        let ranged = equal < self.equal.len() && (self.lower[equal] || self.upper[equal]);
        equal + usize::from(ranged)
    }

    /// Best access this index offers for the marks
    pub fn scan_type(&self) -> ScanType {
        if !self.usable {
            ScanType::TableScan
        } else if self.primary && self.all_equal() {
            ScanType::PrimaryKey
        } else if self.hash && self.unique && self.all_equal() {
            ScanType::UniqueKey
        } else if !self.hash && self.prefix_length() > 0 {
            ScanType::IndexScan
        } else {
            ScanType::TableScan
        }
    }

    fn covers_exactly(&self, equality_fields: &BTreeSet<usize>) -> bool {
        let own: BTreeSet<usize> = self.fields.iter().flatten().copied().collect();
        own.len() == self.fields.len() && own == *equality_fields
    }
}

/// Pick the cheapest access path
///
/// `equality_fields` is the set of fields the predicate pins by equality
/// when the predicate is nothing but a conjunction of such equalities.
pub fn choose_access_path(
    candidates: &[CandidateIndex],
    equality_fields: Option<&BTreeSet<usize>>,
) -> AccessPath {
    if let Some(fields) = equality_fields {
        for wanted in [ScanType::PrimaryKey, ScanType::UniqueKey] {
            if let Some(c) = candidates
                .iter()
                .find(|c| c.scan_type() == wanted && c.covers_exactly(fields))
            {
                return AccessPath {
                    scan_type: wanted,
                    index: Some(c.ordinal),
                };
            }
        }
    }
    let best = candidates
        .iter()
        .filter(|c| c.scan_type() == ScanType::IndexScan)
        .max_by(|a, b| {
            a.prefix_length()
                .cmp(&b.prefix_length())
                .then_with(|| b.ordinal.cmp(&a.ordinal))
        });
    match best {
        Some(c) => AccessPath {
            scan_type: ScanType::IndexScan,
            index: Some(c.ordinal),
        },
        None => AccessPath {
            scan_type: ScanType::TableScan,
            index: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainTypeHandler, TypeMapping};
    use crate::field::FieldMapping;
    use crate::test_support::employee_dictionary;
    use clusterbind_core::FieldType;

    fn employee() -> DomainTypeHandler {
        let mapping = TypeMapping::new("Employee", "employee")
            .field(FieldMapping::new("id", FieldType::INT))
            .field(FieldMapping::new("name", FieldType::STRING))
            .field(FieldMapping::new("salary", FieldType::DECIMAL));
        DomainTypeHandler::new(&mapping, &employee_dictionary()).unwrap()
    }

    fn ordinal_of(candidates: &[CandidateIndex], name: &str, hash: bool) -> usize {
        candidates
            .iter()
            .find(|c| c.name() == name && c.hash == hash)
            .map(|c| c.ordinal())
            .unwrap()
    }

    #[test]
    fn test_primary_key_lookup() {
        let handler = employee();
        let mut candidates = handler.create_candidate_indexes();
        candidates[0].mark_equal(0);
        let fields: BTreeSet<usize> = [0].into_iter().collect();
        let path = choose_access_path(&candidates, Some(&fields));
        assert_eq!(path.scan_type, ScanType::PrimaryKey);
        assert_eq!(path.index, Some(0));
    }

    #[test]
    fn test_unique_lookup_needs_exact_cover() {
        let handler = employee();
        let mut candidates = handler.create_candidate_indexes();
        let hash = ordinal_of(&candidates, "idx_name", true);
        let ordered = ordinal_of(&candidates, "idx_name", false);
        candidates[hash].mark_equal(0);
        candidates[ordered].mark_equal(0);

        let exact: BTreeSet<usize> = [1].into_iter().collect();
        let path = choose_access_path(&candidates, Some(&exact));
        assert_eq!(path.scan_type, ScanType::UniqueKey);
        assert_eq!(path.index, Some(hash));

        let wider: BTreeSet<usize> = [1, 2].into_iter().collect();
        let path = choose_access_path(&candidates, Some(&wider));
        assert_eq!(path.scan_type, ScanType::IndexScan);
        assert_eq!(path.index, Some(ordered));
    }

    #[test]
    fn test_range_prefers_ordered_index() {
        let handler = employee();
        let mut candidates = handler.create_candidate_indexes();
        let primary_ordered = ordinal_of(&candidates, "PRIMARY", false);
        candidates[0].mark_lower(0);
        candidates[primary_ordered].mark_lower(0);
        let path = choose_access_path(&candidates, None);
        assert_eq!(path.scan_type, ScanType::IndexScan);
        assert_eq!(path.index, Some(primary_ordered));
    }

    #[test]
    fn test_no_marks_is_table_scan() {
        let handler = employee();
        let candidates = handler.create_candidate_indexes();
        let path = choose_access_path(&candidates, None);
        assert_eq!(path.scan_type, ScanType::TableScan);
        assert_eq!(path.index, None);
    }

    #[test]
    fn test_prefix_length() {
        let handler = employee();
        let mut candidate = handler.create_candidate_indexes().remove(0);
        assert_eq!(candidate.prefix_length(), 0);
        candidate.mark_upper(0);
        assert_eq!(candidate.prefix_length(), 1);
        candidate.reset();
        assert!(!candidate.all_equal());
    }
}
