//! Field number sets

use std::fmt;

/// Fixed-capacity set of field numbers
#[derive(Clone, PartialEq, Eq, Default)]
pub struct FieldSet {
    words: Vec<u64>,
    capacity: usize,
}

impl FieldSet {
    /// Empty set able to hold field numbers `0..capacity`
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; (capacity + 63) / 64],
            capacity,
        }
    }

    /// Set holding the given field numbers
    pub fn from_fields(capacity: usize, fields: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(capacity);
        for field in fields {
            set.insert(field);
        }
        set
    }

    /// Capacity in field numbers
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add a field; numbers beyond the capacity are ignored
    pub fn insert(&mut self, field: usize) -> bool {
        if field >= self.capacity {
            return false;
        }
        let (word, bit) = (field / 64, field % 64);
        let was_set = self.words[word] & (1 << bit) != 0;
        self.words[word] |= 1 << bit;
        !was_set
    }

    /// Remove a field
    pub fn remove(&mut self, field: usize) {
        if field < self.capacity {
            self.words[field / 64] &= !(1 << (field % 64));
        }
    }

    /// Whether a field is in the set
    pub fn contains(&self, field: usize) -> bool {
        field < self.capacity && self.words[field / 64] & (1 << (field % 64)) != 0
    }

    /// Remove every field
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Number of fields in the set
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Field numbers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.capacity).filter(move |f| self.contains(*f))
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_contains_remove() {
        let mut set = FieldSet::new(70);
        assert!(set.insert(3));
        assert!(!set.insert(3));
        assert!(set.insert(65));
        assert!(!set.insert(70));
        assert!(set.contains(65));
        assert_eq!(set.len(), 2);
        set.remove(3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![65]);
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_debug_lists_members() {
        let set = FieldSet::from_fields(8, [1, 4]);
        assert_eq!(format!("{:?}", set), "{1, 4}");
    }
}
