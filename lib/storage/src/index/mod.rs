//! Sorted triple indexes.
//!
//! A triple index represents a particular ordering of the triple components subject, predicate,
//! and object. For example, the [IndexComponents::SPO] index represents that exact ordering while
//! the [IndexComponents::POS] index has the predicate as the first component. A scan can only use
//! the leading bound components of a pattern as a range, so different patterns are best served by
//! different indexes. [IndexPermutations] holds one index per ordering and chooses among them.

mod permutations;

pub(crate) use permutations::IndexPermutations;

use crate::memory::ObjectId;
use std::collections::BTreeSet;

/// An encoded triple in subject, predicate, object order.
pub(crate) type EncodedTriple = [ObjectId; 3];

/// A triple pattern whose bound components are encoded. Unbound components are [None].
pub(crate) type EncodedPattern = [Option<ObjectId>; 3];

/// The order of the triple components in an index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum IndexComponents {
    SPO,
    POS,
    OSP,
}

impl IndexComponents {
    pub(crate) const ALL: [IndexComponents; 3] =
        [IndexComponents::SPO, IndexComponents::POS, IndexComponents::OSP];

    /// Returns the triple position of each index level.
    fn order(self) -> [usize; 3] {
        match self {
            IndexComponents::SPO => [0, 1, 2],
            IndexComponents::POS => [1, 2, 0],
            IndexComponents::OSP => [2, 0, 1],
        }
    }

    /// Reorders a subject, predicate, object triple into the order of this index.
    fn reorder<T: Copy>(self, triple: [T; 3]) -> [T; 3] {
        self.order().map(|position| triple[position])
    }

    /// Restores the subject, predicate, object order of a triple in the order of this index.
    fn restore<T: Copy>(self, key: [T; 3]) -> [T; 3] {
        let mut triple = key;
        for (level, position) in self.order().into_iter().enumerate() {
            triple[position] = key[level];
        }
        triple
    }
}

/// A single index with a fixed [IndexComponents] ordering.
#[derive(Debug)]
pub(crate) struct TripleIndex {
    components: IndexComponents,
    triples: BTreeSet<EncodedTriple>,
}

impl TripleIndex {
    pub(crate) fn new(components: IndexComponents) -> Self {
        Self {
            components,
            triples: BTreeSet::new(),
        }
    }

    pub(crate) fn components(&self) -> IndexComponents {
        self.components
    }

    pub(crate) fn len(&self) -> usize {
        self.triples.len()
    }

    /// Inserts `triple`. Returns false if the triple already exists.
    pub(crate) fn insert(&mut self, triple: EncodedTriple) -> bool {
        self.triples.insert(self.components.reorder(triple))
    }

    /// Returns the number of leading components of `pattern` that are bound in the order of this
    /// index. The higher the score, the smaller the scanned range.
    pub(crate) fn scan_score(&self, pattern: &EncodedPattern) -> usize {
        self.components
            .reorder(*pattern)
            .iter()
            .take_while(|c| c.is_some())
            .count()
    }

    /// Returns all triples that match the bound components of `pattern`, in subject, predicate,
    /// object order.
    pub(crate) fn scan<'a>(
        &'a self,
        pattern: &EncodedPattern,
    ) -> impl Iterator<Item = EncodedTriple> + 'a {
        // Only the leading bound components restrict the range.
        let prefix = self.scan_score(pattern);
        let mut lower = [ObjectId::MIN; 3];
        let mut upper = [ObjectId::MAX; 3];
        let key = self.components.reorder(*pattern);
        let bounds = lower.iter_mut().zip(&mut upper).zip(key);
        for ((lower, upper), component) in bounds.take(prefix) {
            if let Some(component) = component {
                *lower = component;
                *upper = component;
            }
        }

        let components = self.components;
        let pattern = *pattern;
        self.triples
            .range(lower..=upper)
            .map(move |key| components.restore(*key))
            .filter(move |triple| matches(&pattern, triple))
    }
}

fn matches(pattern: &EncodedPattern, triple: &EncodedTriple) -> bool {
    pattern
        .iter()
        .zip(triple)
        .all(|(expected, actual)| expected.map_or(true, |expected| expected == *actual))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u32) -> ObjectId {
        ObjectId::from(value)
    }

    #[test]
    fn restore_inverts_reorder() {
        for components in IndexComponents::ALL {
            let triple = [id(1), id(2), id(3)];
            assert_eq!(components.restore(components.reorder(triple)), triple);
        }
    }

    #[test]
    fn scan_uses_leading_components() {
        let mut index = TripleIndex::new(IndexComponents::POS);
        index.insert([id(1), id(2), id(3)]);
        index.insert([id(4), id(2), id(5)]);
        index.insert([id(1), id(6), id(3)]);

        let pattern = [None, Some(id(2)), None];
        assert_eq!(index.scan_score(&pattern), 1);
        assert_eq!(
            index.scan(&pattern).collect::<Vec<_>>(),
            vec![[id(1), id(2), id(3)], [id(4), id(2), id(5)]]
        );

        let pattern = [Some(id(1)), None, Some(id(3))];
        assert_eq!(index.scan_score(&pattern), 0);
        assert_eq!(
            index.scan(&pattern).collect::<Vec<_>>(),
            vec![[id(1), id(2), id(3)], [id(1), id(6), id(3)]]
        );
    }
}
