use crate::index::{EncodedPattern, EncodedTriple, IndexComponents, TripleIndex};

/// Holds one [TripleIndex] for every [IndexComponents] ordering.
///
/// Every subset of bound components is a prefix of one of the orderings. Hence, every scan can
/// restrict its range by all bound components of the pattern.
#[derive(Debug)]
pub(crate) struct IndexPermutations {
    indexes: Vec<TripleIndex>,
}

impl Default for IndexPermutations {
    fn default() -> Self {
        Self {
            indexes: IndexComponents::ALL.map(TripleIndex::new).into(),
        }
    }
}

impl IndexPermutations {
    /// Chooses the index for scanning `pattern`.
    pub(crate) fn choose_index(&self, pattern: &EncodedPattern) -> Option<&TripleIndex> {
        self.indexes
            .iter()
            .rev() // Prefer SPO (max_by_key uses the last on equality)
            .max_by_key(|index| index.scan_score(pattern))
    }

    pub(crate) fn len(&self) -> usize {
        self.indexes.first().map_or(0, TripleIndex::len)
    }

    /// Inserts `triple` into every index. Returns false if the triple already exists.
    pub(crate) fn insert(&mut self, triple: EncodedTriple) -> bool {
        let mut inserted = false;
        for index in &mut self.indexes {
            inserted = index.insert(triple);
        }
        inserted
    }

    /// Returns all triples that match `pattern`, using the best index.
    pub(crate) fn scan<'a>(
        &'a self,
        pattern: &EncodedPattern,
    ) -> impl Iterator<Item = EncodedTriple> + 'a {
        let index = self.choose_index(pattern);
        tracing::trace!(
            components = ?index.map(TripleIndex::components),
            "Chose index for scan"
        );
        let pattern = *pattern;
        index.into_iter().flat_map(move |index| index.scan(&pattern))
    }
}
