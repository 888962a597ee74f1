use crate::index::{EncodedPattern, EncodedTriple, IndexPermutations};
use crate::memory::object_id_mapping::MemoryObjectIdMapping;
use rdf_weave_common::error::StorageError;
use rdf_weave_common::{SolutionSequence, TripleStore};
use rdf_weave_model::{
    position_of, triple_pattern_variables, NamedNodePattern, Row, Term, TermPattern, Triple,
    TriplePattern, Variable,
};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// An in-memory [TripleStore].
///
/// Terms are encoded as object ids and every triple is kept in three sorted permutations (SPO,
/// POS, OSP). A triple pattern is answered by a single range scan of the best permutation.
///
/// # Consistency
///
/// The solutions of a triple pattern are materialized while holding a read lock. Hence, every
/// sequence returned by [Self::query_triple_pattern] reflects a snapshot of the store. Triples
/// that are inserted later are not visible to already returned sequences.
///
/// ```
/// use rdf_weave_common::TripleStore;
/// use rdf_weave_model::{NamedNode, Triple, TriplePattern, Variable};
/// use rdf_weave_storage::MemoryTripleStore;
///
/// let store = MemoryTripleStore::new();
/// let ex = NamedNode::new("http://example.com/ex")?;
/// store.insert(&Triple::new(ex.clone(), ex.clone(), ex.clone()))?;
///
/// let pattern = TriplePattern {
///     subject: Variable::new("s")?.into(),
///     predicate: ex.into(),
///     object: Variable::new("o")?.into(),
/// };
/// assert_eq!(store.query_triple_pattern(&pattern)?.materialize()?.len(), 1);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryTripleStore {
    object_ids: MemoryObjectIdMapping,
    indexes: RwLock<IndexPermutations>,
}

impl MemoryTripleStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `triple`. Returns false if the triple already exists.
    pub fn insert(&self, triple: &Triple) -> Result<bool, StorageError> {
        let encoded = [
            self.object_ids
                .obtain_object_id(&Term::from(triple.subject.clone()))?,
            self.object_ids
                .obtain_object_id(&Term::from(triple.predicate.clone()))?,
            self.object_ids.obtain_object_id(&triple.object)?,
        ];
        Ok(self.write_indexes().insert(encoded))
    }

    /// Inserts all `triples`. Returns the number of triples that did not exist before.
    pub fn extend(&self, triples: impl IntoIterator<Item = Triple>) -> Result<usize, StorageError> {
        let mut inserted = 0;
        for triple in triples {
            if self.insert(&triple)? {
                inserted += 1;
            }
        }
        tracing::debug!(inserted, total = self.len(), "Extended memory triple store");
        Ok(inserted)
    }

    /// Returns the number of triples in the store.
    pub fn len(&self) -> usize {
        self.read_indexes().len()
    }

    /// Returns true if the store contains no triples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_indexes(&self) -> RwLockReadGuard<'_, IndexPermutations> {
        self.indexes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_indexes(&self) -> RwLockWriteGuard<'_, IndexPermutations> {
        self.indexes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encodes the bound components of `pattern`. Returns [None] if a bound term is not part of
    /// any triple, in which case the pattern has no solutions.
    fn encode_pattern(&self, pattern: &TriplePattern) -> Option<EncodedPattern> {
        let mut encoded = [None; 3];
        for (slot, term) in encoded.iter_mut().zip(pattern_terms(pattern)) {
            if let Some(term) = term {
                *slot = Some(self.object_ids.try_get_object_id(&term)?);
            }
        }
        Some(encoded)
    }
}

impl TripleStore for MemoryTripleStore {
    fn query_triple_pattern(
        &self,
        pattern: &TriplePattern,
    ) -> Result<SolutionSequence, StorageError> {
        let variables = triple_pattern_variables(pattern);
        let Some(encoded) = self.encode_pattern(pattern) else {
            return Ok(SolutionSequence::empty(variables));
        };
        let layout = PatternLayout::new(pattern, &variables);

        let rows = self
            .read_indexes()
            .scan(&encoded)
            .filter(|triple| layout.is_consistent(triple))
            .map(|triple| layout.decode(&self.object_ids, &triple))
            .collect::<Result<Vec<Row>, StorageError>>()?;
        tracing::trace!(%pattern, rows = rows.len(), "Answered triple pattern");

        Ok(SolutionSequence::from_rows(variables, rows))
    }

    fn estimate_cardinality(&self, pattern: &TriplePattern) -> u64 {
        let Some(encoded) = self.encode_pattern(pattern) else {
            return 0;
        };
        let variables = triple_pattern_variables(pattern);
        let layout = PatternLayout::new(pattern, &variables);
        let count = self
            .read_indexes()
            .scan(&encoded)
            .filter(|triple| layout.is_consistent(triple))
            .count();
        u64::try_from(count).unwrap_or(u64::MAX)
    }
}

/// Returns the bound terms of `pattern` in subject, predicate, object order.
fn pattern_terms(pattern: &TriplePattern) -> [Option<Term>; 3] {
    let predicate = match &pattern.predicate {
        NamedNodePattern::NamedNode(node) => Some(Term::from(node.clone())),
        NamedNodePattern::Variable(_) => None,
    };
    [
        term_pattern_term(&pattern.subject),
        predicate,
        term_pattern_term(&pattern.object),
    ]
}

fn term_pattern_term(pattern: &TermPattern) -> Option<Term> {
    match pattern {
        TermPattern::NamedNode(node) => Some(node.clone().into()),
        TermPattern::BlankNode(node) => Some(node.clone().into()),
        TermPattern::Literal(literal) => Some(literal.clone().into()),
        TermPattern::Variable(_) => None,
    }
}

fn term_pattern_variable(pattern: &TermPattern) -> Option<&Variable> {
    match pattern {
        TermPattern::Variable(variable) => Some(variable),
        _ => None,
    }
}

fn pattern_variables(pattern: &TriplePattern) -> [Option<&Variable>; 3] {
    let predicate = match &pattern.predicate {
        NamedNodePattern::Variable(variable) => Some(variable),
        NamedNodePattern::NamedNode(_) => None,
    };
    [
        term_pattern_variable(&pattern.subject),
        predicate,
        term_pattern_variable(&pattern.object),
    ]
}

/// Maps the components of a matching triple onto the columns of the solution.
struct PatternLayout {
    /// The triple position of every column.
    columns: Vec<usize>,
    /// Pairs of triple positions that hold the same variable.
    repeated: Vec<(usize, usize)>,
}

impl PatternLayout {
    fn new(pattern: &TriplePattern, variables: &[Variable]) -> Self {
        let components = pattern_variables(pattern);
        let mut columns = vec![0; variables.len()];
        let mut repeated = Vec::new();
        for (position, variable) in components.iter().enumerate() {
            let Some(variable) = variable else {
                continue;
            };
            let first = components.iter().position(|c| *c == Some(*variable));
            match first {
                Some(first) if first < position => repeated.push((first, position)),
                _ => {
                    if let Some(column) = position_of(variables, variable) {
                        if let Some(slot) = columns.get_mut(column) {
                            *slot = position;
                        }
                    }
                }
            }
        }
        Self { columns, repeated }
    }

    fn is_consistent(&self, triple: &EncodedTriple) -> bool {
        self.repeated
            .iter()
            .all(|(a, b)| triple.get(*a) == triple.get(*b))
    }

    fn decode(
        &self,
        object_ids: &MemoryObjectIdMapping,
        triple: &EncodedTriple,
    ) -> Result<Row, StorageError> {
        self.columns
            .iter()
            .map(|position| {
                let object_id = triple.get(*position).copied();
                object_id.map(|id| object_ids.decode(id)).transpose()
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Row::from)
    }
}
