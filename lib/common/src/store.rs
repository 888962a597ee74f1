use crate::error::StorageError;
use crate::SolutionSequence;
use rdf_weave_model::TriplePattern;
use std::fmt::Debug;

/// The storage collaborator of the engine.
///
/// The triple store is responsible for answering single triple patterns. Everything else (joins,
/// filters, ...) is done by the evaluators.
///
/// # Consistency
///
/// An algebra tree most often contains multiple triple patterns that access the same store. It is
/// the responsibility of the store to ensure that the patterns see the same snapshot.
pub trait TripleStore: Debug + Send + Sync {
    /// Returns the solutions of `pattern`.
    ///
    /// The variables of the resulting sequence must be the variables of the pattern in subject,
    /// predicate, object order, each variable only occurring once (see
    /// [triple_pattern_variables](rdf_weave_model::triple_pattern_variables)).
    fn query_triple_pattern(
        &self,
        pattern: &TriplePattern,
    ) -> Result<SolutionSequence, StorageError>;

    /// Estimates the number of solutions of `pattern`.
    ///
    /// The estimate is not required to be accurate. However, ground patterns should estimate 0 or
    /// 1.
    fn estimate_cardinality(&self, pattern: &TriplePattern) -> u64;
}
