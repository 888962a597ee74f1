use rdf_weave_logical::NodeKind;
use rustc_hash::FxHashMap;

/// Defines which evaluator family evaluates a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExecutionMode {
    /// Rows are produced when the consumer iterates the sequence.
    #[default]
    Pull,
    /// Rows are produced as a stream that is driven by the demand of the consumer.
    Push,
}

/// Defines the container that rejects duplicate rows in `DISTINCT` and `REDUCED`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistinctStrategy {
    /// Remembers every accepted row. Removes all duplicates.
    Hash,
    /// Remembers the most recently accepted rows. Removes duplicates that are close to each other.
    Window(usize),
}

/// Defines how `MINUS` tests the rows of its left side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MinusStrategy {
    /// Specializes the right side for every left row and asks whether it has a solution.
    Bind,
    /// Materializes the right side once and probes it for every left row.
    #[default]
    Set,
}

/// Defines whether and how the operands of a join are reordered before execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JoinReorderingMode {
    /// Operands are evaluated in their declared order.
    Disabled,
    /// Operands are weighted by the shape of their triple patterns.
    #[default]
    Shape,
    /// Operands are weighted by the cardinality estimates of the store.
    Cardinality,
}

/// Options for the execution of algebra trees.
///
/// ```
/// use rdf_weave_execution::{DistinctStrategy, ExecutionConfig, ExecutionMode};
/// use rdf_weave_logical::NodeKind;
///
/// let config = ExecutionConfig::default()
///     .with_mode(NodeKind::Join, ExecutionMode::Push)
///     .with_distinct(DistinctStrategy::Window(16));
/// assert_eq!(config.mode(NodeKind::Join), ExecutionMode::Push);
/// assert_eq!(config.mode(NodeKind::Filter), ExecutionMode::Pull);
/// ```
#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    /// The evaluator family of all node kinds without an override.
    pub default_mode: ExecutionMode,
    /// Per-kind overrides of the evaluator family.
    pub modes: FxHashMap<NodeKind, ExecutionMode>,
    /// The strategy of `DISTINCT`.
    pub distinct: DistinctStrategy,
    /// The strategy of `REDUCED`.
    pub weak_distinct: DistinctStrategy,
    /// The strategy of `MINUS`.
    pub minus: MinusStrategy,
    /// The join reordering.
    pub join_reordering: JoinReorderingMode,
    /// Whether the dispatcher checks that every evaluator produces the variables of its node.
    pub check_output_variables: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_mode: ExecutionMode::default(),
            modes: FxHashMap::default(),
            distinct: DistinctStrategy::Hash,
            weak_distinct: DistinctStrategy::Window(1024),
            minus: MinusStrategy::default(),
            join_reordering: JoinReorderingMode::default(),
            check_output_variables: cfg!(debug_assertions),
        }
    }
}

impl ExecutionConfig {
    /// Returns the evaluator family of `kind`.
    pub fn mode(&self, kind: NodeKind) -> ExecutionMode {
        self.modes.get(&kind).copied().unwrap_or(self.default_mode)
    }

    /// Sets the evaluator family of all node kinds without an override.
    #[must_use]
    pub fn with_default_mode(mut self, mode: ExecutionMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Overrides the evaluator family of `kind`.
    #[must_use]
    pub fn with_mode(mut self, kind: NodeKind, mode: ExecutionMode) -> Self {
        self.modes.insert(kind, mode);
        self
    }

    /// Sets the strategy of `DISTINCT`.
    #[must_use]
    pub fn with_distinct(mut self, strategy: DistinctStrategy) -> Self {
        self.distinct = strategy;
        self
    }

    /// Sets the strategy of `REDUCED`.
    #[must_use]
    pub fn with_weak_distinct(mut self, strategy: DistinctStrategy) -> Self {
        self.weak_distinct = strategy;
        self
    }

    /// Sets the strategy of `MINUS`.
    #[must_use]
    pub fn with_minus(mut self, strategy: MinusStrategy) -> Self {
        self.minus = strategy;
        self
    }

    /// Sets the join reordering.
    #[must_use]
    pub fn with_join_reordering(mut self, mode: JoinReorderingMode) -> Self {
        self.join_reordering = mode;
        self
    }

    /// Enables or disables the output variable check of the dispatcher.
    #[must_use]
    pub fn with_output_variable_check(mut self, enabled: bool) -> Self {
        self.check_output_variables = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_take_precedence() {
        let config = ExecutionConfig::default()
            .with_default_mode(ExecutionMode::Push)
            .with_mode(NodeKind::Triple, ExecutionMode::Pull);
        assert_eq!(config.mode(NodeKind::Triple), ExecutionMode::Pull);
        assert_eq!(config.mode(NodeKind::Join), ExecutionMode::Push);
    }

    #[test]
    fn weak_distinct_uses_window_by_default() {
        let config = ExecutionConfig::default();
        assert_eq!(config.distinct, DistinctStrategy::Hash);
        assert_eq!(config.weak_distinct, DistinctStrategy::Window(1024));
        assert_eq!(config.minus, MinusStrategy::Set);
    }
}
