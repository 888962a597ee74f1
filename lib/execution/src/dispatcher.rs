use crate::error::ConfigurationError;
use crate::{EvaluatorRegistry, ExecutionConfig, JoinReorderingMode};
use rdf_weave_common::error::ExecutionError;
use rdf_weave_common::{ExecutionResult, SolutionSequence, TripleStore};
use rdf_weave_logical::join::{
    CardinalityReorderStrategy, JoinReorderStrategy, ShapeReorderStrategy,
};
use rdf_weave_logical::AlgebraNodeRef;
use std::sync::{Arc, OnceLock};

/// Routes algebra nodes to their evaluators.
///
/// The dispatcher is cheap to clone and can be shared across threads. Evaluators receive the
/// dispatcher to evaluate the children of their node.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Debug)]
struct DispatcherInner {
    store: Arc<dyn TripleStore>,
    config: ExecutionConfig,
    registry: EvaluatorRegistry,
    reorder_strategy: Option<Arc<dyn JoinReorderStrategy>>,
    initialized: OnceLock<Result<(), ConfigurationError>>,
}

impl Dispatcher {
    /// Creates a new [Dispatcher] with the builtin evaluators.
    pub fn new(store: Arc<dyn TripleStore>, config: ExecutionConfig) -> Self {
        Self::with_registry(store, config, EvaluatorRegistry::builtin())
    }

    /// Creates a new [Dispatcher] that uses the evaluators of `registry`.
    ///
    /// The registry is validated lazily on the first call to [Self::init] or [Self::execute].
    pub fn with_registry(
        store: Arc<dyn TripleStore>,
        config: ExecutionConfig,
        registry: EvaluatorRegistry,
    ) -> Self {
        let reorder_strategy: Option<Arc<dyn JoinReorderStrategy>> = match config.join_reordering
        {
            JoinReorderingMode::Disabled => None,
            JoinReorderingMode::Shape => Some(Arc::new(ShapeReorderStrategy)),
            JoinReorderingMode::Cardinality => Some(Arc::new(CardinalityReorderStrategy::new(
                Arc::clone(&store),
            ))),
        };
        Self {
            inner: Arc::new(DispatcherInner {
                store,
                config,
                registry,
                reorder_strategy,
                initialized: OnceLock::new(),
            }),
        }
    }

    /// Validates the evaluator registry against the configuration.
    ///
    /// The validation runs once. Further calls return the result of the first validation.
    pub fn init(&self) -> Result<(), ConfigurationError> {
        self.inner
            .initialized
            .get_or_init(|| {
                let result = self.inner.registry.validate(&self.inner.config);
                if result.is_ok() {
                    tracing::debug!(
                        evaluators = self.inner.registry.len(),
                        default_mode = ?self.inner.config.default_mode,
                        overrides = ?self.inner.config.modes,
                        "Evaluator registry initialized"
                    );
                }
                result
            })
            .clone()
    }

    /// Evaluates `node`.
    ///
    /// The variables of the returned sequence are equal to [AlgebraNode::variables](rdf_weave_logical::AlgebraNode::variables).
    pub fn execute(&self, node: &AlgebraNodeRef) -> ExecutionResult<SolutionSequence> {
        self.init()
            .map_err(|error| ExecutionError::internal(format!("Invalid configuration: {error}")))?;

        let kind = node.kind();
        let mode = self.inner.config.mode(kind);
        tracing::trace!(%kind, ?mode, "Dispatching node");

        let evaluator = self.inner.registry.get(kind, mode).ok_or_else(|| {
            ExecutionError::internal(format!("No {mode:?} evaluator for node kind {kind}"))
        })?;
        let sequence = evaluator(self, node)?;

        if self.inner.config.check_output_variables && sequence.variables() != node.variables() {
            return Err(ExecutionError::internal(format!(
                "Evaluator of {kind} produced variables {:?} instead of {:?}",
                sequence.variables(),
                node.variables()
            )));
        }
        Ok(sequence)
    }

    /// Returns the storage that answers triple patterns.
    pub fn store(&self) -> &dyn TripleStore {
        self.inner.store.as_ref()
    }

    /// Returns the configuration of this dispatcher.
    pub fn config(&self) -> &ExecutionConfig {
        &self.inner.config
    }

    /// Returns the strategy that reorders join operands, if reordering is enabled.
    pub(crate) fn reorder_strategy(&self) -> Option<&dyn JoinReorderStrategy> {
        self.inner.reorder_strategy.as_deref()
    }
}
