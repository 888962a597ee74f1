use crate::error::ConfigurationError;
use crate::evaluators;
use crate::{Dispatcher, ExecutionConfig, ExecutionMode};
use rdf_weave_common::{ExecutionResult, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, NodeKind};
use rustc_hash::FxHashMap;

/// Evaluates a single node. Children are evaluated by calling back into the [Dispatcher].
pub type Evaluator = fn(&Dispatcher, &AlgebraNodeRef) -> ExecutionResult<SolutionSequence>;

/// Maps a node kind and an evaluator family to an [Evaluator].
#[derive(Clone, Debug, Default)]
pub struct EvaluatorRegistry {
    evaluators: FxHashMap<(NodeKind, ExecutionMode), Evaluator>,
}

impl EvaluatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that contains the pull and the push evaluator of every node kind.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        evaluators::register_builtin(&mut registry);
        registry
    }

    /// Registers `evaluator` for `kind` and `mode`. Returns the previously registered evaluator.
    pub fn register(
        &mut self,
        kind: NodeKind,
        mode: ExecutionMode,
        evaluator: Evaluator,
    ) -> Option<Evaluator> {
        self.evaluators.insert((kind, mode), evaluator)
    }

    /// Removes the evaluator of `kind` and `mode`.
    pub fn unregister(&mut self, kind: NodeKind, mode: ExecutionMode) -> Option<Evaluator> {
        self.evaluators.remove(&(kind, mode))
    }

    /// Returns the evaluator of `kind` and `mode`.
    pub fn get(&self, kind: NodeKind, mode: ExecutionMode) -> Option<Evaluator> {
        self.evaluators.get(&(kind, mode)).copied()
    }

    /// Returns the number of registered evaluators.
    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    /// Returns true if no evaluator is registered.
    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    /// Checks that every node kind has an evaluator for the family that `config` selects for it.
    pub fn validate(&self, config: &ExecutionConfig) -> Result<(), ConfigurationError> {
        for kind in NodeKind::ALL {
            let mode = config.mode(kind);
            if self.get(kind, mode).is_none() {
                return Err(ConfigurationError::MissingEvaluator { kind, mode });
            }
        }
        Ok(())
    }
}
