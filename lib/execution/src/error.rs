use crate::ExecutionMode;
use rdf_weave_logical::NodeKind;

/// An error in the setup of a [Dispatcher](crate::Dispatcher).
///
/// Configuration errors are detected when the dispatcher is initialized and never depend on the
/// evaluated query.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// The configured evaluator family of a node kind has no registered evaluator.
    #[error("No {mode:?} evaluator is registered for node kind {kind}")]
    MissingEvaluator { kind: NodeKind, mode: ExecutionMode },
}
