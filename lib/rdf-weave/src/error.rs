use rdf_weave_common::error::ExecutionError;
use rdf_weave_execution::ConfigurationError;
use rdf_weave_logical::LoweringError;
use spargebra::SparqlSyntaxError;

/// An error raised while evaluating a query with a [QueryEngine](crate::QueryEngine).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error in SPARQL parsing.
    #[error(transparent)]
    Parsing(#[from] SparqlSyntaxError),
    /// The query uses a construct that cannot be evaluated by the engine.
    #[error(transparent)]
    Lowering(#[from] LoweringError),
    /// An error raised while producing the solutions.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    /// The engine has been set up with an invalid configuration.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
