//! The entry point for evaluating SPARQL queries.
//!
//! A [QueryEngine] parses a query with [spargebra], lowers it into an algebra tree, and evaluates
//! the tree with a [Dispatcher].
//!
//! ```
//! use rdf_weave::model::{NamedNode, Triple};
//! use rdf_weave::storage::MemoryTripleStore;
//! use rdf_weave::{ExecutionConfig, ExecutionMode, QueryEngine, QueryResults};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = MemoryTripleStore::new();
//! let ex = NamedNode::new("http://example.com")?;
//! store.insert(&Triple::new(ex.clone(), ex.clone(), ex.clone()))?;
//!
//! let config = ExecutionConfig::default().with_default_mode(ExecutionMode::Push);
//! let engine = QueryEngine::new(Arc::new(store), config)?;
//!
//! if let QueryResults::Solutions(solutions) = engine.query("SELECT ?s WHERE { ?s ?p ?o }")? {
//!     let mut rows = solutions.stream();
//!     assert_eq!(rows.next().await.transpose()?.and_then(|r| r.get(0).cloned()), Some(ex.into()));
//! }
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! # }).unwrap();
//! ```

use crate::error::QueryEvaluationError;
use rdf_weave_common::{SolutionSequence, TripleStore};
use rdf_weave_execution::{Dispatcher, EvaluatorRegistry, ExecutionConfig};
use rdf_weave_logical::{lower_query, AlgebraNodeRef};
use spargebra::Query;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// The results of a query.
pub enum QueryResults {
    /// The solutions of a `SELECT` query.
    ///
    /// The sequence can be pulled ([SolutionSequence::iter]), streamed
    /// ([SolutionSequence::stream]), or consumed on demand ([SolutionSequence::subscribe]).
    Solutions(SolutionSequence),
    /// The result of an `ASK` query.
    Boolean(bool),
}

impl Debug for QueryResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryResults::Solutions(solutions) => f
                .debug_tuple("Solutions")
                .field(&solutions.variables())
                .finish(),
            QueryResults::Boolean(value) => f.debug_tuple("Boolean").field(value).finish(),
        }
    }
}

impl From<SolutionSequence> for QueryResults {
    fn from(value: SolutionSequence) -> Self {
        QueryResults::Solutions(value)
    }
}

impl From<bool> for QueryResults {
    fn from(value: bool) -> Self {
        QueryResults::Boolean(value)
    }
}

/// Evaluates SPARQL queries against a [TripleStore].
///
/// The engine is cheap to clone. Clones share the store and the evaluator registry.
#[derive(Clone, Debug)]
pub struct QueryEngine {
    dispatcher: Dispatcher,
}

impl QueryEngine {
    /// Creates a new [QueryEngine] with the builtin evaluators.
    ///
    /// Returns an error if `config` selects an evaluator family that is not registered for some
    /// node kind.
    pub fn new(
        store: Arc<dyn TripleStore>,
        config: ExecutionConfig,
    ) -> Result<Self, QueryEvaluationError> {
        Self::with_registry(store, config, EvaluatorRegistry::builtin())
    }

    /// Creates a new [QueryEngine] that evaluates nodes with the evaluators of `registry`.
    pub fn with_registry(
        store: Arc<dyn TripleStore>,
        config: ExecutionConfig,
        registry: EvaluatorRegistry,
    ) -> Result<Self, QueryEvaluationError> {
        let dispatcher = Dispatcher::with_registry(store, config, registry);
        dispatcher.init()?;
        Ok(Self { dispatcher })
    }

    /// Returns the dispatcher that evaluates the algebra trees of this engine.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Parses and evaluates a `SELECT` or `ASK` query.
    ///
    /// The solutions of a `SELECT` query are produced lazily while the returned sequence is
    /// consumed. An `ASK` query is answered immediately and demands at most one solution.
    pub fn query(&self, query: &str) -> Result<QueryResults, QueryEvaluationError> {
        let query = Query::parse(query, None)?;
        self.query_parsed(&query)
    }

    /// Evaluates an already parsed query. See [Self::query].
    pub fn query_parsed(&self, query: &Query) -> Result<QueryResults, QueryEvaluationError> {
        let node = lower_query(query)?;
        tracing::debug!(plan = %node, "Lowered query");

        let sequence = self.execute(&node)?;
        match query {
            Query::Ask { .. } => Ok(QueryResults::Boolean(sequence.ask_result()?)),
            _ => Ok(QueryResults::Solutions(sequence)),
        }
    }

    /// Evaluates an algebra tree.
    pub fn execute(&self, node: &AlgebraNodeRef) -> Result<SolutionSequence, QueryEvaluationError> {
        Ok(self.dispatcher.execute(node)?)
    }
}
