#![doc(test(attr(deny(warnings))))]

//! This crate defines the operator execution engine of RDF Weave.
//!
//! # Dispatching
//!
//! The [Dispatcher] is the entry point of the engine. It resolves the [NodeKind](rdf_weave_logical::NodeKind)
//! of an algebra node and the configured [ExecutionMode] to an evaluator from the
//! [EvaluatorRegistry] and invokes it. Evaluators recursively dispatch their children, bottoming
//! out at triple-pattern lookups against the [TripleStore](rdf_weave_common::TripleStore).
//!
//! ```text
//! AlgebraNode -> Dispatcher -> Evaluator (Pull | Push) -> SolutionSequence
//! ```
//!
//! # Pull and Push
//!
//! Every node kind has two evaluators. The pull family produces rows when the consumer iterates.
//! The push family produces a stream of rows that can be consumed asynchronously or through a
//! demand-driven [Subscription](rdf_weave_common::Subscription). Both families produce the same
//! multiset of rows and share their operator logic. The active family is configured per node
//! kind in the [ExecutionConfig].
//!
//! # Joins
//!
//! `JOIN` and `LEFT_JOIN` are evaluated as bind joins. Each operand after the first is specialized
//! with the values of the upstream row (see [AlgebraNode::bind](rdf_weave_logical::AlgebraNode::bind))
//! and evaluated once per upstream row. Before execution, the operands of a join are reordered by
//! a [JoinReorderStrategy](rdf_weave_logical::join::JoinReorderStrategy).

mod config;
mod dispatcher;
mod error;
mod evaluators;
mod expression;
mod registry;

pub use config::{
    DistinctStrategy, ExecutionConfig, ExecutionMode, JoinReorderingMode, MinusStrategy,
};
pub use dispatcher::Dispatcher;
pub use error::ConfigurationError;
pub use evaluators::{create_set, RowSet};
pub use registry::{Evaluator, EvaluatorRegistry};
