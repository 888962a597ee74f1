//! The pull and push evaluators of every node kind.
//!
//! Each module implements the operator logic once and exposes a `pull` and a `push` evaluator
//! that adapt it to [RowIter] and [RowStream].

mod ask;
mod assign;
mod distinct;
mod exists;
mod filter;
mod join;
mod minus;
mod project;
mod slice;
mod triple;
mod union;
mod values;

use crate::{EvaluatorRegistry, ExecutionMode};
use futures::{future, Stream, StreamExt};
use rdf_weave_common::error::ExecutionError;
use rdf_weave_common::{ExecutionResult, RowIter, RowStream, SolutionSequence};
use rdf_weave_logical::{AlgebraNode, NodeKind};
use rdf_weave_model::{Row, Variable};
use std::sync::Arc;

pub use distinct::{create_set, RowSet};

/// Registers the pull and the push evaluator of every node kind.
pub(crate) fn register_builtin(registry: &mut EvaluatorRegistry) {
    use ExecutionMode::{Pull, Push};

    registry.register(NodeKind::Triple, Pull, triple::pull);
    registry.register(NodeKind::Triple, Push, triple::push);
    registry.register(NodeKind::Join, Pull, join::pull);
    registry.register(NodeKind::Join, Push, join::push);
    registry.register(NodeKind::LeftJoin, Pull, join::pull);
    registry.register(NodeKind::LeftJoin, Push, join::push);
    registry.register(NodeKind::Union, Pull, union::pull);
    registry.register(NodeKind::Union, Push, union::push);
    registry.register(NodeKind::Filter, Pull, filter::pull);
    registry.register(NodeKind::Filter, Push, filter::push);
    registry.register(NodeKind::Assign, Pull, assign::pull);
    registry.register(NodeKind::Assign, Push, assign::push);
    registry.register(NodeKind::Project, Pull, project::pull);
    registry.register(NodeKind::Project, Push, project::push);
    registry.register(NodeKind::Distinct, Pull, distinct::pull);
    registry.register(NodeKind::Distinct, Push, distinct::push);
    registry.register(NodeKind::WeakDistinct, Pull, distinct::pull);
    registry.register(NodeKind::WeakDistinct, Push, distinct::push);
    registry.register(NodeKind::Limit, Pull, slice::pull);
    registry.register(NodeKind::Limit, Push, slice::push);
    registry.register(NodeKind::Offset, Pull, slice::pull);
    registry.register(NodeKind::Offset, Push, slice::push);
    registry.register(NodeKind::Slice, Pull, slice::pull);
    registry.register(NodeKind::Slice, Push, slice::push);
    registry.register(NodeKind::Values, Pull, values::pull);
    registry.register(NodeKind::Values, Push, values::push);
    registry.register(NodeKind::Exists, Pull, exists::pull);
    registry.register(NodeKind::Exists, Push, exists::push);
    registry.register(NodeKind::NotExists, Pull, exists::pull);
    registry.register(NodeKind::NotExists, Push, exists::push);
    registry.register(NodeKind::Minus, Pull, minus::pull);
    registry.register(NodeKind::Minus, Push, minus::push);
    registry.register(NodeKind::Ask, Pull, ask::pull_ask);
    registry.register(NodeKind::Ask, Push, ask::push_ask);
    registry.register(NodeKind::Identity, Pull, ask::pull_identity);
    registry.register(NodeKind::Identity, Push, ask::push_identity);
}

/// Creates the result of a pull evaluator. The result is cold, and thus calls `generator` for
/// every consumption, unless one of its inputs is hot.
fn pull_sequence<F>(variables: Arc<[Variable]>, hot: bool, generator: F) -> SolutionSequence
where
    F: Fn() -> RowIter + Send + Sync + 'static,
{
    if hot {
        SolutionSequence::from_row_iter(variables, generator())
    } else {
        SolutionSequence::from_generator(variables, generator)
    }
}

/// Creates the result of a push evaluator.
fn push_sequence(variables: Arc<[Variable]>, stream: RowStream) -> SolutionSequence {
    SolutionSequence::from_stream(variables, stream)
}

/// Ends `iter` after its first error.
fn fuse_on_error<I>(iter: I) -> RowIter
where
    I: Iterator<Item = ExecutionResult<Row>> + Send + 'static,
{
    Box::new(iter.scan(false, |failed, item| {
        if *failed {
            return None;
        }
        *failed = item.is_err();
        Some(item)
    }))
}

/// Ends `stream` after its first error.
fn fuse_stream_on_error<S>(stream: S) -> RowStream
where
    S: Stream<Item = ExecutionResult<Row>> + Send + 'static,
{
    stream
        .scan(false, |failed, item| {
            let item = (!*failed).then_some(item);
            if let Some(item) = &item {
                *failed = item.is_err();
            }
            future::ready(item)
        })
        .boxed()
}

/// The error of an evaluator that has been registered for the wrong node kind.
fn unexpected_node(node: &AlgebraNode) -> ExecutionError {
    ExecutionError::internal(format!("Evaluator received unexpected node {}", node.kind()))
}

#[cfg(test)]
pub(crate) mod test_utils;
