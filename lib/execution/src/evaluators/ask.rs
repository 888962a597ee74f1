use crate::evaluators::{pull_sequence, push_sequence, unexpected_node};
use crate::Dispatcher;
use futures::{stream, StreamExt};
use rdf_weave_common::{ExecutionResult, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Operator};
use rdf_weave_model::Row;

fn prepare(dispatcher: &Dispatcher, node: &AlgebraNodeRef) -> ExecutionResult<SolutionSequence> {
    let Operator::Ask(inner) = node.operator() else {
        return Err(unexpected_node(node));
    };
    dispatcher.execute(inner)
}

/// Reduces the inner sequence to a zero-column sequence that holds one row iff the inner sequence
/// is not empty. At most one inner row is demanded.
pub(super) fn pull_ask(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let inner = prepare(dispatcher, node)?;
    Ok(pull_sequence(node.variables_arc(), inner.is_hot(), move || {
        let row = inner.ask_result().map(|found| found.then(Row::empty));
        Box::new(row.transpose().into_iter())
    }))
}

pub(super) fn push_ask(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let inner = prepare(dispatcher, node)?;
    let stream = stream::once(async move { inner.ask().await })
        .filter_map(|found| async move { found.map(|found| found.then(Row::empty)).transpose() })
        .boxed();
    Ok(push_sequence(node.variables_arc(), stream))
}

/// Produces the single zero-column row.
pub(super) fn pull_identity(
    _dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    if !matches!(node.operator(), Operator::Identity) {
        return Err(unexpected_node(node));
    }
    Ok(SolutionSequence::identity())
}

pub(super) fn push_identity(
    _dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    if !matches!(node.operator(), Operator::Identity) {
        return Err(unexpected_node(node));
    }
    Ok(push_sequence(
        node.variables_arc(),
        stream::once(async { Ok(Row::empty()) }).boxed(),
    ))
}
