use crate::evaluators::{push_sequence, unexpected_node};
use crate::Dispatcher;
use rdf_weave_common::{ExecutionResult, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Operator};

/// Looks up the triple pattern in the store. The sequence of the store is returned unchanged.
pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let Operator::Triple(pattern) = node.operator() else {
        return Err(unexpected_node(node));
    };
    Ok(dispatcher.store().query_triple_pattern(pattern)?)
}

/// Looks up the triple pattern in the store and pushes its rows.
pub(super) fn push(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let sequence = pull(dispatcher, node)?;
    Ok(push_sequence(sequence.variables_arc(), sequence.stream()))
}
