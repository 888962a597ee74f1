use crate::evaluators::{pull_sequence, push_sequence, unexpected_node};
use crate::Dispatcher;
use futures::{StreamExt, TryStreamExt};
use rdf_weave_common::{ExecutionResult, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Operator};
use rdf_weave_model::ColumnProjection;
use std::sync::Arc;

fn prepare(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<(SolutionSequence, Arc<ColumnProjection>)> {
    let Operator::Project { inner, .. } = node.operator() else {
        return Err(unexpected_node(node));
    };
    let inner = dispatcher.execute(inner)?;
    let projection = ColumnProjection::new(inner.variables(), node.variables());
    Ok((inner, Arc::new(projection)))
}

/// Selects the projected columns by position. Projected variables that the inner rows do not
/// have are unbound.
pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (inner, projection) = prepare(dispatcher, node)?;
    if projection.is_identity(inner.variables().len()) {
        return Ok(inner);
    }
    Ok(pull_sequence(node.variables_arc(), inner.is_hot(), move || {
        let projection = Arc::clone(&projection);
        Box::new(
            inner
                .iter()
                .map(move |row| row.map(|row| row.project(projection.indices()))),
        )
    }))
}

pub(super) fn push(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (inner, projection) = prepare(dispatcher, node)?;
    let stream = inner
        .stream()
        .map_ok(move |row| row.project(projection.indices()))
        .boxed();
    Ok(push_sequence(node.variables_arc(), stream))
}
