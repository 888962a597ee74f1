use crate::evaluators::{pull_sequence, push_sequence, unexpected_node};
use crate::Dispatcher;
use futures::{stream, StreamExt, TryStreamExt};
use rdf_weave_common::{ExecutionResult, RowIter, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Operator};
use rdf_weave_model::ColumnProjection;
use std::sync::Arc;

/// A child of a union together with the projection onto the variables of the union.
struct UnionInput {
    sequence: SolutionSequence,
    projection: Option<Arc<ColumnProjection>>,
}

impl UnionInput {
    fn iter(&self) -> RowIter {
        let rows = self.sequence.iter();
        match &self.projection {
            None => rows,
            Some(projection) => {
                let projection = Arc::clone(projection);
                Box::new(rows.map(move |row| row.map(|row| row.project(projection.indices()))))
            }
        }
    }
}

fn prepare(dispatcher: &Dispatcher, node: &AlgebraNodeRef) -> ExecutionResult<Vec<UnionInput>> {
    let Operator::Union(children) = node.operator() else {
        return Err(unexpected_node(node));
    };
    children
        .iter()
        .map(|child| {
            let sequence = dispatcher.execute(child)?;
            let projection = ColumnProjection::new(sequence.variables(), node.variables());
            let projection = (!projection.is_identity(sequence.variables().len()))
                .then(|| Arc::new(projection));
            Ok(UnionInput {
                sequence,
                projection,
            })
        })
        .collect()
}

/// Concatenates the rows of all children in the declared order of the children. The columns of
/// every child are rearranged to the variables of the union.
pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let inputs = prepare(dispatcher, node)?;
    let hot = inputs.iter().any(|i| i.sequence.is_hot());
    Ok(pull_sequence(node.variables_arc(), hot, move || {
        let rows = inputs.iter().map(UnionInput::iter).collect::<Vec<_>>();
        Box::new(rows.into_iter().flatten())
    }))
}

pub(super) fn push(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let streams = prepare(dispatcher, node)?
        .into_iter()
        .map(|input| {
            let rows = input.sequence.stream();
            match input.projection {
                None => rows,
                Some(projection) => rows
                    .map_ok(move |row| row.project(projection.indices()))
                    .boxed(),
            }
        })
        .collect::<Vec<_>>();
    Ok(push_sequence(
        node.variables_arc(),
        stream::iter(streams).flatten().boxed(),
    ))
}
