use crate::evaluators::{
    fuse_on_error, fuse_stream_on_error, pull_sequence, push_sequence, unexpected_node,
};
use crate::Dispatcher;
use futures::TryStreamExt;
use rdf_weave_common::error::ExecutionError;
use rdf_weave_common::{ExecutionResult, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Binding, Operator};
use rdf_weave_model::{Row, Variable};
use std::sync::Arc;

/// Tests every outer row against the inner node.
///
/// All outer variables are substituted into the inner node. An outer row is kept iff the
/// specialized inner node has a solution ([Operator::Exists]) or has none ([Operator::NotExists]).
struct ExistsPlan {
    inner: AlgebraNodeRef,
    outer_variables: Arc<[Variable]>,
    positions: Vec<usize>,
    keep_if_found: bool,
}

impl ExistsPlan {
    fn binding(&self) -> Binding {
        Binding::new(Arc::clone(&self.outer_variables))
    }

    fn specialize(&self, binding: &mut Binding, row: &Row) -> AlgebraNodeRef {
        binding.load(row, &self.positions);
        binding.apply(&self.inner)
    }

    fn accepts(
        &self,
        dispatcher: &Dispatcher,
        binding: &mut Binding,
        row: &Row,
    ) -> ExecutionResult<bool> {
        let inner = self.specialize(binding, row);
        let found = dispatcher.execute(&inner)?.ask_result()?;
        Ok(found == self.keep_if_found)
    }
}

fn prepare(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<(SolutionSequence, Arc<ExistsPlan>)> {
    let (outer, inner, keep_if_found) = match node.operator() {
        Operator::Exists { outer, inner } => (outer, inner, true),
        Operator::NotExists { outer, inner } => (outer, inner, false),
        _ => return Err(unexpected_node(node)),
    };
    let plan = ExistsPlan {
        inner: Arc::clone(inner),
        outer_variables: outer.variables_arc(),
        positions: (0..outer.variables().len()).collect(),
        keep_if_found,
    };
    Ok((dispatcher.execute(outer)?, Arc::new(plan)))
}

pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (outer, plan) = prepare(dispatcher, node)?;
    let dispatcher = dispatcher.clone();
    Ok(pull_sequence(node.variables_arc(), outer.is_hot(), move || {
        let plan = Arc::clone(&plan);
        let dispatcher = dispatcher.clone();
        let mut binding = plan.binding();
        fuse_on_error(outer.iter().filter_map(move |row| {
            let row = match row {
                Ok(row) => row,
                Err(error) => return Some(Err(error)),
            };
            match plan.accepts(&dispatcher, &mut binding, &row) {
                Ok(true) => Some(Ok(row)),
                Ok(false) => None,
                Err(error) => Some(Err(error)),
            }
        }))
    }))
}

pub(super) fn push(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (outer, plan) = prepare(dispatcher, node)?;
    let dispatcher = dispatcher.clone();
    let mut binding = plan.binding();
    let stream = outer.stream().try_filter_map(move |row| {
        let inner = plan.specialize(&mut binding, &row);
        let dispatcher = dispatcher.clone();
        let keep_if_found = plan.keep_if_found;
        async move {
            let sequence = dispatcher.execute(&inner)?;
            let found = sequence.ask().await?;
            Ok::<_, ExecutionError>((found == keep_if_found).then_some(row))
        }
    });
    Ok(push_sequence(node.variables_arc(), fuse_stream_on_error(stream)))
}
