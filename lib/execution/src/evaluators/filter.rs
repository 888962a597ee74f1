use crate::evaluators::{pull_sequence, push_sequence, unexpected_node};
use crate::expression::PreparedExpression;
use crate::Dispatcher;
use futures::{future, StreamExt, TryStreamExt};
use rdf_weave_common::{ExecutionResult, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Operator};
use rdf_weave_model::Row;
use std::sync::Arc;

/// Drops the rows for which any of the expressions is not true.
struct FilterPlan {
    expressions: Vec<PreparedExpression>,
}

impl FilterPlan {
    fn accepts(&self, row: &Row) -> bool {
        self.expressions.iter().all(|e| e.is_true(row))
    }
}

fn prepare(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<(SolutionSequence, Arc<FilterPlan>)> {
    let Operator::Filter { inner, expressions } = node.operator() else {
        return Err(unexpected_node(node));
    };
    let inner = dispatcher.execute(inner)?;
    let expressions = expressions
        .iter()
        .map(|e| PreparedExpression::new(e.clone(), inner.variables()))
        .collect();
    Ok((inner, Arc::new(FilterPlan { expressions })))
}

pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (inner, plan) = prepare(dispatcher, node)?;
    Ok(pull_sequence(node.variables_arc(), inner.is_hot(), move || {
        let plan = Arc::clone(&plan);
        Box::new(
            inner
                .iter()
                .filter(move |row| row.as_ref().map_or(true, |row| plan.accepts(row))),
        )
    }))
}

pub(super) fn push(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (inner, plan) = prepare(dispatcher, node)?;
    let stream = inner
        .stream()
        .try_filter(move |row| future::ready(plan.accepts(row)))
        .boxed();
    Ok(push_sequence(node.variables_arc(), stream))
}
