use crate::evaluators::{pull_sequence, push_sequence, unexpected_node};
use crate::expression::PreparedExpression;
use crate::Dispatcher;
use futures::{StreamExt, TryStreamExt};
use rdf_weave_common::{ExecutionResult, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Operator};
use rdf_weave_model::{position_of, Row};
use std::sync::Arc;

/// Writes the value of an expression into one column. The column is appended if the inner rows do
/// not have it. A failing expression leaves the column unbound.
struct AssignPlan {
    expression: PreparedExpression,
    position: usize,
}

impl AssignPlan {
    fn apply(&self, row: &Row) -> Row {
        row.with_term(self.position, self.expression.evaluate(row).ok())
    }
}

fn prepare(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<(SolutionSequence, Arc<AssignPlan>)> {
    let Operator::Assign {
        inner,
        variable,
        expression,
    } = node.operator()
    else {
        return Err(unexpected_node(node));
    };
    let inner = dispatcher.execute(inner)?;
    let plan = AssignPlan {
        expression: PreparedExpression::new(expression.clone(), inner.variables()),
        position: position_of(inner.variables(), variable).unwrap_or(inner.variables().len()),
    };
    Ok((inner, Arc::new(plan)))
}

pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (inner, plan) = prepare(dispatcher, node)?;
    Ok(pull_sequence(node.variables_arc(), inner.is_hot(), move || {
        let plan = Arc::clone(&plan);
        Box::new(inner.iter().map(move |row| row.map(|row| plan.apply(&row))))
    }))
}

pub(super) fn push(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (inner, plan) = prepare(dispatcher, node)?;
    let stream = inner.stream().map_ok(move |row| plan.apply(&row)).boxed();
    Ok(push_sequence(node.variables_arc(), stream))
}
