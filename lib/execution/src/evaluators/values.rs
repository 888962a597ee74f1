use crate::evaluators::join::{JoinChain, JoinHead, JoinPlan};
use crate::evaluators::{pull_sequence, push_sequence, unexpected_node};
use crate::Dispatcher;
use futures::StreamExt;
use rdf_weave_common::{ExecutionResult, RowIter, RowStream, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Operator};
use std::sync::Arc;

/// Joins the constant table with the inner node. Every table row is substituted into the inner
/// node, as in a bind join with the table as the first operand.
fn prepare(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<(SolutionSequence, Arc<JoinPlan>)> {
    let Operator::Values {
        inner,
        variables,
        rows,
    } = node.operator()
    else {
        return Err(unexpected_node(node));
    };

    let head = JoinHead::Table {
        variables: variables.as_slice().into(),
        rows: rows.as_slice().into(),
    };
    let operands = if matches!(inner.operator(), Operator::Identity) {
        Vec::new()
    } else {
        vec![Arc::clone(inner)]
    };
    let plan = JoinPlan::new(head, operands, false, None, None);
    let head = plan.head().evaluate(|n| dispatcher.execute(n))?;
    Ok((head, Arc::new(plan)))
}

pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (head, plan) = prepare(dispatcher, node)?;
    let dispatcher = dispatcher.clone();
    Ok(pull_sequence(node.variables_arc(), false, move || {
        Box::new(JoinChain::<RowIter>::new(
            dispatcher.clone(),
            Arc::clone(&plan),
            &head,
        ))
    }))
}

pub(super) fn push(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (head, plan) = prepare(dispatcher, node)?;
    let chain = JoinChain::<RowStream>::new(dispatcher.clone(), plan, &head);
    Ok(push_sequence(node.variables_arc(), chain.boxed()))
}
