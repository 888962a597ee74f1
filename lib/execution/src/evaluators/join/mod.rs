//! Bind joins.
//!
//! The operands of a join are evaluated left to right. Every solution of the operands evaluated so
//! far is substituted into the next operand, which is then evaluated by the [Dispatcher]. This
//! avoids materializing any operand and lets selective operands restrict the following ones.

mod chain;
mod plan;

use crate::evaluators::{pull_sequence, push_sequence, unexpected_node};
use crate::Dispatcher;
use futures::StreamExt;
use rdf_weave_common::{ExecutionResult, RowIter, RowStream, SolutionSequence};
use rdf_weave_logical::{AlgebraNode, AlgebraNodeRef, Operator};
use std::sync::Arc;

pub(crate) use chain::JoinChain;
pub(crate) use plan::{JoinHead, JoinPlan};

fn prepare(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<(SolutionSequence, Arc<JoinPlan>)> {
    let plan = match node.operator() {
        Operator::Join(operands) => join_plan(dispatcher, node, operands),
        Operator::LeftJoin {
            left,
            right,
            expression,
        } => JoinPlan::new(
            JoinHead::Node(Arc::clone(left)),
            vec![Arc::clone(right)],
            true,
            expression.as_ref(),
            None,
        ),
        _ => return Err(unexpected_node(node)),
    };
    let head = plan.head().evaluate(|n| dispatcher.execute(n))?;
    Ok((head, Arc::new(plan)))
}

/// Plans an inner join. The operands are reordered if the dispatcher has a reorder strategy.
fn join_plan(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
    operands: &[AlgebraNodeRef],
) -> JoinPlan {
    let reordering = dispatcher
        .reorder_strategy()
        .and_then(|strategy| strategy.reorder(node));

    let (mut ordered, projection) = match reordering {
        None => (operands.to_vec(), None),
        Some(reordering) => {
            tracing::debug!(
                operands = operands.len(),
                order = ?reordering.permutation,
                "Reordered join operands"
            );
            let ordered = reordering
                .permutation
                .iter()
                .filter_map(|i| operands.get(*i))
                .cloned()
                .collect();
            (ordered, reordering.projection)
        }
    };

    let head = if ordered.is_empty() {
        AlgebraNode::identity()
    } else {
        ordered.remove(0)
    };
    JoinPlan::new(JoinHead::Node(head), ordered, false, None, projection)
}

/// Evaluates [Operator::Join] and [Operator::LeftJoin] as a bind join.
pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (head, plan) = prepare(dispatcher, node)?;
    let dispatcher = dispatcher.clone();
    Ok(pull_sequence(node.variables_arc(), head.is_hot(), move || {
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
