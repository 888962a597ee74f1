use crate::evaluators::{
    fuse_on_error, fuse_stream_on_error, pull_sequence, push_sequence, unexpected_node,
};
use crate::Dispatcher;
use futures::{stream, StreamExt};
use rdf_weave_common::{ExecutionResult, RowIter, SolutionSequence};
use rdf_weave_logical::{AlgebraNodeRef, Operator};
use rdf_weave_model::Row;

/// The rows to skip and the maximum number of rows to return.
#[derive(Clone, Copy)]
struct SlicePlan {
    offset: usize,
    limit: Option<usize>,
}

impl SlicePlan {
    /// Decides the fate of the next inner item. Returns [None] if the item is skipped. Errors are
    /// never skipped and do not count as rows.
    fn admit(&mut self, item: ExecutionResult<Row>) -> Option<ExecutionResult<Row>> {
        if item.is_ok() {
            if self.offset > 0 {
                self.offset -= 1;
                return None;
            }
            if let Some(limit) = &mut self.limit {
                *limit -= 1;
            }
        }
        Some(item)
    }

    /// Returns true once the limit has been reached.
    fn exhausted(&self) -> bool {
        self.limit == Some(0)
    }
}

/// Applies a [SlicePlan] to an iterator without demanding rows after the limit.
struct SliceIter<I> {
    inner: I,
    plan: SlicePlan,
}

impl<I: Iterator<Item = ExecutionResult<Row>>> Iterator for SliceIter<I> {
    type Item = ExecutionResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.plan.exhausted() {
            if let Some(item) = self.plan.admit(self.inner.next()?) {
                return Some(item);
            }
        }
        None
    }
}

fn prepare(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<(SolutionSequence, SlicePlan)> {
    let (inner, plan) = match node.operator() {
        Operator::Limit { inner, limit } => (
            inner,
            SlicePlan {
                offset: 0,
                limit: Some(*limit),
            },
        ),
        Operator::Offset { inner, offset } => (
            inner,
            SlicePlan {
                offset: *offset,
                limit: None,
            },
        ),
        Operator::Slice {
            inner,
            offset,
            limit,
        } => (
            inner,
            SlicePlan {
                offset: *offset,
                limit: *limit,
            },
        ),
        _ => return Err(unexpected_node(node)),
    };
    Ok((dispatcher.execute(inner)?, plan))
}

/// Implements `LIMIT`, `OFFSET` and their combination. Rows after the limit are never demanded
/// from the inner sequence.
pub(super) fn pull(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (inner, plan) = prepare(dispatcher, node)?;
    Ok(pull_sequence(node.variables_arc(), inner.is_hot(), move || {
        let rows: RowIter = Box::new(SliceIter {
            inner: inner.iter(),
            plan,
        });
        fuse_on_error(rows)
    }))
}

pub(super) fn push(
    dispatcher: &Dispatcher,
    node: &AlgebraNodeRef,
) -> ExecutionResult<SolutionSequence> {
    let (inner, plan) = prepare(dispatcher, node)?;
    let rows = stream::unfold((inner.stream(), plan), |(mut rows, mut plan)| async move {
        while !plan.exhausted() {
            if let Some(item) = plan.admit(rows.next().await?) {
                return Some((item, (rows, plan)));
            }
        }
        None
    });
    Ok(push_sequence(
        node.variables_arc(),
        fuse_stream_on_error(rows),
    ))
}
