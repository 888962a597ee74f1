use crate::evaluators::join::plan::{FrameLayout, JoinPlan, JoinStep};
use crate::Dispatcher;
use futures::{ready, Stream, StreamExt};
use rdf_weave_common::error::ExecutionError;
use rdf_weave_common::{ExecutionResult, RowIter, RowStream, SolutionSequence};
use rdf_weave_logical::Binding;
use rdf_weave_model::Row;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A consumer-side view of a [SolutionSequence] that a [JoinChain] can drive.
pub(crate) trait RowSource: Send + Unpin + Sized {
    fn open(sequence: &SolutionSequence) -> Self;
}

impl RowSource for RowIter {
    fn open(sequence: &SolutionSequence) -> Self {
        sequence.iter()
    }
}

impl RowSource for RowStream {
    fn open(sequence: &SolutionSequence) -> Self {
        sequence.stream()
    }
}

struct Frame<S> {
    /// The combined row of all previous frames.
    upstream: Row,
    source: S,
    layout: FrameLayout,
    /// Whether the source has produced at least one row.
    matched: bool,
}

/// Evaluates a [JoinPlan] as a stack of frames.
///
/// Only the deepest frame is consumed. Every row of a frame opens the next frame with the
/// specialized operand of the next step. Once a frame is exhausted, it is popped and the frame
/// below resumes. After the first error, the chain is exhausted.
pub(crate) struct JoinChain<S> {
    dispatcher: Dispatcher,
    plan: Arc<JoinPlan>,
    bindings: Vec<Binding>,
    frames: Vec<Frame<S>>,
}

impl<S: RowSource> JoinChain<S> {
    /// Creates a new chain whose first frame consumes `head`.
    pub(crate) fn new(dispatcher: Dispatcher, plan: Arc<JoinPlan>, head: &SolutionSequence) -> Self {
        let bindings = plan.steps().iter().map(JoinStep::binding).collect();
        let layout = FrameLayout::head(plan.head().variables(), head.variables());
        let frame = Frame {
            upstream: Row::empty(),
            source: S::open(head),
            layout,
            matched: false,
        };
        Self {
            dispatcher,
            plan,
            bindings,
            frames: vec![frame],
        }
    }

    /// Processes an item of the deepest frame. Returns the item that the chain emits, if any.
    fn advance(&mut self, item: Option<ExecutionResult<Row>>) -> Option<ExecutionResult<Row>> {
        let depth = self.frames.len().checked_sub(1)?;
        match item {
            None => {
                let frame = self.frames.pop()?;
                if !frame.matched && self.plan.is_optional(depth) {
                    let count = self.plan.step(depth).map_or(0, JoinStep::new_variable_count);
                    return Some(Ok(self.plan.finish(frame.upstream.extend_unbound(count))));
                }
                None
            }
            Some(Err(error)) => {
                self.frames.clear();
                Some(Err(error))
            }
            Some(Ok(row)) => {
                let frame = self.frames.last_mut()?;
                frame.matched = true;
                let combined = frame.layout.combine(&frame.upstream, &row);
                if depth + 1 == self.plan.depth() {
                    return Some(Ok(self.plan.finish(combined)));
                }
                match self.open(depth + 1, combined) {
                    Ok(()) => None,
                    Err(error) => {
                        self.frames.clear();
                        Some(Err(error))
                    }
                }
            }
        }
    }

    /// Specializes the operand of frame `depth` with `upstream` and pushes the new frame.
    fn open(&mut self, depth: usize, upstream: Row) -> ExecutionResult<()> {
        let (Some(step), Some(binding)) = (
            self.plan.step(depth),
            depth.checked_sub(1).and_then(|i| self.bindings.get_mut(i)),
        ) else {
            return Err(ExecutionError::internal(format!(
                "Join frame {depth} has no operand"
            )));
        };

        let operand = step.specialize(binding, &upstream);
        let sequence = self.dispatcher.execute(&operand)?;
        let layout = FrameLayout::new(step, &upstream, sequence.variables());
        self.frames.push(Frame {
            upstream,
            source: S::open(&sequence),
            layout,
            matched: false,
        });
        Ok(())
    }
}

impl Iterator for JoinChain<RowIter> {
    type Item = ExecutionResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.frames.last_mut()?;
            let item = frame.source.next();
            if let Some(result) = self.advance(item) {
                return Some(result);
            }
        }
    }
}

impl Stream for JoinChain<RowStream> {
    type Item = ExecutionResult<Row>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let Some(frame) = this.frames.last_mut() else {
                return Poll::Ready(None);
            };
            let item = ready!(frame.source.poll_next_unpin(cx));
            if let Some(result) = this.advance(item) {
                return Poll::Ready(Some(result));
            }
        }
    }
}
