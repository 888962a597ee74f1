use crate::sequence::RowStream;
use crate::ExecutionResult;
use futures::{Stream, StreamExt};
use rdf_weave_model::{Row, Variable};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// A demand-driven consumer of a solution sequence whose rows are produced on a separate task.
///
/// The producer only pulls a row from the underlying sequence if the consumer has requested it via
/// [Self::request]. Cancelling (or dropping) the subscription stops the producer before its next
/// production step and releases the underlying sequence.
///
/// Using the subscription as a [Stream] requests one row whenever no demand is outstanding.
#[derive(Debug)]
pub struct Subscription {
    variables: Arc<[Variable]>,
    state: Arc<DemandState>,
    receiver: mpsc::UnboundedReceiver<ExecutionResult<Row>>,
    producer: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct DemandState {
    demand: AtomicUsize,
    cancelled: AtomicBool,
    notify: Notify,
}

impl Subscription {
    pub(super) fn spawn(handle: &Handle, variables: Arc<[Variable]>, stream: RowStream) -> Self {
        let state = Arc::new(DemandState::default());
        let (sender, receiver) = mpsc::unbounded_channel();
        let producer = handle.spawn(produce(stream, Arc::clone(&state), sender));
        Self {
            variables,
            state,
            receiver,
            producer,
        }
    }

    /// Returns the variables of the rows in this subscription.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Returns the number of rows that have been requested but not yet produced.
    pub fn outstanding_demand(&self) -> usize {
        self.state.demand.load(Ordering::Acquire)
    }

    /// Requests `n` further rows from the producer.
    pub fn request(&self, n: usize) {
        if n == 0 {
            return;
        }
        let previous = match self.state.demand.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |d| Some(d.saturating_add(n)),
        ) {
            Ok(previous) | Err(previous) => previous,
        };
        tracing::trace!("Requested {n} rows on top of {previous} outstanding rows.");
        self.state.notify.notify_one();
    }

    /// Stops the producer. Rows that have already been produced can still be received.
    pub fn cancel(&self) {
        let outstanding = self.outstanding_demand();
        if outstanding > 0 {
            tracing::warn!("Subscription cancelled with {outstanding} outstanding rows.");
        }
        self.stop();
    }

    /// Receives the next produced row. Returns [None] once the producer has finished.
    ///
    /// This does not request any rows.
    pub async fn recv(&mut self) -> Option<ExecutionResult<Row>> {
        self.receiver.recv().await
    }

    fn stop(&self) {
        self.state.cancelled.store(true, Ordering::Release);
        self.state.notify.notify_one();
        self.producer.abort();
    }
}

impl Stream for Subscription {
    type Item = ExecutionResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Poll::Ready(item) = self.receiver.poll_recv(cx) {
            return Poll::Ready(item);
        }

        if self.outstanding_demand() == 0 && !self.state.cancelled.load(Ordering::Acquire) {
            self.request(1);
        }
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn produce(
    mut stream: RowStream,
    state: Arc<DemandState>,
    sender: mpsc::UnboundedSender<ExecutionResult<Row>>,
) {
    loop {
        loop {
            if state.cancelled.load(Ordering::Acquire) {
                return;
            }
            if state.demand.load(Ordering::Acquire) > 0 {
                break;
            }
            state.notify.notified().await;
        }

        let Some(item) = stream.next().await else {
            return;
        };
        state.demand.fetch_sub(1, Ordering::AcqRel);

        let is_error = item.is_err();
        if sender.send(item).is_err() || is_error {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{ExecutionResult, SolutionSequence};
    use futures::TryStreamExt;
    use rdf_weave_model::{Literal, Row, Term, Variable};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_sequence(produced: Arc<AtomicUsize>, len: i64) -> SolutionSequence {
        SolutionSequence::from_row_iter(
            [Variable::new_unchecked("n")],
            (0..len).map(move |i| {
                produced.fetch_add(1, Ordering::SeqCst);
                Ok(Row::from(vec![Some(Term::from(Literal::from(i)))]))
            }),
        )
    }

    #[tokio::test]
    async fn producer_respects_demand() -> ExecutionResult<()> {
        let produced = Arc::new(AtomicUsize::new(0));
        let mut subscription = counting_sequence(Arc::clone(&produced), 100).subscribe()?;

        subscription.request(2);
        assert!(subscription.recv().await.is_some());
        assert!(subscription.recv().await.is_some());
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(produced.load(Ordering::SeqCst), 2);
        assert_eq!(subscription.outstanding_demand(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn cancel_stops_production() -> ExecutionResult<()> {
        let produced = Arc::new(AtomicUsize::new(0));
        let mut subscription = counting_sequence(Arc::clone(&produced), 100).subscribe()?;

        subscription.request(1);
        assert!(subscription.recv().await.is_some());
        subscription.cancel();

        assert!(subscription.recv().await.is_none());
        assert_eq!(produced.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn stream_requests_rows_on_demand() -> ExecutionResult<()> {
        let produced = Arc::new(AtomicUsize::new(0));
        let subscription = counting_sequence(Arc::clone(&produced), 5).subscribe()?;

        let rows = subscription.try_collect::<Vec<_>>().await?;
        assert_eq!(rows.len(), 5);
        assert_eq!(produced.load(Ordering::SeqCst), 5);
        Ok(())
    }

    #[tokio::test]
    async fn demand_saturates() -> ExecutionResult<()> {
        let produced = Arc::new(AtomicUsize::new(0));
        let subscription = counting_sequence(Arc::clone(&produced), 5).subscribe()?;

        subscription.request(usize::MAX);
        subscription.request(3);
        assert_eq!(subscription.outstanding_demand(), usize::MAX);
        Ok(())
    }

    #[test]
    fn subscribe_requires_runtime() {
        let sequence = SolutionSequence::identity();
        assert!(sequence.subscribe().is_err());
    }
}
