mod subscription;

use crate::error::ExecutionError;
use crate::ExecutionResult;
use futures::stream::BoxStream;
use futures::{stream, FutureExt, StreamExt, TryStreamExt};
use rdf_weave_model::{Row, Variable};
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::pin;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

pub use subscription::Subscription;

/// A pull-based, boxed source of rows.
pub type RowIter = Box<dyn Iterator<Item = ExecutionResult<Row>> + Send>;

/// A push-based, boxed source of rows.
pub type RowStream = BoxStream<'static, ExecutionResult<Row>>;

type RowGenerator = Arc<dyn Fn() -> RowIter + Send + Sync>;

/// The container of the rows produced by an evaluator.
///
/// A solution sequence carries an ordered list of variables and a production of rows that are
/// aligned with these variables. The same content can be consumed by pulling ([Self::iter]), by
/// materializing it ([Self::materialize]), or by having it pushed ([Self::stream],
/// [Self::subscribe]).
///
/// # Hot and Cold Sequences
///
/// A *cold* sequence restarts from the first row on every consumption. A *hot* sequence can only
/// be consumed once and every further consumption yields no rows. A hot sequence becomes cold once
/// it has been fully materialized with [Self::materialize] or [Self::collect].
///
/// # Truthiness
///
/// A sequence without variables is the result of an `ASK`-shaped evaluation. It holds at most one
/// zero-column row. The existence of this row indicates `true`.
pub struct SolutionSequence {
    variables: Arc<[Variable]>,
    source: Source,
    memo: OnceLock<Arc<[Row]>>,
}

enum Source {
    Materialized(Arc<[Row]>),
    Generator(RowGenerator),
    Iterator(Mutex<Option<RowIter>>),
    Stream(Mutex<Option<RowStream>>),
}

impl SolutionSequence {
    /// Creates a new cold sequence from already materialized rows.
    pub fn from_rows(variables: impl Into<Arc<[Variable]>>, rows: impl Into<Arc<[Row]>>) -> Self {
        Self::new(variables.into(), Source::Materialized(rows.into()))
    }

    /// Creates a new cold sequence from a generator. The generator is called once for every
    /// consumption of the sequence.
    pub fn from_generator<F>(variables: impl Into<Arc<[Variable]>>, generator: F) -> Self
    where
        F: Fn() -> RowIter + Send + Sync + 'static,
    {
        Self::new(variables.into(), Source::Generator(Arc::new(generator)))
    }

    /// Creates a new hot sequence from a pull-based iterator.
    pub fn from_row_iter<I>(variables: impl Into<Arc<[Variable]>>, iter: I) -> Self
    where
        I: Iterator<Item = ExecutionResult<Row>> + Send + 'static,
    {
        Self::new(
            variables.into(),
            Source::Iterator(Mutex::new(Some(Box::new(iter)))),
        )
    }

    /// Creates a new hot sequence from a stream.
    pub fn from_stream(variables: impl Into<Arc<[Variable]>>, stream: RowStream) -> Self {
        Self::new(variables.into(), Source::Stream(Mutex::new(Some(stream))))
    }

    /// Creates an empty sequence with the given variables.
    pub fn empty(variables: impl Into<Arc<[Variable]>>) -> Self {
        Self::from_rows(variables, Vec::<Row>::new())
    }

    /// Creates the sequence that contains a single zero-column row. This is the unit element of a
    /// join.
    pub fn identity() -> Self {
        Self::boolean(true)
    }

    /// Creates a zero-column sequence that holds one row iff `value` is true.
    pub fn boolean(value: bool) -> Self {
        let rows = if value { vec![Row::empty()] } else { Vec::new() };
        Self::from_rows(Vec::<Variable>::new(), rows)
    }

    fn new(variables: Arc<[Variable]>, source: Source) -> Self {
        Self {
            variables,
            source,
            memo: OnceLock::new(),
        }
    }

    /// Returns the variables of the rows in this sequence.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Returns a shared reference to the variables of this sequence.
    pub fn variables_arc(&self) -> Arc<[Variable]> {
        Arc::clone(&self.variables)
    }

    /// Returns true if this sequence can only be consumed once.
    pub fn is_hot(&self) -> bool {
        self.memo.get().is_none()
            && matches!(self.source, Source::Iterator(_) | Source::Stream(_))
    }

    /// Pulls the rows of this sequence.
    ///
    /// Pulling a hot stream-backed sequence blocks the current thread until the stream yields.
    pub fn iter(&self) -> RowIter {
        if let Some(rows) = self.memo.get() {
            return rows_iter(Arc::clone(rows));
        }

        match &self.source {
            Source::Materialized(rows) => rows_iter(Arc::clone(rows)),
            Source::Generator(generator) => generator(),
            Source::Iterator(iter) => take(iter).unwrap_or_else(|| Box::new(std::iter::empty())),
            Source::Stream(stream) => match take(stream) {
                None => Box::new(std::iter::empty()),
                Some(mut stream) => Box::new(std::iter::from_fn(move || wait(stream.next()))),
            },
        }
    }

    /// Returns the rows of this sequence as a stream.
    pub fn stream(&self) -> RowStream {
        if let Some(rows) = self.memo.get() {
            return stream::iter(rows_iter(Arc::clone(rows))).boxed();
        }

        match &self.source {
            Source::Materialized(rows) => stream::iter(rows_iter(Arc::clone(rows))).boxed(),
            Source::Generator(generator) => stream::iter(generator()).boxed(),
            Source::Iterator(iter) => match take(iter) {
                None => stream::empty().boxed(),
                Some(iter) => stream::iter(iter).boxed(),
            },
            Source::Stream(stream) => take(stream).unwrap_or_else(|| stream::empty().boxed()),
        }
    }

    /// Materializes the rows of this sequence.
    ///
    /// The result is memoized such that further consumptions of a hot sequence see the same rows.
    pub fn materialize(&self) -> ExecutionResult<Arc<[Row]>> {
        if let Some(rows) = self.memo.get() {
            return Ok(Arc::clone(rows));
        }
        if let Source::Materialized(rows) = &self.source {
            return Ok(Arc::clone(rows));
        }

        let rows = self.iter().collect::<ExecutionResult<Arc<[Row]>>>()?;
        Ok(Arc::clone(self.memo.get_or_init(|| rows)))
    }

    /// Asynchronously materializes the rows of this sequence. See [Self::materialize].
    pub async fn collect(&self) -> ExecutionResult<Arc<[Row]>> {
        if let Some(rows) = self.memo.get() {
            return Ok(Arc::clone(rows));
        }
        if let Source::Materialized(rows) = &self.source {
            return Ok(Arc::clone(rows));
        }

        let rows = self.stream().try_collect::<Vec<_>>().await?;
        Ok(Arc::clone(self.memo.get_or_init(|| rows.into())))
    }

    /// Returns true iff the sequence contains at least one row.
    ///
    /// At most one row is demanded from the underlying source. For hot sequences, the demanded row
    /// is retained such that a later consumption still observes it.
    pub fn ask_result(&self) -> ExecutionResult<bool> {
        if let Some(rows) = self.memo.get() {
            return Ok(!rows.is_empty());
        }

        match &self.source {
            Source::Materialized(rows) => Ok(!rows.is_empty()),
            Source::Generator(generator) => generator().next().transpose().map(|r| r.is_some()),
            Source::Iterator(iter) => {
                let mut guard = iter.lock().unwrap_or_else(PoisonError::into_inner);
                let Some(mut inner) = guard.take() else {
                    return Ok(false);
                };
                match inner.next() {
                    None => Ok(false),
                    Some(Err(error)) => Err(error),
                    Some(Ok(row)) => {
                        *guard = Some(Box::new(std::iter::once(Ok(row)).chain(inner)));
                        Ok(true)
                    }
                }
            }
            Source::Stream(_) => wait(self.ask()),
        }
    }

    /// Asynchronously computes the [Self::ask_result] of this sequence.
    pub async fn ask(&self) -> ExecutionResult<bool> {
        let Source::Stream(stream) = &self.source else {
            return self.ask_result();
        };
        if let Some(rows) = self.memo.get() {
            return Ok(!rows.is_empty());
        }

        let Some(mut inner) = take(stream) else {
            return Ok(false);
        };
        match inner.next().await {
            None => Ok(false),
            Some(Err(error)) => Err(error),
            Some(Ok(row)) => {
                let restored = stream::once(async { Ok(row) }).chain(inner).boxed();
                *stream.lock().unwrap_or_else(PoisonError::into_inner) = Some(restored);
                Ok(true)
            }
        }
    }

    /// Spawns a producer for the rows of this sequence on the current tokio runtime and returns a
    /// demand-driven [Subscription] to it.
    pub fn subscribe(&self) -> ExecutionResult<Subscription> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            ExecutionError::internal("Subscribing to a solution sequence requires a tokio runtime")
        })?;
        Ok(Subscription::spawn(
            &handle,
            self.variables_arc(),
            self.stream(),
        ))
    }
}

impl Debug for SolutionSequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            Source::Materialized(_) => "Materialized",
            Source::Generator(_) => "Generator",
            Source::Iterator(_) => "Iterator",
            Source::Stream(_) => "Stream",
        };
        f.debug_struct("SolutionSequence")
            .field("variables", &self.variables)
            .field("source", &source)
            .field("memoized", &self.memo.get().is_some())
            .finish()
    }
}

/// Resolves `future` on the current thread.
///
/// Futures that are ready on their first poll never enter an executor. Evaluators of both families
/// can therefore pull from each other at any depth, as long as no stage waits for another task.
fn wait<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    match future.as_mut().now_or_never() {
        Some(output) => output,
        None => futures::executor::block_on(future),
    }
}

fn take<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

fn rows_iter(rows: Arc<[Row]>) -> RowIter {
    Box::new((0..rows.len()).filter_map(move |i| rows.get(i).cloned().map(Ok)))
}
