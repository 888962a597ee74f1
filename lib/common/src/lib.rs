pub mod error;
mod sequence;
mod store;

pub use sequence::{RowIter, RowStream, SolutionSequence, Subscription};
pub use store::TripleStore;

/// The result type of all evaluator operations.
pub type ExecutionResult<T> = Result<T, error::ExecutionError>;

/// The result type of storage operations.
pub type StorageResult<T> = Result<T, error::StorageError>;
