use oxsdatatypes::ParseDecimalError;
use std::fmt::{Debug, Display, Formatter};
use std::num::{ParseFloatError, ParseIntError, TryFromIntError};
use std::str::ParseBoolError;
use thiserror::Error;

/// The result of evaluating an expression on a single solution.
pub type ThinResult<T> = Result<T, ThinError>;

/// An evaluation failure that carries no reason.
///
/// Expression errors never abort a query. A `FILTER` whose expression fails drops the solution and
/// a failed `BIND` leaves its variable unbound. As every failure is handled the same way, the
/// error does not record what went wrong.
#[derive(Clone, Copy, Debug, Default, Error, PartialEq, Eq)]
pub struct ThinError {}

impl ThinError {
    /// Creates a result with a [ThinError].
    pub fn expected<T>() -> ThinResult<T> {
        Err(ThinError::default())
    }
}

impl Display for ThinError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Expression evaluation failed.")
    }
}

/// Lexical forms that do not parse into their datatype are evaluation failures.
macro_rules! implement_from {
    ($t:ty) => {
        impl From<$t> for ThinError {
            fn from(_: $t) -> Self {
                ThinError::default()
            }
        }
    };
}

implement_from!(ParseBoolError);
implement_from!(ParseIntError);
implement_from!(ParseFloatError);
implement_from!(ParseDecimalError);
implement_from!(TryFromIntError);
