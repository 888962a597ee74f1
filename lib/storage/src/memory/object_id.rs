use std::fmt::{Display, Formatter};
use thiserror::Error;

/// The encoded representation of an RDF term in the [MemoryTripleStore](super::MemoryTripleStore).
///
/// Object ids are assigned in insertion order. The ordering of ids has no meaning besides making
/// them usable as keys of sorted indexes.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub(crate) struct ObjectId(u32);

impl ObjectId {
    pub(crate) const MIN: ObjectId = ObjectId(0);
    pub(crate) const MAX: ObjectId = ObjectId(u32::MAX);
}

impl From<u32> for ObjectId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
#[error("Object id {0} exceeds the id space of the store.")]
pub(crate) struct InvalidObjectIdError(u64);

impl TryFrom<u64> for ObjectId {
    type Error = InvalidObjectIdError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| InvalidObjectIdError(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_outside_u32_are_rejected() {
        assert_eq!(ObjectId::try_from(7_u64).unwrap(), ObjectId::from(7_u32));
        assert!(ObjectId::try_from(u64::from(u32::MAX) + 1).is_err());
    }
}
