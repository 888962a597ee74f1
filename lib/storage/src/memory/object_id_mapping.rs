use crate::memory::object_id::ObjectId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rdf_weave_common::error::{CorruptionError, StorageError};
use rdf_weave_model::Term;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicU64, Ordering};

/// A bidirectional mapping between RDF terms and [ObjectId]s.
///
/// Ids are never reused or removed. Concurrent writers that encode the same term observe the same
/// id.
#[derive(Debug, Default)]
pub(crate) struct MemoryObjectIdMapping {
    next_id: AtomicU64,
    id2term: DashMap<ObjectId, Term, BuildHasherDefault<FxHasher>>,
    term2id: DashMap<Term, ObjectId, BuildHasherDefault<FxHasher>>,
}

impl MemoryObjectIdMapping {
    /// Returns the id of `term`, assigning a new one if the term is not yet known.
    pub(crate) fn obtain_object_id(&self, term: &Term) -> Result<ObjectId, StorageError> {
        if let Some(object_id) = self.try_get_object_id(term) {
            return Ok(object_id);
        }

        match self.term2id.entry(term.clone()) {
            Entry::Occupied(entry) => Ok(*entry.get()),
            Entry::Vacant(entry) => {
                let next_id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let object_id = ObjectId::try_from(next_id)
                    .map_err(|error| StorageError::Other(Box::new(error)))?;
                self.id2term.insert(object_id, term.clone());
                entry.insert(object_id);
                Ok(object_id)
            }
        }
    }

    /// Returns the id of `term` if the term is known.
    pub(crate) fn try_get_object_id(&self, term: &Term) -> Option<ObjectId> {
        self.term2id.get(term).map(|entry| *entry.value())
    }

    /// Returns the term of `object_id`.
    pub(crate) fn decode(&self, object_id: ObjectId) -> Result<Term, StorageError> {
        self.id2term
            .get(&object_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CorruptionError::msg(format!("Unknown object id {object_id}")).into())
    }
}
