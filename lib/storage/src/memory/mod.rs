//! An in-memory triple store.
mod object_id;
mod object_id_mapping;
mod store;

pub(crate) use object_id::ObjectId;
pub use store::MemoryTripleStore;
