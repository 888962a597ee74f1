//! Contains storage layer implementations for RDF Weave.
//!
//! The engine only requires a [TripleStore](rdf_weave_common::TripleStore) that answers single
//! triple patterns. [MemoryTripleStore] is an in-memory implementation that keeps three sorted
//! permutations of the encoded triples.

pub(crate) mod index;
pub mod memory;

pub use memory::MemoryTripleStore;
