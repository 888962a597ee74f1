use crate::example_triple;
use rdf_weave_common::TripleStore;
use rdf_weave_model::{NamedNode, TriplePattern, Variable};
use rdf_weave_storage::MemoryTripleStore;
use std::sync::Arc;

fn all_triples() -> TriplePattern {
    TriplePattern {
        subject: Variable::new_unchecked("s").into(),
        predicate: Variable::new_unchecked("p").into(),
        object: Variable::new_unchecked("o").into(),
    }
}

#[test]
fn empty_store_has_no_solutions() {
    let store = MemoryTripleStore::new();
    assert!(store.is_empty());

    let sequence = store.query_triple_pattern(&all_triples()).unwrap();
    assert_eq!(sequence.variables().len(), 3);
    assert!(sequence.materialize().unwrap().is_empty());
}

#[test]
fn returned_sequences_are_snapshots() {
    let store = MemoryTripleStore::new();
    store.insert(&example_triple("a")).unwrap();

    let sequence = store.query_triple_pattern(&all_triples()).unwrap();
    store.insert(&example_triple("b")).unwrap();

    assert_eq!(sequence.materialize().unwrap().len(), 1);
    assert_eq!(store.len(), 2);
}

#[test]
fn concurrent_inserts_are_not_lost() {
    let store = Arc::new(MemoryTripleStore::new());
    std::thread::scope(|scope| {
        for thread in 0..4 {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                for i in 0..100 {
                    store
                        .insert(&example_triple(&(i % 50 + thread * 10).to_string()))
                        .unwrap();
                }
            });
        }
    });
    // Threads insert the subjects 0..80 with overlaps.
    assert_eq!(store.len(), 80);
}

#[test]
fn estimates_follow_data() {
    let store = MemoryTripleStore::new();
    store
        .extend((0..10).map(|i| example_triple(&i.to_string())))
        .unwrap();

    let by_predicate = TriplePattern {
        subject: Variable::new_unchecked("s").into(),
        predicate: NamedNode::new_unchecked("http://example.com/predicate").into(),
        object: Variable::new_unchecked("o").into(),
    };
    assert_eq!(store.estimate_cardinality(&by_predicate), 10);
    assert_eq!(store.estimate_cardinality(&all_triples()), 10);
}
