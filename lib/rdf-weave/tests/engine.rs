#![cfg(test)]
#![allow(clippy::panic_in_result_fn)]

use futures::StreamExt;
use rdf_weave::common::SolutionSequence;
use rdf_weave::error::QueryEvaluationError;
use rdf_weave::execution::EvaluatorRegistry;
use rdf_weave::logical::{AlgebraBuilder, AlgebraNode};
use rdf_weave::model::{Literal, NamedNode, Row, Triple, TriplePattern, Variable};
use rdf_weave::storage::MemoryTripleStore;
use rdf_weave::{ExecutionConfig, ExecutionMode, MinusStrategy, QueryEngine, QueryResults};
use std::error::Error;
use std::sync::Arc;

const PREFIX: &str = "PREFIX ex: <http://example.com/>\n";

fn ex(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{name}"))
}

fn store() -> Result<MemoryTripleStore, Box<dyn Error>> {
    let store = MemoryTripleStore::new();
    let mut triples = vec![
        Triple::new(ex("alice"), ex("knows"), ex("bob")),
        Triple::new(ex("bob"), ex("knows"), ex("carol")),
    ];
    for (person, name, age) in [("alice", "Alice", 30), ("bob", "Bob", 25), ("carol", "Carol", 41)]
    {
        triples.push(Triple::new(
            ex(person),
            ex("name"),
            Literal::new_simple_literal(name),
        ));
        triples.push(Triple::new(ex(person), ex("age"), Literal::from(age)));
    }
    store.extend(triples)?;
    Ok(store)
}

fn engine(config: ExecutionConfig) -> Result<QueryEngine, Box<dyn Error>> {
    Ok(QueryEngine::new(Arc::new(store()?), config)?)
}

/// Renders the rows of `solutions` as sorted lines.
fn render(solutions: &SolutionSequence, rows: &[Row]) -> String {
    let mut lines = rows
        .iter()
        .map(|row| {
            solutions
                .variables()
                .iter()
                .zip(row.iter())
                .map(|(variable, term)| match term {
                    Some(term) => format!("{variable}={term}"),
                    None => format!("{variable}=UNDEF"),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>();
    lines.sort();
    lines.join("\n")
}

fn select(engine: &QueryEngine, query: &str) -> Result<String, Box<dyn Error>> {
    let QueryResults::Solutions(solutions) = engine.query(&format!("{PREFIX}{query}"))? else {
        panic!("expected solutions");
    };
    let rows = solutions.materialize()?;
    Ok(render(&solutions, &rows))
}

fn ask(engine: &QueryEngine, query: &str) -> Result<bool, Box<dyn Error>> {
    let QueryResults::Boolean(value) = engine.query(&format!("{PREFIX}{query}"))? else {
        panic!("expected a boolean");
    };
    Ok(value)
}

const MODES: [ExecutionMode; 2] = [ExecutionMode::Pull, ExecutionMode::Push];

#[test]
fn select_projects_variables() -> Result<(), Box<dyn Error>> {
    let engine = engine(ExecutionConfig::default())?;
    insta::assert_snapshot!(
        select(&engine, "SELECT ?name WHERE { ?p ex:knows ?f . ?f ex:name ?name }")?,
        @r#"
    ?name="Bob"
    ?name="Carol"
    "#
    );
    Ok(())
}

#[test]
fn ask_answers_boolean() -> Result<(), Box<dyn Error>> {
    for mode in MODES {
        let engine = engine(ExecutionConfig::default().with_default_mode(mode))?;
        assert!(ask(&engine, "ASK { ex:alice ex:knows ex:bob }")?);
        assert!(!ask(&engine, "ASK { ex:bob ex:knows ex:alice }")?);
        assert!(ask(&engine, "ASK { ?a ex:knows ?b . ?b ex:knows ?c }")?);
    }
    Ok(())
}

#[test]
fn optional_keeps_people_without_friends() -> Result<(), Box<dyn Error>> {
    let query = "SELECT ?p ?f WHERE { ?p ex:name ?n OPTIONAL { ?p ex:knows ?f } }";
    let [pulled, pushed] = MODES.map(|mode| {
        engine(ExecutionConfig::default().with_default_mode(mode))
            .and_then(|engine| select(&engine, query))
            .map_err(|error| error.to_string())
    });
    assert_eq!(pulled, pushed);
    insta::assert_snapshot!(pulled?, @r"
    ?p=<http://example.com/alice> ?f=<http://example.com/bob>
    ?p=<http://example.com/bob> ?f=<http://example.com/carol>
    ?p=<http://example.com/carol> ?f=UNDEF
    ");
    Ok(())
}

#[test]
fn filter_not_exists_and_minus_agree() -> Result<(), Box<dyn Error>> {
    for mode in MODES {
        for strategy in [MinusStrategy::Bind, MinusStrategy::Set] {
            let config = ExecutionConfig::default()
                .with_default_mode(mode)
                .with_minus(strategy);
            let engine = engine(config)?;
            let not_exists = select(
                &engine,
                "SELECT ?p WHERE { ?p ex:name ?n FILTER NOT EXISTS { ?p ex:knows ?f } }",
            )?;
            let minus = select(
                &engine,
                "SELECT ?p WHERE { ?p ex:name ?n MINUS { ?p ex:knows ?f } }",
            )?;
            assert_eq!(not_exists, "?p=<http://example.com/carol>");
            assert_eq!(minus, not_exists);
        }
    }
    Ok(())
}

#[test]
fn numeric_filter() -> Result<(), Box<dyn Error>> {
    let engine = engine(ExecutionConfig::default())?;
    insta::assert_snapshot!(
        select(&engine, "SELECT ?p WHERE { ?p ex:age ?a FILTER(?a > 28 && ?a < 100) }")?,
        @r"
    ?p=<http://example.com/alice>
    ?p=<http://example.com/carol>
    "
    );
    Ok(())
}

#[test]
fn distinct_and_limit() -> Result<(), Box<dyn Error>> {
    let engine = engine(ExecutionConfig::default())?;
    assert_eq!(
        select(&engine, "SELECT DISTINCT ?p WHERE { ?p ?x ?y }")?
            .lines()
            .count(),
        3
    );
    assert_eq!(
        select(&engine, "SELECT ?p WHERE { ?p ?x ?y } LIMIT 2")?
            .lines()
            .count(),
        2
    );
    Ok(())
}

#[test]
fn execute_evaluates_algebra_trees() -> Result<(), Box<dyn Error>> {
    let engine = engine(ExecutionConfig::default())?;
    let node = AlgebraNode::triple(TriplePattern {
        subject: ex("alice").into(),
        predicate: ex("knows").into(),
        object: Variable::new("friend")?.into(),
    });
    let solutions = engine.execute(&AlgebraBuilder::new(node).ask().build())?;
    assert!(solutions.ask_result()?);
    Ok(())
}

#[tokio::test]
async fn solutions_can_be_streamed() -> Result<(), Box<dyn Error>> {
    let engine = engine(ExecutionConfig::default().with_default_mode(ExecutionMode::Push))?;
    let QueryResults::Solutions(solutions) =
        engine.query(&format!("{PREFIX}SELECT ?n WHERE {{ ?p ex:name ?n }}"))?
    else {
        panic!("expected solutions");
    };

    let rows = solutions.stream().collect::<Vec<_>>().await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(Result::is_ok));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn subscription_produces_requested_rows() -> Result<(), Box<dyn Error>> {
    let engine = engine(ExecutionConfig::default())?;
    let QueryResults::Solutions(solutions) =
        engine.query(&format!("{PREFIX}SELECT ?p WHERE {{ ?p ex:name ?n }}"))?
    else {
        panic!("expected solutions");
    };

    let mut subscription = solutions.subscribe()?;
    assert_eq!(subscription.variables(), &[Variable::new("p")?]);
    subscription.request(2);
    assert!(subscription.recv().await.transpose()?.is_some());
    assert!(subscription.recv().await.transpose()?.is_some());

    subscription.cancel();
    assert!(subscription.recv().await.is_none());
    Ok(())
}

#[test]
fn invalid_queries_are_parsing_errors() -> Result<(), Box<dyn Error>> {
    let engine = engine(ExecutionConfig::default())?;
    let result = engine.query("SELECT WHERE");
    assert!(matches!(result, Err(QueryEvaluationError::Parsing(_))));
    Ok(())
}

#[test]
fn unsupported_queries_are_lowering_errors() -> Result<(), Box<dyn Error>> {
    let engine = engine(ExecutionConfig::default())?;
    let result = engine.query("CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }");
    assert!(matches!(result, Err(QueryEvaluationError::Lowering(_))));
    let result = engine.query("SELECT ?s WHERE { ?s ?p ?o } ORDER BY ?s");
    assert!(matches!(result, Err(QueryEvaluationError::Lowering(_))));
    Ok(())
}

#[test]
fn incomplete_registries_are_configuration_errors() -> Result<(), Box<dyn Error>> {
    let result = QueryEngine::with_registry(
        Arc::new(store()?),
        ExecutionConfig::default(),
        EvaluatorRegistry::new(),
    );
    assert!(matches!(result, Err(QueryEvaluationError::Configuration(_))));
    Ok(())
}
