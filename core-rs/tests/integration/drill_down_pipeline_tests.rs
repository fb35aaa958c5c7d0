//! Integration tests for the drill-down model building pipeline
//!
//! Tests complete pipelines assembled from the public API:
//! - Seeding, drilling down, and merging
//! - Parameter layering per row
//! - Nested drill-downs
//! - Per-row reset and guaranteed close
//! - Cancellation and deadlines

use datadist_core::{
    run_model_builder, AllowAll, CancelToken, ConstructQueryModelBuilder, DistributorContext, DistributorError,
    DrillDownModelBuilder, Graph, ModelAccess, ModelBuilder, RequestContext, ResettableModelBuilder, Result,
};
use oxigraph::model::{Literal, NamedNode, Triple};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const EX: &str = "http://ex.org/";

fn iri(local: &str) -> NamedNode {
    NamedNode::new(format!("{}{}", EX, local)).unwrap()
}

fn content() -> Graph {
    Graph::from_turtle(
        r#"
        @prefix ex: <http://ex.org/> .
        ex:org1 ex:hasDept ex:deptA .
        ex:deptA ex:label "Dept A" .
        ex:deptA ex:hasPerson ex:alice , ex:bob .
        ex:alice ex:name "Alice" .
        ex:bob ex:name "Bob" .
        ex:deptB ex:label "Dept B" .
        "#,
    )
    .unwrap()
}

fn context_with(params: &[(&str, &str)], cancel: CancelToken) -> Arc<dyn DistributorContext> {
    let mut request = RequestContext::new(Arc::new(ModelAccess::new().with_model("content", content())), Arc::new(AllowAll))
        .with_cancel_token(cancel);
    for (name, value) in params {
        request = request.with_parameter(*name, *value);
    }
    Arc::new(request)
}

fn departments() -> Box<dyn ModelBuilder> {
    Box::new(
        ConstructQueryModelBuilder::new(
            "content",
            "PREFIX ex: <http://ex.org/> CONSTRUCT { ?o ex:hasDept ?d } WHERE { ?o ex:hasDept ?d }",
        )
        .with_name("departments"),
    )
}

fn department_labels() -> Box<dyn ResettableModelBuilder> {
    Box::new(
        ConstructQueryModelBuilder::new(
            "content",
            "PREFIX ex: <http://ex.org/> CONSTRUCT { ?department ex:label ?l } WHERE { ?department ex:label ?l }",
        )
        .with_name("department_labels")
        .with_uri_binding("department"),
    )
}

fn org_tree() -> DrillDownModelBuilder {
    DrillDownModelBuilder::new("PREFIX ex: <http://ex.org/> SELECT ?department WHERE { ?o ex:hasDept ?department }")
        .with_name("org_tree")
        .with_top_level_model_builder(departments())
        .with_drill_down_model_builder(department_labels())
}

#[test]
fn test_seed_then_drill_down() {
    let mut builder = org_tree();
    builder.validate().unwrap();

    // The request's own department value is overridden by each row
    let context = context_with(&[("department", "http://ex.org/deptB")], CancelToken::new());
    let model = run_model_builder(&mut builder, context).unwrap();

    assert_eq!(model.len(), 2);
    assert!(model.contains(&Triple::new(iri("org1"), iri("hasDept"), iri("deptA"))));
    assert!(model.contains(&Triple::new(
        iri("deptA"),
        iri("label"),
        Literal::new_simple_literal("Dept A")
    )));
    assert!(!model.contains(&Triple::new(
        iri("deptB"),
        iri("label"),
        Literal::new_simple_literal("Dept B")
    )));
}

#[test]
fn test_nested_drill_down() {
    let people = DrillDownModelBuilder::new(
        "PREFIX ex: <http://ex.org/> SELECT ?person WHERE { ?d ex:hasPerson ?person }",
    )
    .with_name("people")
    .with_top_level_model_builder(Box::new(
        ConstructQueryModelBuilder::new(
            "content",
            "PREFIX ex: <http://ex.org/> CONSTRUCT { ?department ex:hasPerson ?p } WHERE { ?department ex:hasPerson ?p }",
        )
        .with_uri_binding("department"),
    ))
    .with_drill_down_model_builder(Box::new(
        ConstructQueryModelBuilder::new(
            "content",
            "PREFIX ex: <http://ex.org/> CONSTRUCT { ?person ex:name ?n } WHERE { ?person ex:name ?n }",
        )
        .with_uri_binding("person"),
    ));

    let mut builder = org_tree().with_drill_down_model_builder(Box::new(people));
    let model = run_model_builder(&mut builder, context_with(&[], CancelToken::new())).unwrap();

    assert!(model.contains(&Triple::new(iri("deptA"), iri("hasPerson"), iri("alice"))));
    assert!(model.contains(&Triple::new(iri("alice"), iri("name"), Literal::new_simple_literal("Alice"))));
    assert!(model.contains(&Triple::new(iri("bob"), iri("name"), Literal::new_simple_literal("Bob"))));
    assert_eq!(model.len(), 6);
}

#[test]
fn test_builder_can_run_again() {
    let mut builder = org_tree();
    let first = run_model_builder(&mut builder, context_with(&[], CancelToken::new())).unwrap();
    let second = run_model_builder(&mut builder, context_with(&[], CancelToken::new())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_request_model_fails_build() {
    let mut builder = org_tree();
    let context: Arc<dyn DistributorContext> =
        Arc::new(RequestContext::new(Arc::new(ModelAccess::new()), Arc::new(AllowAll)));

    let result = run_model_builder(&mut builder, context);
    assert!(matches!(result, Err(DistributorError::Build(msg)) if msg.contains("no request model named 'content'")));
}

/// Records every lifecycle call, tagged with the `department` it saw
struct Recorder {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    department: Option<String>,
}

impl Recorder {
    fn boxed(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Box<Self> {
        Box::new(Recorder {
            label,
            log: Arc::clone(log),
            department: None,
        })
    }

    fn record(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }
}

impl ModelBuilder for Recorder {
    fn init(&mut self, context: Arc<dyn DistributorContext>) -> Result<()> {
        if self.department.is_some() {
            return Err(DistributorError::Lifecycle("init without reset".to_string()));
        }
        self.department = Some(context.parameter("department").unwrap_or("-").to_string());
        self.record(format!("{}:init", self.label));
        Ok(())
    }

    fn build_model(&mut self) -> Result<Graph> {
        let department = self.department.clone().unwrap_or_default();
        self.record(format!("{}:build:{}", self.label, department));
        Ok(Graph::new())
    }

    fn close(&mut self) -> Result<()> {
        self.record(format!("{}:close", self.label));
        Ok(())
    }
}

impl ResettableModelBuilder for Recorder {
    fn reset(&mut self) -> Result<()> {
        self.department = None;
        self.record(format!("{}:reset", self.label));
        Ok(())
    }
}

fn two_departments() -> Box<dyn ModelBuilder> {
    Box::new(
        Graph::from_turtle("<http://ex.org/org1> <http://ex.org/hasDept> <http://ex.org/deptA> , <http://ex.org/deptB> .")
            .map(FixedGraph)
            .unwrap(),
    )
}

struct FixedGraph(Graph);

impl ModelBuilder for FixedGraph {
    fn init(&mut self, _context: Arc<dyn DistributorContext>) -> Result<()> {
        Ok(())
    }

    fn build_model(&mut self) -> Result<Graph> {
        Ok(self.0.clone())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_rows_run_in_order_with_reset_between() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut builder = DrillDownModelBuilder::new(
        "SELECT ?department WHERE { ?o <http://ex.org/hasDept> ?department } ORDER BY ?department",
    )
    .with_top_level_model_builder(two_departments())
    .with_drill_down_model_builder(Recorder::boxed("C", &log))
    .with_drill_down_model_builder(Recorder::boxed("D", &log));

    run_model_builder(&mut builder, context_with(&[], CancelToken::new())).unwrap();

    let expected: Vec<String> = [
        "C:init", "C:build:http://ex.org/deptA", "C:close", "C:reset",
        "D:init", "D:build:http://ex.org/deptA", "D:close", "D:reset",
        "C:init", "C:build:http://ex.org/deptB", "C:close", "C:reset",
        "D:init", "D:build:http://ex.org/deptB", "D:close", "D:reset",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(*log.lock().unwrap(), expected);
}

#[test]
fn test_cancelled_request_stops_before_drilling_down() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut builder = DrillDownModelBuilder::new("SELECT ?department WHERE { ?o <http://ex.org/hasDept> ?department }")
        .with_top_level_model_builder(two_departments())
        .with_drill_down_model_builder(Recorder::boxed("C", &log));

    let cancel = CancelToken::new();
    cancel.cancel();

    let result = run_model_builder(&mut builder, context_with(&[], cancel));
    assert!(matches!(result, Err(DistributorError::Cancelled)));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_expired_deadline() {
    let mut builder = org_tree();
    let cancel = CancelToken::with_timeout(Duration::ZERO);

    let result = run_model_builder(&mut builder, context_with(&[], cancel));
    assert!(matches!(result, Err(DistributorError::DeadlineExceeded)));
}
