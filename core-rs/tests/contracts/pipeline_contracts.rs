// Drill-Down Pipeline Contract Tests
//
// These tests verify the lifecycle and context layering invariants of the
// drill-down model builder. Downstream queries are written against them.
//
// **Problem**: A "cleanup" reorders close/reset, or lets a row binding leak
// into the request, and results drift silently
// **Solution**: Contract tests that pin the observable lifecycle

use datadist_core::{
    derive_context, run_and_reset, run_model_builder, AllowAll, BindingRow, DistributorContext, DistributorError,
    DrillDownModelBuilder, Graph, ModelAccess, ModelBuilder, RequestContext, ResettableModelBuilder, Result,
};
use std::sync::{Arc, Mutex};

fn baseline(params: &[(&str, &str)]) -> Arc<dyn DistributorContext> {
    let mut request = RequestContext::new(Arc::new(ModelAccess::new()), Arc::new(AllowAll));
    for (name, value) in params {
        request = request.with_parameter(*name, *value);
    }
    Arc::new(request)
}

fn row(pairs: &[(&str, &str)]) -> BindingRow {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// Logs lifecycle calls and optionally fails one phase
struct Scripted {
    log: Arc<Mutex<Vec<&'static str>>>,
    fail_build: bool,
    seed: Option<Graph>,
}

impl Scripted {
    fn new(log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
        Scripted {
            log: Arc::clone(log),
            fail_build: false,
            seed: None,
        }
    }
}

impl ModelBuilder for Scripted {
    fn init(&mut self, _context: Arc<dyn DistributorContext>) -> Result<()> {
        self.log.lock().unwrap().push("init");
        Ok(())
    }

    fn build_model(&mut self) -> Result<Graph> {
        self.log.lock().unwrap().push("build");
        if self.fail_build {
            return Err(DistributorError::Build("scripted failure".to_string()));
        }
        Ok(self.seed.clone().unwrap_or_default())
    }

    fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().push("close");
        Ok(())
    }
}

impl ResettableModelBuilder for Scripted {
    fn reset(&mut self) -> Result<()> {
        self.log.lock().unwrap().push("reset");
        Ok(())
    }
}

/// WHY: A drill-down binding must replace, not append to, a request parameter
/// FORMAT: derived parameter = [row value], all other parameters unchanged
/// REASON: Builders read the first value; appending would hand them the stale one
/// BREAKS: Every drill-down builder would see the request's value instead of the row's
/// SACRIFICES: If this fails, per-row results collapse to one repeated row
#[test]
fn drill_down_binding_replaces_request_parameter() {
    let base = baseline(&[("department", "deptZ"), ("department", "deptY"), ("org", "org1")]);
    let derived = derive_context(&base, &row(&[("department", "deptA")]));

    assert_eq!(
        derived.request_parameters().get("department"),
        Some(&vec!["deptA".to_string()])
    );
    assert_eq!(derived.parameter("org"), Some("org1"));

    // If this test fails:
    // - Row bindings are being merged instead of layered
    // - Drill-down builders read the wrong value
}

/// WHY: The baseline context is shared by every row
/// REASON: Rows are derived from the same baseline one after another
/// BREAKS: Row N would see bindings from row N-1
/// SACRIFICES: If this fails, results depend on row order
#[test]
fn derived_context_never_mutates_baseline() {
    let base = baseline(&[("department", "deptZ")]);
    let _first = derive_context(&base, &row(&[("department", "deptA"), ("person", "alice")]));
    let _second = derive_context(&base, &row(&[("department", "deptB")]));

    assert_eq!(base.parameter("department"), Some("deptZ"));
    assert!(base.request_parameters().get("person").is_none());
}

/// WHY: Close must run after every successful init, even when build fails
/// ORDER: init -> build -> close
/// REASON: Builders hold request resources between init and close
/// BREAKS: Resource leaks on every failed request
/// SACRIFICES: If this fails, a failing builder stays open forever
#[test]
fn close_runs_after_failed_build() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut builder = Scripted::new(&log);
    builder.fail_build = true;

    let result = run_model_builder(&mut builder, baseline(&[]));

    assert!(matches!(result, Err(DistributorError::Build(_))));
    assert_eq!(*log.lock().unwrap(), vec!["init", "build", "close"]);
}

/// WHY: Reset follows close after every drill-down run, successful or not
/// ORDER: init -> build -> close -> reset
/// REASON: The same instance is reused for the next row or the next request
/// BREAKS: State from a failed row leaks into the next run
/// SACRIFICES: If this fails, builders must be rebuilt per row
#[test]
fn reset_follows_close_even_on_failure() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut builder = Scripted::new(&log);
    builder.fail_build = true;

    let result = run_and_reset(&mut builder, baseline(&[]));

    assert!(result.is_err());
    assert_eq!(*log.lock().unwrap(), vec!["init", "build", "close", "reset"]);
}

/// WHY: A drill-down query with no solutions yields exactly the seed model
/// REASON: Clients render the seed alone when there is nothing to drill into
/// BREAKS: Empty departments would vanish from the output
/// SACRIFICES: If this fails, "no rows" becomes an error or an empty graph
#[test]
fn no_rows_yields_seed_model_without_drilling_down() {
    let seed = Graph::from_turtle("<http://ex.org/org1> <http://ex.org/name> \"Org\" .").unwrap();
    let top_log = Arc::new(Mutex::new(Vec::new()));
    let drill_log = Arc::new(Mutex::new(Vec::new()));

    let mut top = Scripted::new(&top_log);
    top.seed = Some(seed.clone());

    let mut builder = DrillDownModelBuilder::new("SELECT ?d WHERE { ?o <http://ex.org/hasDept> ?d }")
        .with_top_level_model_builder(Box::new(top))
        .with_drill_down_model_builder(Box::new(Scripted::new(&drill_log)));

    let model = run_model_builder(&mut builder, baseline(&[])).unwrap();

    assert_eq!(model, seed);
    assert_eq!(*top_log.lock().unwrap(), vec!["init", "build", "close"]);
    assert!(drill_log.lock().unwrap().is_empty());
}

/// WHY: Any builder failure aborts the whole drill-down build
/// REASON: A partial graph is indistinguishable from a complete one downstream
/// BREAKS: Clients would cache incomplete results as if they were whole
/// SACRIFICES: If this fails, errors become silent data loss
#[test]
fn drill_down_failure_aborts_build() {
    let seed = Graph::from_turtle("<http://ex.org/org1> <http://ex.org/hasDept> <http://ex.org/deptA> .").unwrap();
    let top_log = Arc::new(Mutex::new(Vec::new()));
    let drill_log = Arc::new(Mutex::new(Vec::new()));

    let mut top = Scripted::new(&top_log);
    top.seed = Some(seed);
    let mut failing = Scripted::new(&drill_log);
    failing.fail_build = true;

    let mut builder = DrillDownModelBuilder::new("SELECT ?d WHERE { ?o <http://ex.org/hasDept> ?d }")
        .with_top_level_model_builder(Box::new(top))
        .with_drill_down_model_builder(Box::new(failing));

    let result = run_model_builder(&mut builder, baseline(&[]));

    assert!(matches!(result, Err(DistributorError::Build(_))));
    assert_eq!(*drill_log.lock().unwrap(), vec!["init", "build", "close", "reset"]);
}
