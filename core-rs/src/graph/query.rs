/**
 * query.rs
 * SPARQL execution against an in-memory Graph, and parameter binding
 */

use oxigraph::model::{Literal, NamedNode, Term};
use oxigraph::sparql::QueryResults;
use regex::{NoExpand, Regex};
use std::collections::BTreeMap;

use super::Graph;
use crate::errors::{DistributorError, Result};

/// One solution of a SELECT query: variable name to its string value.
/// IRIs and blank nodes are given as their bare identifier, literals as their
/// lexical form. Unbound variables are absent.
pub type BindingRow = BTreeMap<String, String>;

/// Executes queries against a graph.
pub trait QueryExecutor: Send + Sync {
    /// Run a SELECT query and return its solutions in result order
    fn select(&self, graph: &Graph, query: &str) -> Result<Vec<BindingRow>>;

    /// Run a CONSTRUCT (or DESCRIBE) query and return the produced triples
    fn construct(&self, graph: &Graph, query: &str) -> Result<Graph>;
}

/// The oxigraph SPARQL engine, run over a throwaway in-memory store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparqlExecutor;

impl QueryExecutor for SparqlExecutor {
    fn select(&self, graph: &Graph, query: &str) -> Result<Vec<BindingRow>> {
        let store = graph.to_store()?;
        let results = store
            .query(query)
            .map_err(|e| DistributorError::Query(e.to_string()))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();

                for solution in solutions {
                    let solution = solution
                        .map_err(|e| DistributorError::Query(e.to_string()))?;

                    let mut row = BindingRow::new();
                    for (var, term) in solution.iter() {
                        row.insert(var.as_str().to_string(), term_to_string(term));
                    }
                    rows.push(row);
                }

                Ok(rows)
            }
            QueryResults::Boolean(_) | QueryResults::Graph(_) => Err(DistributorError::Query(
                "Expected a SELECT query".to_string(),
            )),
        }
    }

    fn construct(&self, graph: &Graph, query: &str) -> Result<Graph> {
        let store = graph.to_store()?;
        let results = store
            .query(query)
            .map_err(|e| DistributorError::Query(e.to_string()))?;

        match results {
            QueryResults::Graph(triples) => {
                let mut constructed = Graph::new();
                for triple in triples {
                    let triple = triple.map_err(|e| DistributorError::Query(e.to_string()))?;
                    constructed.insert(&triple);
                }
                Ok(constructed)
            }
            QueryResults::Solutions(_) | QueryResults::Boolean(_) => Err(DistributorError::Query(
                "Expected a CONSTRUCT or DESCRIBE query".to_string(),
            )),
        }
    }
}

fn term_to_string(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::BlankNode(node) => node.as_str().to_string(),
        Term::Literal(literal) => literal.value().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

/// SPARQL text with `?name` / `$name` placeholders that can be bound to
/// request values before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlQuery {
    query: String,
}

impl SparqlQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }

    /// Replace every occurrence of the variable with an IRI term.
    pub fn bind_uri(self, name: &str, value: &str) -> Result<Self> {
        let node = NamedNode::new(value).map_err(|e| {
            DistributorError::Build(format!(
                "Value of '{}' is not a valid IRI ('{}'): {}",
                name, value, e
            ))
        })?;
        self.bind(name, &node.to_string())
    }

    /// Replace every occurrence of the variable with a plain literal.
    pub fn bind_literal(self, name: &str, value: &str) -> Result<Self> {
        self.bind(name, &Literal::new_simple_literal(value).to_string())
    }

    fn bind(self, name: &str, term: &str) -> Result<Self> {
        let placeholder = Regex::new(&format!(r"[?$]{}\b", regex::escape(name)))?;
        let query = placeholder.replace_all(&self.query, NoExpand(term)).into_owned();
        Ok(Self { query })
    }
}
