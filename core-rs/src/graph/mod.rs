/**
 * graph module
 *
 * - Graph: owned, mergeable set of RDF triples (accumulator and builder output)
 * - query: SPARQL execution against a Graph and parameter binding
 */

pub mod query;

pub use query::{BindingRow, QueryExecutor, SparqlExecutor, SparqlQuery};

use oxigraph::io::RdfFormat;
use oxigraph::model::{GraphNameRef, QuadRef, Triple, TripleRef};
use oxigraph::store::Store;
use std::fmt;
use std::io::{Read, Write};

use crate::errors::{DistributorError, Result};

/// A set of subject-predicate-object triples.
///
/// Merging is triple-set union, so the result of a series of merges does not
/// depend on their order.
#[derive(Clone, Default)]
pub struct Graph {
    triples: oxigraph::model::Graph,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a Turtle document into a graph
    pub fn from_turtle(turtle: &str) -> Result<Self> {
        Self::from_reader(RdfFormat::Turtle, turtle.as_bytes())
    }

    /// Parse any RDF serialization oxigraph understands into a graph.
    /// Only the default graph of quad formats is kept.
    pub fn from_reader(format: RdfFormat, reader: impl Read) -> Result<Self> {
        let store = Store::new().map_err(|e| DistributorError::Store(e.to_string()))?;
        store
            .load_from_reader(format, reader)
            .map_err(|e| DistributorError::Serialization(format!("Failed to parse RDF: {}", e)))?;
        Self::from_store(&store)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Insert a triple. Returns false if it was already present.
    pub fn insert(&mut self, triple: &Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn iter(&self) -> impl Iterator<Item = TripleRef<'_>> + '_ {
        self.triples.iter()
    }

    /// Add every triple of `other` into this graph.
    pub fn merge(&mut self, other: &Graph) {
        for triple in other.triples.iter() {
            self.triples.insert(triple);
        }
    }

    /// Load this graph into a fresh in-memory store, in the default graph.
    pub(crate) fn to_store(&self) -> Result<Store> {
        let store = Store::new().map_err(|e| DistributorError::Store(e.to_string()))?;
        for t in self.triples.iter() {
            store
                .insert(QuadRef::new(t.subject, t.predicate, t.object, GraphNameRef::DefaultGraph))
                .map_err(|e| DistributorError::Store(e.to_string()))?;
        }
        Ok(store)
    }

    pub(crate) fn from_store(store: &Store) -> Result<Self> {
        let mut graph = Graph::new();
        for quad in store.quads_for_pattern(None, None, None, Some(GraphNameRef::DefaultGraph)) {
            let quad = quad.map_err(|e| DistributorError::Store(e.to_string()))?;
            graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
        }
        Ok(graph)
    }

    /// Serialize the graph into `writer` and hand the writer back.
    pub fn write_to<W: Write>(&self, format: RdfFormat, writer: W) -> Result<W> {
        let store = self.to_store()?;
        store
            .dump_graph_to_writer(GraphNameRef::DefaultGraph, format, writer)
            .map_err(|e| DistributorError::Serialization(e.to_string()))
    }

    pub fn to_turtle(&self) -> Result<String> {
        let bytes = self.write_to(RdfFormat::Turtle, Vec::new())?;
        String::from_utf8(bytes).map_err(|e| DistributorError::Serialization(e.to_string()))
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.triples.iter().all(|t| other.triples.contains(t))
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.triples.iter()).finish()
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut graph = Graph::new();
        graph.extend(iter);
        graph
    }
}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        for triple in iter {
            self.triples.insert(&triple);
        }
    }
}
