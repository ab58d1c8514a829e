//! Reads the properties of one resource at a time out of a graph.

use anyhow::{anyhow, Result};
use oxigraph::model::{Graph, Literal, NamedNode, NamedNodeRef, TermRef};

pub struct Describer<'a> {
    graph: &'a Graph,
    about: NamedNode,
}

impl<'a> Describer<'a> {
    pub fn new(graph: &'a Graph, about: &str) -> Result<Self> {
        Ok(Describer {
            graph,
            about: parse_iri(about)?,
        })
    }

    pub fn current(&self) -> &str {
        self.about.as_str()
    }

    /// Every literal object of `predicate`.
    pub fn getvalues(&self, predicate: NamedNodeRef<'_>) -> Vec<Literal> {
        self.graph
            .objects_for_subject_predicate(self.about.as_ref(), predicate)
            .filter_map(|o| match o {
                TermRef::Literal(l) => Some(l.into_owned()),
                _ => None,
            })
            .collect()
    }

    /// Every IRI object of `predicate`.
    pub fn getrels(&self, predicate: NamedNodeRef<'_>) -> Vec<String> {
        self.graph
            .objects_for_subject_predicate(self.about.as_ref(), predicate)
            .filter_map(|o| match o {
                TermRef::NamedNode(n) => Some(n.as_str().to_string()),
                _ => None,
            })
            .collect()
    }
}

fn parse_iri(uri: &str) -> Result<NamedNode> {
    NamedNode::new(uri).map_err(|e| anyhow!("Invalid IRI {}: {}", uri, e))
}
