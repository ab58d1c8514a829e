//! Human readable labels for resources mentioned in document metadata (publishers,
//! subjects, ...), resolved against a repository's commondata graph.

use crate::consts::{LABEL_PREDICATES, NAME};
use crate::errors::ResourceNotFound;
use crate::namespaces::NamespaceMap;
use crate::util::read_graph_file;
use anyhow::Result;
use log::warn;
use oxigraph::model::{Graph, NamedNodeRef, NamedOrBlankNodeRef, TermRef};
use std::path::Path;

pub const DEFAULT_CUTOFF: f64 = 0.8;

#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    graph: Graph,
    namespaces: NamespaceMap,
}

impl ResourceGraph {
    pub fn new(graph: Graph, namespaces: NamespaceMap) -> Self {
        ResourceGraph { graph, namespaces }
    }

    /// Loads and merges every given RDF file.
    pub fn from_files<P: AsRef<Path>>(files: &[P], namespaces: NamespaceMap) -> Result<Self> {
        let mut graph = Graph::new();
        for file in files {
            for triple in read_graph_file(file.as_ref())?.iter() {
                graph.insert(triple);
            }
        }
        Ok(ResourceGraph::new(graph, namespaces))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn namespaces(&self) -> &NamespaceMap {
        &self.namespaces
    }

    pub fn qname(&self, uri: &str) -> Option<String> {
        self.namespaces.qname(uri)
    }

    /// First literal found under the usual labelling predicates.
    pub fn label(&self, uri: &str) -> Option<String> {
        let subject = NamedNodeRef::new(uri).ok()?;
        LABEL_PREDICATES.iter().find_map(|predicate| {
            match self
                .graph
                .object_for_subject_predicate(subject, *predicate)?
            {
                TermRef::Literal(lit) => Some(lit.value().to_string()),
                _ => None,
            }
        })
    }

    /// Finds the resource whose `predicate` (default `foaf:name`) equals `label`, or failing
    /// that the closest match with a similarity of at least `cutoff`.
    pub fn lookup_resource(
        &self,
        label: &str,
        predicate: Option<NamedNodeRef<'_>>,
        cutoff: f64,
        warn_inexact: bool,
    ) -> Result<String> {
        let predicate = predicate.unwrap_or(NAME);
        let mut candidates: Vec<(&str, &str)> = vec![];
        for triple in self.graph.triples_for_predicate(predicate) {
            let subject = match triple.subject {
                NamedOrBlankNodeRef::NamedNode(n) => n.as_str(),
                _ => continue,
            };
            if let TermRef::Literal(lit) = triple.object {
                if lit.value() == label {
                    return Ok(subject.to_string());
                }
                candidates.push((lit.value(), subject));
            }
        }

        let mut best: Option<(f64, &str, &str)> = None;
        for (candidate, subject) in candidates {
            let score = similarity(label, candidate);
            if score >= cutoff && best.map_or(true, |(b, _, _)| score > b) {
                best = Some((score, candidate, subject));
            }
        }
        match best {
            Some((_, candidate, subject)) => {
                if warn_inexact && candidate.to_lowercase() != label.to_lowercase() {
                    warn!(
                        "Assuming that {:?} should be {:?} ({})",
                        label, candidate, subject
                    );
                }
                Ok(subject.to_string())
            }
            None => Err(ResourceNotFound {
                label: label.to_string(),
            }
            .into()),
        }
    }
}

/// Ratcliff/Obershelp similarity: twice the number of matching characters divided by
/// the total length, where matches are found by recursively taking the longest common
/// block and repeating on both sides of it.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_common_block(a, b);
    if size == 0 {
        return 0;
    }
    size + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + size..], &b[j + size..])
}

// earliest longest block, like difflib's find_longest_match without junk heuristics
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        let mut cur = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                cur[j + 1] = prev[j] + 1;
                if cur[j + 1] > best.2 {
                    best = (i + 1 - cur[j + 1], j + 1 - cur[j + 1], cur[j + 1]);
                }
            }
        }
        prev = cur;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::read_graph;
    use oxigraph::io::RdfFormat;

    const COMMONDATA: &str = r#"
@prefix foaf: <http://xmlns.com/foaf/0.1/> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
<http://example.org/org/acme> foaf:name "Acme Publishing" .
<http://example.org/org/gov> foaf:name "Ministry of Justice" ;
    skos:prefLabel "The Ministry" .
<http://example.org/org/misc> rdfs:label "Miscellaneous" .
"#;

    fn resources() -> ResourceGraph {
        let graph = read_graph(COMMONDATA.as_bytes(), RdfFormat::Turtle).unwrap();
        ResourceGraph::new(graph, NamespaceMap::default())
    }

    #[test]
    fn test_label_predicate_order() {
        let res = resources();
        assert_eq!(
            res.label("http://example.org/org/gov").as_deref(),
            Some("The Ministry")
        );
        assert_eq!(
            res.label("http://example.org/org/acme").as_deref(),
            Some("Acme Publishing")
        );
        assert_eq!(res.label("http://example.org/org/none"), None);
    }

    #[test]
    fn test_lookup_resource() {
        let res = resources();
        assert_eq!(
            res.lookup_resource("Acme Publishing", None, DEFAULT_CUTOFF, true)
                .unwrap(),
            "http://example.org/org/acme"
        );
        assert_eq!(
            res.lookup_resource("Ministry of Justise", None, DEFAULT_CUTOFF, true)
                .unwrap(),
            "http://example.org/org/gov"
        );
        let err = res
            .lookup_resource("Something else entirely", None, DEFAULT_CUTOFF, false)
            .unwrap_err();
        assert!(err.downcast_ref::<ResourceNotFound>().is_some());
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("abcd", "abcd"), 1.0);
        assert_eq!(similarity("abcd", "bcde"), 0.75);
        assert_eq!(similarity("", "abc"), 0.0);
    }
}
