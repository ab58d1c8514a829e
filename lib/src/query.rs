//! Builds the SPARQL query that selects the faceted data of a repository.

use crate::namespaces::NamespaceMap;
use crate::repository::Repository;

/// Prefixed name of `iri`, or `<iri>` when no prefix is bound for it.
fn sparql_term(namespaces: &NamespaceMap, iri: &str) -> String {
    namespaces
        .qname(iri)
        .unwrap_or_else(|| format!("<{}>", iri))
}

/// SELECT query fetching `?uri` and one variable per facet for every document of the
/// repository's types in `context`. Facet predicates are OPTIONAL, so a document
/// missing one of them is still selected. Output is deterministic for a given facet list.
pub fn facet_query(repo: &dyn Repository, context: &str) -> String {
    let ns = repo.namespaces();
    let facets = repo.facets();
    let predicates: Vec<&str> = facets.iter().map(|f| f.rdftype.as_str()).collect();
    let bindings: Vec<String> = facets.iter().map(|f| f.binding(ns)).collect();
    let rdftypes: Vec<String> = repo
        .rdf_type()
        .iter()
        .map(|t| t.as_str().to_string())
        .collect();

    let rdf_ns = ns.namespace("rdf");
    let prefixes: String = ns
        .iter()
        .filter(|(_, uri)| {
            Some(*uri) == rdf_ns
                || predicates
                    .iter()
                    .copied()
                    .chain(rdftypes.iter().map(String::as_str))
                    .any(|p| p.starts_with(uri))
        })
        .map(|(prefix, uri)| format!("PREFIX {}: <{}>\n", prefix, uri))
        .collect();

    let selectbindings = bindings
        .iter()
        .map(|b| format!("?{}", b))
        .collect::<Vec<_>>()
        .join(" ");

    let (whereclause, filterclause) = if rdftypes.len() == 1 {
        (
            format!("?uri rdf:type {}", sparql_term(ns, &rdftypes[0])),
            String::new(),
        )
    } else {
        let types = rdftypes
            .iter()
            .map(|t| sparql_term(ns, t))
            .collect::<Vec<_>>()
            .join(", ");
        (
            "?uri rdf:type ?type".to_string(),
            format!("    FILTER (?type in ({})) .", types),
        )
    };

    let optclauses = predicates
        .iter()
        .zip(bindings.iter())
        .map(|(p, b)| format!("    OPTIONAL {{ ?uri {} ?{} . }}", sparql_term(ns, p), b))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{prefixes}\nSELECT DISTINCT ?uri {selectbindings}\nFROM <{context}>\nWHERE {{\n    {whereclause} .\n{optclauses}\n{filterclause}\n}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repository::DocumentRepository;

    #[test]
    fn test_unprefixed_predicate() {
        let repo = DocumentRepository::new("base", Config::default())
            .unwrap()
            .with_facets(vec![crate::facet::Facet::new(
                oxigraph::model::NamedNodeRef::new_unchecked("http://example.org/vocab/court"),
            )])
            .unwrap();
        let query = facet_query(&repo, "http://example.org/ctx/base");
        assert!(query.contains("OPTIONAL { ?uri <http://example.org/vocab/court> ?court . }"));
        assert!(query.starts_with(
            "PREFIX foaf: <http://xmlns.com/foaf/0.1/>\nPREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>\n\n"
        ));
    }
}
