//! Prefix handling: turning IRIs into prefixed names and prefixed names into the
//! `prefix_localname` binding names used for query variables and row keys.

use crate::consts::DEFAULT_NAMESPACES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix to namespace IRI, iterated in prefix order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMap {
    prefixes: BTreeMap<String, String>,
}

impl Default for NamespaceMap {
    fn default() -> Self {
        let mut map = NamespaceMap::empty();
        for (prefix, ns) in DEFAULT_NAMESPACES {
            map.bind(prefix, ns);
        }
        map
    }
}

impl NamespaceMap {
    pub fn empty() -> Self {
        NamespaceMap {
            prefixes: BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, prefix: &str, namespace: &str) {
        self.prefixes
            .insert(prefix.to_string(), namespace.to_string());
    }

    pub fn with(mut self, prefix: &str, namespace: &str) -> Self {
        self.bind(prefix, namespace);
        self
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    /// The (prefix, namespace) pair with the longest namespace that `iri` starts with.
    pub fn split<'a>(&'a self, iri: &'a str) -> Option<(&'a str, &'a str)> {
        self.prefixes
            .iter()
            .filter(|(_, ns)| iri.starts_with(ns.as_str()) && iri.len() > ns.len())
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| (prefix.as_str(), &iri[ns.len()..]))
    }

    pub fn qname(&self, iri: &str) -> Option<String> {
        self.split(iri)
            .map(|(prefix, local)| format!("{}:{}", prefix, local))
    }

    pub fn prefix_of<'a>(&'a self, iri: &'a str) -> Option<&'a str> {
        self.split(iri).map(|(prefix, _)| prefix)
    }

    /// Row key / query variable name for a predicate: `dcterms:title` becomes `dcterms_title`.
    pub fn binding(&self, iri: &str) -> String {
        match self.qname(iri) {
            Some(qname) => qname.replace(':', "_"),
            None => uri_leaf(iri).to_string(),
        }
    }

    /// Expands `prefix:local` back into a full IRI.
    pub fn expand(&self, qname: &str) -> Option<String> {
        let (prefix, local) = qname.split_once(':')?;
        self.namespace(prefix).map(|ns| format!("{}{}", ns, local))
    }
}

/// The fragment of an IRI, or its last path segment when there is no fragment.
pub fn uri_leaf(iri: &str) -> &str {
    if let Some((_, fragment)) = iri.rsplit_once('#') {
        if !fragment.is_empty() {
            return fragment;
        }
    }
    iri.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(iri)
}
