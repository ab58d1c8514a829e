//! Defines constant NamedNodeRefs for the RDF terms the faceted pipeline works with,
//! primarily from RDF, RDFS, OWL, DC, DCTERMS, FOAF, SKOS, XSD and schema.org.

use oxigraph::model::NamedNodeRef;

// rdf
pub const TYPE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
// rdfs
pub const LABEL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#label");
pub const RESOURCE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#Resource");
// owl
pub const SAME_AS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#sameAs");

// dcterms
pub const TITLE: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("http://purl.org/dc/terms/title");
pub const ALTERNATIVE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/alternative");
pub const IDENTIFIER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/identifier");
pub const ABSTRACT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/abstract");
pub const PUBLISHER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/publisher");
pub const REFERENCES: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/references");
pub const ISSUED: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/issued");
pub const DCTERMS_SUBJECT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/subject");
// dc (elements 1.1)
pub const CREATOR: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/elements/1.1/creator");
pub const DC_SUBJECT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/elements/1.1/subject");

// foaf
pub const DOCUMENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/Document");
pub const NAME: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/name");
// skos
pub const PREF_LABEL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#prefLabel");
pub const ALT_LABEL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#altLabel");
// schema.org
pub const FREE: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("http://schema.org/free");

// xsd datatypes recognized when turning literals into row values
pub const XSD_DATE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#date");
pub const XSD_DATETIME: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#dateTime");
pub const XSD_BOOLEAN: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#boolean");
pub const XSD_INTEGER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#integer");

/// Predicates consulted, in order, when looking for a human readable label of a resource.
pub const LABEL_PREDICATES: [NamedNodeRef<'_>; 6] =
    [LABEL, PREF_LABEL, ALT_LABEL, TITLE, ALTERNATIVE, NAME];

/// Well-known prefixes and their namespaces.
pub const DEFAULT_NAMESPACES: [(&str, &str); 13] = [
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("xhv", "http://www.w3.org/1999/xhtml/vocab#"),
    ("prov", "http://www.w3.org/ns/prov#"),
    ("bibo", "http://purl.org/ontology/bibo/"),
    ("schema", "http://schema.org/"),
];

/// Relative locations (under a repository's data directory) of the files this crate owns.
pub const DUMP_FILE: &str = "distilled/dump.nt";
pub const FACETED_DATA_CACHE: &str = "toc/faceted_data.json";
pub const TOC_INDEX: &str = "toc/index.html";
pub const FACETED_ENTRIES_CACHE: &str = "feed/faceted_entries.json";
pub const FEEDSETS_CACHE: &str = "feed/feedsets.json";
pub const FEED_DIR: &str = "feed";
pub const NEWS_INDEX: &str = "news/main.atom";
