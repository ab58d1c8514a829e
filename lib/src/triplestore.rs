//! The triple store collaborator: a SPARQL capable store that holds one named graph
//! (context) per dataset.

use crate::consts::{XSD_DATE, XSD_DATETIME};
use crate::util::atomic_write;
use crate::value::{Row, Value};
use anyhow::{anyhow, Result};
use log::{debug, info};
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{Graph, GraphNameRef, NamedNodeRef, Term, TripleRef};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use std::io::{BufReader, Cursor};
use std::path::Path;

pub trait TripleStore {
    /// Runs a SELECT query. Unbound variables are left out of the row.
    fn select(&self, query: &str) -> Result<Vec<Row>>;

    /// Runs a CONSTRUCT (or DESCRIBE) query.
    fn construct(&self, query: &str) -> Result<Graph>;

    /// Adds serialized RDF to `context`, or to the default graph.
    fn add_serialized(&self, data: &[u8], format: RdfFormat, context: Option<&str>) -> Result<()>;

    fn add_serialized_file(&self, path: &Path, format: RdfFormat, context: Option<&str>) -> Result<()> {
        let data = std::fs::read(path)?;
        self.add_serialized(&data, format, context)
    }

    /// Removes every triple in `context`, or everything when no context is given.
    fn clear(&self, context: Option<&str>) -> Result<()>;

    fn get_serialized(&self, format: RdfFormat, context: Option<&str>) -> Result<Vec<u8>>;

    fn get_serialized_file(&self, path: &Path, format: RdfFormat, context: Option<&str>) -> Result<()> {
        let data = self.get_serialized(format, context)?;
        atomic_write(path, &data)
    }

    fn triple_count(&self, context: Option<&str>) -> Result<usize>;
}

/// Turns a solution term into a row value. Date and dateTime literals become dates.
pub fn term_to_value(term: &Term) -> Value {
    match term {
        Term::NamedNode(node) => Value::Str(node.as_str().to_string()),
        Term::Literal(literal) => {
            let datatype = literal.datatype();
            if datatype == XSD_DATE || datatype == XSD_DATETIME {
                Value::parse_date(literal.value())
                    .unwrap_or_else(|| Value::Str(literal.value().to_string()))
            } else {
                Value::Str(literal.value().to_string())
            }
        }
        other => Value::Str(other.to_string()),
    }
}

pub struct OxigraphStore {
    store: Store,
}

impl OxigraphStore {
    pub fn in_memory() -> Result<Self> {
        Ok(OxigraphStore {
            store: Store::new()?,
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        Ok(OxigraphStore {
            store: Store::open(path)?,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn graph_name(context: &str) -> Result<NamedNodeRef<'_>> {
        NamedNodeRef::new(context).map_err(|e| anyhow!("Invalid context {}: {}", context, e))
    }
}

impl TripleStore for OxigraphStore {
    fn select(&self, query: &str) -> Result<Vec<Row>> {
        match self.store.query(query)? {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution?;
                    let row: Row = solution
                        .iter()
                        .map(|(var, term)| (var.as_str().to_string(), term_to_value(term)))
                        .collect();
                    rows.push(row);
                }
                debug!("select returned {} rows", rows.len());
                Ok(rows)
            }
            _ => Err(anyhow!("Expected a SELECT query")),
        }
    }

    fn construct(&self, query: &str) -> Result<Graph> {
        match self.store.query(query)? {
            QueryResults::Graph(triples) => {
                let mut graph = Graph::new();
                for triple in triples {
                    graph.insert(&triple?);
                }
                Ok(graph)
            }
            _ => Err(anyhow!("Expected a CONSTRUCT or DESCRIBE query")),
        }
    }

    fn add_serialized(&self, data: &[u8], format: RdfFormat, context: Option<&str>) -> Result<()> {
        let parser = match context {
            Some(context) => RdfParser::from_format(format)
                .with_default_graph(GraphNameRef::NamedNode(Self::graph_name(context)?)),
            None => RdfParser::from_format(format),
        };
        self.store.load_from_reader(parser, Cursor::new(data))?;
        Ok(())
    }

    // large files go through the bulk loader
    fn add_serialized_file(&self, path: &Path, format: RdfFormat, context: Option<&str>) -> Result<()> {
        let parser = match context {
            Some(context) => RdfParser::from_format(format)
                .with_default_graph(GraphNameRef::NamedNode(Self::graph_name(context)?)),
            None => RdfParser::from_format(format),
        };
        let reader = BufReader::new(std::fs::File::open(path)?);
        let mut loader = self.store.bulk_loader();
        loader.load_from_reader(parser, reader)?;
        loader.commit()?;
        info!("Bulk loaded {} into {}", path.display(), context.unwrap_or("default graph"));
        Ok(())
    }

    fn clear(&self, context: Option<&str>) -> Result<()> {
        match context {
            Some(context) => self.store.clear_graph(Self::graph_name(context)?)?,
            None => self.store.clear()?,
        }
        Ok(())
    }

    fn get_serialized(&self, format: RdfFormat, context: Option<&str>) -> Result<Vec<u8>> {
        let graph = match context {
            Some(context) => Some(GraphNameRef::NamedNode(Self::graph_name(context)?)),
            None => None,
        };
        let mut serializer = RdfSerializer::from_format(format).for_writer(Vec::new());
        for quad in self.store.quads_for_pattern(None, None, None, graph) {
            let quad = quad?;
            serializer.serialize_triple(TripleRef {
                subject: quad.subject.as_ref(),
                predicate: quad.predicate.as_ref(),
                object: quad.object.as_ref(),
            })?;
        }
        Ok(serializer.finish()?)
    }

    fn triple_count(&self, context: Option<&str>) -> Result<usize> {
        let graph = match context {
            Some(context) => Some(GraphNameRef::NamedNode(Self::graph_name(context)?)),
            None => None,
        };
        let mut count = 0;
        for quad in self.store.quads_for_pattern(None, None, None, graph) {
            quad?;
            count += 1;
        }
        Ok(count)
    }
}

/// Connects to a store of the given type. An empty location means an in-memory store.
pub fn connect(storetype: &str, location: &str, repository: &str) -> Result<Box<dyn TripleStore>> {
    match storetype {
        "oxigraph" => {
            if location.is_empty() {
                debug!("Connecting to in-memory oxigraph store");
                Ok(Box::new(OxigraphStore::in_memory()?))
            } else {
                let path = Path::new(location).join(repository);
                debug!("Connecting to oxigraph store at {}", path.display());
                Ok(Box::new(OxigraphStore::open(&path)?))
            }
        }
        other => Err(anyhow!("Unsupported triple store type {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"
<http://example.org/res/base/1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://xmlns.com/foaf/0.1/Document> .
<http://example.org/res/base/1> <http://purl.org/dc/terms/title> "Abc" .
<http://example.org/res/base/1> <http://purl.org/dc/terms/issued> "2009-04-02"^^<http://www.w3.org/2001/XMLSchema#date> .
"#;
    const CTX: &str = "http://example.org/dataset/base";

    #[test]
    fn test_select_in_context() {
        let store = OxigraphStore::in_memory().unwrap();
        store
            .add_serialized(DATA.as_bytes(), RdfFormat::NTriples, Some(CTX))
            .unwrap();
        assert_eq!(store.triple_count(Some(CTX)).unwrap(), 3);

        let rows = store
            .select(&format!(
                "SELECT ?uri ?title ?issued ?missing FROM <{}> WHERE {{ ?uri <http://purl.org/dc/terms/title> ?title . ?uri <http://purl.org/dc/terms/issued> ?issued . OPTIONAL {{ ?uri <http://example.org/none> ?missing }} }}",
                CTX
            ))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], Value::str("Abc"));
        assert!(rows[0]["issued"].is_date());
        assert!(!rows[0].contains_key("missing"));
    }

    #[test]
    fn test_dump_clear_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = OxigraphStore::in_memory().unwrap();
        store
            .add_serialized(DATA.as_bytes(), RdfFormat::NTriples, Some(CTX))
            .unwrap();
        let dump = dir.path().join("dump.nt");
        store
            .get_serialized_file(&dump, RdfFormat::NTriples, Some(CTX))
            .unwrap();
        store.clear(Some(CTX)).unwrap();
        assert_eq!(store.triple_count(Some(CTX)).unwrap(), 0);

        store
            .add_serialized_file(&dump, RdfFormat::NTriples, Some(CTX))
            .unwrap();
        assert_eq!(store.triple_count(Some(CTX)).unwrap(), 3);
        let graph = store
            .construct(&format!(
                "CONSTRUCT {{ ?s ?p ?o }} WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} }}",
                CTX
            ))
            .unwrap();
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_connect_unknown_type() {
        assert!(connect("sesame", "", "docrepo").is_err());
        assert!(connect("oxigraph", "", "docrepo").is_ok());
    }
}
