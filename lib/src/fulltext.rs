//! The full-text index collaborator.
//!
//! `relate_fulltext` pushes one entry per indexable resource into an index through the
//! [`FulltextIndex`] trait. The index schema is derived from the facets of every
//! repository that shares the index, and values are checked against it on `update`:
//! dates, booleans and integers must arrive with the right type.

use crate::errors::FieldTypeError;
use crate::repository::Repository;
use crate::util::atomic_write;
use crate::value::to_pretty_json;
use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use oxigraph::model::LiteralRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::PathBuf;

use crate::consts::{XSD_BOOLEAN, XSD_DATE, XSD_DATETIME, XSD_INTEGER};

/// How a facet's values are stored in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IndexedType {
    Identifier,
    Datetime,
    Text { boost: u32 },
    Label { boost: u32 },
    Keyword,
    Boolean,
    Integer,
    Uri,
    Resource,
}

impl IndexedType {
    fn name(&self) -> &'static str {
        match self {
            IndexedType::Identifier => "identifier",
            IndexedType::Datetime => "datetime",
            IndexedType::Text { .. } => "text",
            IndexedType::Label { .. } => "label",
            IndexedType::Keyword => "keyword",
            IndexedType::Boolean => "boolean",
            IndexedType::Integer => "integer",
            IndexedType::Uri => "uri",
            IndexedType::Resource => "resource",
        }
    }

    fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (_, FieldValue::Many(values)) => values.iter().all(|v| self.accepts(v)),
            (IndexedType::Datetime, FieldValue::Date(_) | FieldValue::DateTime(_)) => true,
            (IndexedType::Boolean, FieldValue::Boolean(_)) => true,
            (IndexedType::Integer, FieldValue::Integer(_)) => true,
            (IndexedType::Resource, FieldValue::Resource { .. }) => true,
            (
                IndexedType::Identifier
                | IndexedType::Text { .. }
                | IndexedType::Label { .. }
                | IndexedType::Keyword
                | IndexedType::Uri,
                FieldValue::Text(_),
            ) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Boolean(bool),
    Integer(i64),
    Resource { iri: String, label: String },
    Many(Vec<FieldValue>),
}

impl FieldValue {
    /// Typed value of an RDF literal. Untyped and unknown literals become text.
    pub fn from_literal(literal: LiteralRef<'_>) -> FieldValue {
        let value = literal.value();
        let datatype = literal.datatype();
        let typed = if datatype == XSD_DATE {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(FieldValue::Date)
        } else if datatype == XSD_DATETIME {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .or_else(|| {
                    chrono::DateTime::parse_from_rfc3339(value)
                        .ok()
                        .map(|dt| dt.naive_utc())
                })
                .map(FieldValue::DateTime)
        } else if datatype == XSD_BOOLEAN {
            match value {
                "true" | "1" => Some(FieldValue::Boolean(true)),
                "false" | "0" => Some(FieldValue::Boolean(false)),
                _ => None,
            }
        } else if datatype == XSD_INTEGER {
            value.parse().ok().map(FieldValue::Integer)
        } else {
            None
        };
        typed.unwrap_or_else(|| FieldValue::Text(value.to_string()))
    }

    fn type_name(&self) -> String {
        match self {
            FieldValue::Text(s) => format!("text {:?}", s),
            FieldValue::Date(_) => "date".to_string(),
            FieldValue::DateTime(_) => "datetime".to_string(),
            FieldValue::Boolean(_) => "boolean".to_string(),
            FieldValue::Integer(_) => "integer".to_string(),
            FieldValue::Resource { .. } => "resource".to_string(),
            FieldValue::Many(_) => "list".to_string(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        match self {
            FieldValue::Text(s) => s.to_lowercase().contains(needle),
            FieldValue::Resource { iri, label } => {
                iri.to_lowercase() == needle || label.to_lowercase().contains(needle)
            }
            FieldValue::Many(values) => values.iter().any(|v| v.matches(needle)),
            FieldValue::Date(d) => d.to_string() == needle,
            FieldValue::DateTime(dt) => dt.to_string().starts_with(needle),
            FieldValue::Boolean(b) => b.to_string() == needle,
            FieldValue::Integer(i) => i.to_string() == needle,
        }
    }
}

/// Field name to type. Always contains `uri`, `repo`, `basefile` and `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    fields: BTreeMap<String, IndexedType>,
}

impl Default for IndexSchema {
    fn default() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("uri".to_string(), IndexedType::Identifier);
        fields.insert("repo".to_string(), IndexedType::Label { boost: 1 });
        fields.insert("basefile".to_string(), IndexedType::Label { boost: 1 });
        fields.insert("text".to_string(), IndexedType::Text { boost: 1 });
        IndexSchema { fields }
    }
}

impl IndexSchema {
    pub fn from_repos(repos: &[&dyn Repository]) -> Result<Self> {
        let mut schema = IndexSchema::default();
        for repo in repos {
            for facet in repo.facets() {
                let binding = facet.binding(repo.namespaces());
                match schema.fields.get(&binding) {
                    Some(existing) if *existing != facet.indexingtype => {
                        return Err(anyhow!(
                            "Conflicting index types for field {}: {} and {}",
                            binding,
                            existing.name(),
                            facet.indexingtype.name()
                        ))
                    }
                    Some(_) => {}
                    None => {
                        schema.fields.insert(binding, facet.indexingtype);
                    }
                }
            }
        }
        Ok(schema)
    }

    pub fn field(&self, name: &str) -> Option<IndexedType> {
        self.fields.get(name).copied()
    }

    pub fn check(&self, field: &str, value: &FieldValue) -> Result<()> {
        let expected = self
            .field(field)
            .ok_or_else(|| anyhow!("Field {} is not part of the index schema", field))?;
        if expected.accepts(value) {
            Ok(())
        } else {
            Err(FieldTypeError {
                field: field.to_string(),
                expected: expected.name().to_string(),
                found: value.type_name(),
            }
            .into())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub uri: String,
    pub repo: String,
    pub basefile: String,
    pub text: String,
    pub fields: BTreeMap<String, FieldValue>,
}

pub trait FulltextIndex {
    /// Adds or replaces the entry for `uri`. Visible to queries after [`commit`](Self::commit).
    fn update(
        &mut self,
        uri: &str,
        repo: &str,
        basefile: &str,
        text: &str,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn query(&self, querystring: &str) -> Result<Vec<IndexedDocument>>;

    fn doccount(&self) -> Result<usize>;
}

/// An index kept in memory, optionally persisted as JSON on every commit.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    schema: IndexSchema,
    location: Option<PathBuf>,
    documents: BTreeMap<String, IndexedDocument>,
    pending: Vec<IndexedDocument>,
}

impl MemoryIndex {
    pub fn new(schema: IndexSchema) -> Self {
        MemoryIndex {
            schema,
            ..Default::default()
        }
    }

    /// Opens the index persisted at `location`, starting empty if nothing is there yet.
    pub fn open(location: PathBuf, schema: IndexSchema) -> Result<Self> {
        let documents = if location.exists() {
            let file = std::fs::File::open(&location)?;
            let docs: Vec<IndexedDocument> = serde_json::from_reader(BufReader::new(file))?;
            docs.into_iter().map(|d| (d.uri.clone(), d)).collect()
        } else {
            BTreeMap::new()
        };
        debug!(
            "Opened index at {} with {} documents",
            location.display(),
            documents.len()
        );
        Ok(MemoryIndex {
            schema,
            location: Some(location),
            documents,
            pending: vec![],
        })
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }
}

impl FulltextIndex for MemoryIndex {
    fn update(
        &mut self,
        uri: &str,
        repo: &str,
        basefile: &str,
        text: &str,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<()> {
        for (field, value) in &fields {
            self.schema.check(field, value)?;
        }
        self.pending.push(IndexedDocument {
            uri: uri.to_string(),
            repo: repo.to_string(),
            basefile: basefile.to_string(),
            text: text.to_string(),
            fields,
        });
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let count = self.pending.len();
        for doc in self.pending.drain(..) {
            self.documents.insert(doc.uri.clone(), doc);
        }
        if let Some(location) = &self.location {
            let docs: Vec<&IndexedDocument> = self.documents.values().collect();
            atomic_write(location, &to_pretty_json(&docs)?)?;
        }
        if count > 0 {
            debug!("Committed {} documents to the index", count);
        }
        Ok(())
    }

    /// Every whitespace separated term must match. `field:value` terms match a single
    /// field, bare terms match the text or any text-like field.
    fn query(&self, querystring: &str) -> Result<Vec<IndexedDocument>> {
        let terms: Vec<String> = querystring
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        let hits = self
            .documents
            .values()
            .filter(|doc| {
                terms.iter().all(|term| match term.split_once(':') {
                    Some((field, needle)) if self.schema.field(field).is_some() => {
                        match field {
                            "uri" => doc.uri.to_lowercase() == needle,
                            "repo" => doc.repo.to_lowercase() == needle,
                            "basefile" => doc.basefile.to_lowercase() == needle,
                            "text" => doc.text.to_lowercase().contains(needle),
                            _ => doc.fields.get(field).is_some_and(|v| v.matches(needle)),
                        }
                    }
                    _ => {
                        doc.text.to_lowercase().contains(term.as_str())
                            || doc.fields.values().any(|v| v.matches(term))
                    }
                })
            })
            .cloned()
            .collect();
        Ok(hits)
    }

    fn doccount(&self) -> Result<usize> {
        Ok(self.documents.len())
    }
}

/// Opens the index of the given type, with a schema covering every repository in `repos`.
pub fn connect(
    indextype: &str,
    location: &str,
    repos: &[&dyn Repository],
) -> Result<Box<dyn FulltextIndex>> {
    let schema = IndexSchema::from_repos(repos)?;
    match indextype {
        "memory" => {
            let index = if location.is_empty() {
                MemoryIndex::new(schema)
            } else {
                MemoryIndex::open(PathBuf::from(location), schema)?
            };
            info!("Connected to {} index", indextype);
            Ok(Box::new(index))
        }
        other => Err(anyhow!("Unsupported full-text index type {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::Literal;

    fn schema() -> IndexSchema {
        let mut schema = IndexSchema::default();
        schema
            .fields
            .insert("dcterms_issued".to_string(), IndexedType::Datetime);
        schema
            .fields
            .insert("dcterms_title".to_string(), IndexedType::Text { boost: 4 });
        schema
            .fields
            .insert("schema_free".to_string(), IndexedType::Boolean);
        schema
    }

    #[test]
    fn test_typed_literals() {
        let date = Literal::new_typed_literal("2010-06-30", XSD_DATE);
        assert_eq!(
            FieldValue::from_literal(date.as_ref()),
            FieldValue::Date(NaiveDate::from_ymd_opt(2010, 6, 30).unwrap())
        );
        let plain = Literal::new_simple_literal("2010-06-30");
        assert_eq!(
            FieldValue::from_literal(plain.as_ref()),
            FieldValue::Text("2010-06-30".to_string())
        );
        let free = Literal::new_typed_literal("true", XSD_BOOLEAN);
        assert_eq!(FieldValue::from_literal(free.as_ref()), FieldValue::Boolean(true));
    }

    #[test]
    fn test_update_rejects_wrong_types() {
        let mut index = MemoryIndex::new(schema());
        let mut fields = BTreeMap::new();
        fields.insert(
            "dcterms_issued".to_string(),
            FieldValue::Text("2010-06-30".to_string()),
        );
        let err = index
            .update("http://example.org/1", "base", "1", "text", fields)
            .unwrap_err();
        assert!(err.downcast_ref::<FieldTypeError>().is_some());

        let mut fields = BTreeMap::new();
        fields.insert("unknown".to_string(), FieldValue::Text("x".to_string()));
        assert!(index
            .update("http://example.org/1", "base", "1", "text", fields)
            .is_err());
    }

    #[test]
    fn test_commit_query_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("index.json");
        let mut index = MemoryIndex::open(location.clone(), schema()).unwrap();
        let mut fields = BTreeMap::new();
        fields.insert(
            "dcterms_title".to_string(),
            FieldValue::Text("Regulation on widgets".to_string()),
        );
        fields.insert("schema_free".to_string(), FieldValue::Boolean(true));
        index
            .update(
                "http://example.org/1",
                "base",
                "1",
                "All widgets must be blue",
                fields,
            )
            .unwrap();
        assert_eq!(index.doccount().unwrap(), 0);
        index.commit().unwrap();
        assert_eq!(index.doccount().unwrap(), 1);
        assert_eq!(index.query("widgets blue").unwrap().len(), 1);
        assert_eq!(index.query("schema_free:true").unwrap().len(), 1);
        assert_eq!(index.query("green").unwrap().len(), 0);

        let reopened = MemoryIndex::open(location, schema()).unwrap();
        assert_eq!(reopened.doccount().unwrap(), 1);
    }
}
