//! Facets: the dimensions (RDF predicates) along which documents are grouped, sorted
//! and indexed.
//!
//! A facet carries three strategies. The *selector* maps a row to the bucket it belongs
//! to ("a", "2009", "Acme Publishing"), the *identificator* maps it to a URL-safe name for
//! that bucket, and the *key* orders rows inside a bucket. Strategies are small named
//! types implementing [`Selector`] or [`SortKey`]; the built-in ones cover the common
//! predicates and repositories may supply their own.

use crate::collate::{collator_for, Collator};
use crate::consts;
use crate::errors::FacetError;
use crate::fulltext::IndexedType;
use crate::namespaces::{uri_leaf, NamespaceMap};
use crate::resource::ResourceGraph;
use crate::util::{fill_template, title_sortkey};
use crate::value::{get, get_text, Row, Value};
use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use derive_builder::Builder;
use oxigraph::model::{NamedNode, NamedNodeRef};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_LABEL: &str = "Sorted by %(term)s";
pub const DEFAULT_PAGETITLE: &str = "Documents where %(term)s = %(selected)s";

/// Maps a row to a bucket value. `Ok(None)` puts the row in the bucket without a value.
pub trait Selector: fmt::Debug + Send + Sync {
    fn select(
        &self,
        row: &Row,
        binding: &str,
        resources: &ResourceGraph,
    ) -> Result<Option<String>, FacetError>;
}

/// Maps a row to the value it is ordered by within its bucket.
pub trait SortKey: fmt::Debug + Send + Sync {
    fn key(&self, row: &Row, binding: &str, resources: &ResourceGraph)
        -> Result<Value, FacetError>;
}

/// The value itself, as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSelector;

impl Selector for DefaultSelector {
    fn select(&self, row: &Row, binding: &str, _: &ResourceGraph) -> Result<Option<String>, FacetError> {
        get_text(row, binding).map(Some)
    }
}

/// Year of a date, a datetime, or a `YYYY-MM` string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Year;

impl Selector for Year {
    fn select(&self, row: &Row, binding: &str, _: &ResourceGraph) -> Result<Option<String>, FacetError> {
        let value = get(row, binding)?;
        if let Some(date) = value.date() {
            return Ok(Some(date.year().to_string()));
        }
        let text = value.to_string();
        if text.len() == 7 {
            if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d") {
                return Ok(Some(date.year().to_string()));
            }
        }
        Err(FacetError::Unparseable {
            binding: binding.to_string(),
            value: text,
        })
    }
}

/// `"true"` for the literal `true`, `"false"` for anything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanValue;

impl Selector for BooleanValue {
    fn select(&self, row: &Row, binding: &str, _: &ResourceGraph) -> Result<Option<String>, FacetError> {
        let text = get_text(row, binding)?;
        Ok(Some((text == "true").to_string()))
    }
}

/// First character of the title sort key.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstLetter;

impl Selector for FirstLetter {
    fn select(&self, row: &Row, binding: &str, _: &ResourceGraph) -> Result<Option<String>, FacetError> {
        let text = get_text(row, binding)?;
        match title_sortkey(&text).chars().next() {
            Some(c) => Ok(Some(c.to_string())),
            None => Err(FacetError::Unparseable {
                binding: binding.to_string(),
                value: text,
            }),
        }
    }
}

/// Label of the resource the value points to, or the value itself when it has none.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceLabel;

impl Selector for ResourceLabel {
    fn select(&self, row: &Row, binding: &str, resources: &ResourceGraph) -> Result<Option<String>, FacetError> {
        let uri = get_text(row, binding)?;
        Ok(Some(resources.label(&uri).unwrap_or(uri)))
    }
}

/// Prefixed name of a URI value (`foaf:Document`).
#[derive(Debug, Clone, Copy, Default)]
pub struct QName;

impl Selector for QName {
    fn select(&self, row: &Row, binding: &str, resources: &ResourceGraph) -> Result<Option<String>, FacetError> {
        let uri = get_text(row, binding)?;
        Ok(Some(resources.qname(&uri).unwrap_or(uri)))
    }
}

/// Last segment of a URI value, usable as a URL fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Term;

impl Selector for Term {
    fn select(&self, row: &Row, binding: &str, _: &ResourceGraph) -> Result<Option<String>, FacetError> {
        let uri = get_text(row, binding)?;
        Ok(Some(uri_leaf(&uri).to_string()))
    }
}

/// Every row falls in the same, unnamed bucket.
#[derive(Debug, Clone, Copy, Default)]
pub struct Constant;

impl Selector for Constant {
    fn select(&self, _: &Row, _: &str, _: &ResourceGraph) -> Result<Option<String>, FacetError> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKey;

impl SortKey for DefaultKey {
    fn key(&self, row: &Row, binding: &str, _: &ResourceGraph) -> Result<Value, FacetError> {
        get(row, binding).cloned()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TitleSortKey;

impl SortKey for TitleSortKey {
    fn key(&self, row: &Row, binding: &str, _: &ResourceGraph) -> Result<Value, FacetError> {
        Ok(Value::Str(title_sortkey(&get_text(row, binding)?)))
    }
}

/// Title sort key of the resource label.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortResource;

impl SortKey for SortResource {
    fn key(&self, row: &Row, binding: &str, resources: &ResourceGraph) -> Result<Value, FacetError> {
        let uri = get_text(row, binding)?;
        let label = resources.label(&uri).unwrap_or(uri);
        Ok(Value::Str(title_sortkey(&label)))
    }
}

/// Value of a fixed field, regardless of the facet binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey(pub String);

impl SortKey for FieldKey {
    fn key(&self, row: &Row, _: &str, _: &ResourceGraph) -> Result<Value, FacetError> {
        get(row, &self.0).cloned()
    }
}

#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", build_fn(skip))]
pub struct Facet {
    /// The predicate (or type) this facet groups by.
    #[builder(setter(into))]
    pub rdftype: NamedNode,
    #[builder(setter(into))]
    pub label: String,
    #[builder(setter(into))]
    pub pagetitle: String,
    pub indexingtype: IndexedType,
    #[builder(setter(custom))]
    pub selector: Arc<dyn Selector>,
    #[builder(setter(custom))]
    pub identificator: Arc<dyn Selector>,
    #[builder(setter(custom))]
    pub key: Arc<dyn SortKey>,
    pub toplevel_only: bool,
    pub use_for_toc: bool,
    pub use_for_feed: bool,
    pub selector_descending: bool,
    pub key_descending: bool,
    pub multiple_values: bool,
    #[builder(setter(into, strip_option))]
    pub dimension_type: Option<String>,
    /// Overrides the binding name and term; used when a predicate is bucketed unusually.
    #[builder(setter(into, strip_option))]
    pub dimension_label: Option<String>,
    #[builder(setter(into, strip_option))]
    pub collate_locale: Option<String>,
}

impl FacetBuilder {
    pub fn selector<S: Selector + 'static>(mut self, selector: S) -> Self {
        self.selector = Some(Arc::new(selector));
        self
    }

    pub fn identificator<S: Selector + 'static>(mut self, identificator: S) -> Self {
        self.identificator = Some(Arc::new(identificator));
        self
    }

    pub fn key<K: SortKey + 'static>(mut self, key: K) -> Self {
        self.key = Some(Arc::new(key));
        self
    }

    pub fn build(self) -> Result<Facet> {
        let rdftype = self
            .rdftype
            .clone()
            .ok_or_else(|| anyhow!("A facet must have an rdftype"))?;
        Ok(self.finish(rdftype))
    }

    // fills everything not given explicitly from the per-predicate defaults
    fn finish(self, rdftype: NamedNode) -> Facet {
        let d = defaults_for(rdftype.as_ref());
        let selector = self
            .selector
            .or(d.selector)
            .unwrap_or_else(|| Arc::new(DefaultSelector));
        let identificator = self
            .identificator
            .or(d.identificator)
            .unwrap_or_else(|| selector.clone());
        Facet {
            label: self
                .label
                .or(d.label.map(String::from))
                .unwrap_or_else(|| DEFAULT_LABEL.to_string()),
            pagetitle: self
                .pagetitle
                .or(d.pagetitle.map(String::from))
                .unwrap_or_else(|| DEFAULT_PAGETITLE.to_string()),
            indexingtype: self
                .indexingtype
                .or(d.indexingtype)
                .unwrap_or(IndexedType::Text { boost: 1 }),
            selector,
            identificator,
            key: self
                .key
                .or(d.key)
                .unwrap_or_else(|| Arc::new(DefaultKey)),
            toplevel_only: self.toplevel_only.unwrap_or(d.toplevel_only),
            use_for_toc: self.use_for_toc.unwrap_or(d.use_for_toc),
            use_for_feed: self.use_for_feed.unwrap_or(d.use_for_feed),
            selector_descending: self.selector_descending.unwrap_or(false),
            key_descending: self.key_descending.unwrap_or(false),
            multiple_values: self.multiple_values.unwrap_or(d.multiple_values),
            dimension_type: self
                .dimension_type
                .unwrap_or_else(|| d.dimension_type.map(String::from)),
            dimension_label: self.dimension_label.unwrap_or(None),
            collate_locale: self.collate_locale.unwrap_or(None),
            rdftype,
        }
    }
}

#[derive(Default)]
struct Defaults {
    label: Option<&'static str>,
    pagetitle: Option<&'static str>,
    indexingtype: Option<IndexedType>,
    selector: Option<Arc<dyn Selector>>,
    identificator: Option<Arc<dyn Selector>>,
    key: Option<Arc<dyn SortKey>>,
    toplevel_only: bool,
    use_for_toc: bool,
    use_for_feed: bool,
    multiple_values: bool,
    dimension_type: Option<&'static str>,
}

fn defaults_for(rdftype: NamedNodeRef<'_>) -> Defaults {
    if rdftype == consts::TYPE {
        Defaults {
            indexingtype: Some(IndexedType::Uri),
            use_for_feed: true,
            selector: Some(Arc::new(QName)),
            identificator: Some(Arc::new(Term)),
            key: Some(Arc::new(DefaultKey)),
            dimension_type: Some("term"),
            ..Default::default()
        }
    } else if rdftype == consts::TITLE {
        Defaults {
            pagetitle: Some("Documents starting with \"%(selected)s\""),
            indexingtype: Some(IndexedType::Text { boost: 4 }),
            use_for_toc: true,
            selector: Some(Arc::new(FirstLetter)),
            identificator: Some(Arc::new(FirstLetter)),
            key: Some(Arc::new(TitleSortKey)),
            dimension_type: Some("value"),
            ..Default::default()
        }
    } else if rdftype == consts::IDENTIFIER {
        Defaults {
            indexingtype: Some(IndexedType::Label { boost: 16 }),
            use_for_toc: true,
            selector: Some(Arc::new(FirstLetter)),
            identificator: Some(Arc::new(FirstLetter)),
            key: Some(Arc::new(TitleSortKey)),
            dimension_type: Some("value"),
            ..Default::default()
        }
    } else if rdftype == consts::ABSTRACT {
        Defaults {
            indexingtype: Some(IndexedType::Text { boost: 2 }),
            toplevel_only: true,
            ..Default::default()
        }
    } else if rdftype == consts::CREATOR {
        Defaults {
            indexingtype: Some(IndexedType::Label { boost: 1 }),
            toplevel_only: true,
            use_for_toc: true,
            selector: Some(Arc::new(DefaultSelector)),
            identificator: Some(Arc::new(DefaultSelector)),
            key: Some(Arc::new(TitleSortKey)),
            dimension_type: Some("value"),
            ..Default::default()
        }
    } else if rdftype == consts::PUBLISHER {
        Defaults {
            indexingtype: Some(IndexedType::Resource),
            toplevel_only: true,
            use_for_toc: true,
            use_for_feed: true,
            selector: Some(Arc::new(ResourceLabel)),
            identificator: Some(Arc::new(Term)),
            key: Some(Arc::new(SortResource)),
            dimension_type: Some("ref"),
            ..Default::default()
        }
    } else if rdftype == consts::REFERENCES {
        Defaults {
            indexingtype: Some(IndexedType::Uri),
            ..Default::default()
        }
    } else if rdftype == consts::ISSUED {
        Defaults {
            label: Some("Sorted by publication year"),
            pagetitle: Some("Documents published in %(selected)s"),
            indexingtype: Some(IndexedType::Datetime),
            toplevel_only: true,
            use_for_toc: true,
            selector: Some(Arc::new(Year)),
            identificator: Some(Arc::new(Year)),
            key: Some(Arc::new(DefaultKey)),
            dimension_type: Some("year"),
            ..Default::default()
        }
    } else if rdftype == consts::DC_SUBJECT || rdftype == consts::DCTERMS_SUBJECT {
        Defaults {
            indexingtype: Some(if rdftype == consts::DC_SUBJECT {
                IndexedType::Keyword
            } else {
                IndexedType::Resource
            }),
            toplevel_only: true,
            use_for_toc: true,
            multiple_values: true,
            selector: Some(Arc::new(DefaultSelector)),
            identificator: Some(Arc::new(DefaultSelector)),
            key: Some(Arc::new(DefaultKey)),
            dimension_type: Some("value"),
            ..Default::default()
        }
    } else if rdftype == consts::FREE {
        Defaults {
            indexingtype: Some(IndexedType::Boolean),
            toplevel_only: true,
            use_for_toc: true,
            selector: Some(Arc::new(BooleanValue)),
            identificator: Some(Arc::new(BooleanValue)),
            key: Some(Arc::new(DefaultKey)),
            dimension_type: Some("value"),
            ..Default::default()
        }
    } else {
        Defaults::default()
    }
}

impl Facet {
    /// A facet for `rdftype` with every setting taken from its defaults.
    pub fn new(rdftype: NamedNodeRef<'_>) -> Facet {
        Facet::builder().finish(rdftype.into_owned())
    }

    pub fn builder() -> FacetBuilder {
        FacetBuilder::default()
    }

    /// Row key / query variable for this facet: the dimension label, or the predicate's
    /// prefixed name with `:` replaced by `_`.
    pub fn binding(&self, namespaces: &NamespaceMap) -> String {
        match &self.dimension_label {
            Some(label) => label.clone(),
            None => namespaces.binding(self.rdftype.as_str()),
        }
    }

    /// Human name of the dimension, substituted for `%(term)s` in templates.
    pub fn term(&self) -> String {
        match &self.dimension_label {
            Some(label) => label.clone(),
            None => uri_leaf(self.rdftype.as_str()).to_string(),
        }
    }

    pub fn label_text(&self) -> String {
        let term = self.term();
        let mut values = BTreeMap::new();
        values.insert("term", term.as_str());
        fill_template(&self.label, &values)
    }

    pub fn pagetitle_text(&self, selected: &str) -> String {
        let term = self.term();
        let mut values = BTreeMap::new();
        values.insert("term", term.as_str());
        values.insert("selected", selected);
        fill_template(&self.pagetitle, &values)
    }

    /// The facet's own locale wins over the repository-wide one.
    pub fn collator(&self, repo_locale: Option<&str>) -> Box<dyn Collator> {
        collator_for(self.collate_locale.as_deref().or(repo_locale))
    }

    pub fn is_resource(&self) -> bool {
        self.indexingtype == IndexedType::Resource
    }
}

impl PartialEq for Facet {
    // only what changes the set of selected data
    fn eq(&self, other: &Self) -> bool {
        self.rdftype == other.rdftype
            && self.dimension_type == other.dimension_type
            && self.dimension_label == other.dimension_label
            && format!("{:?}", self.selector) == format!("{:?}", other.selector)
    }
}

/// The facets every repository starts out with.
pub fn default_facets() -> Vec<Facet> {
    vec![
        Facet::new(consts::TYPE),
        Facet::new(consts::TITLE),
        Facet::new(consts::PUBLISHER),
        Facet::new(consts::IDENTIFIER),
        Facet::new(consts::ISSUED),
    ]
}

/// Fails when two facets would write to the same row binding.
pub fn check_unique_bindings(facets: &[Facet], namespaces: &NamespaceMap) -> Result<()> {
    let mut seen = HashSet::new();
    for facet in facets {
        let binding = facet.binding(namespaces);
        if !seen.insert(binding.clone()) {
            return Err(anyhow!(
                "Two facets share the binding {} ({})",
                binding,
                facet.rdftype
            ));
        }
    }
    Ok(())
}
