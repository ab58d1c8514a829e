//! A document repository: the set of documents published under one alias, the facets
//! describing them and the hooks that the pipeline stages call.
//!
//! [`Repository`] carries defaults for every hook; an integrator overrides only what its
//! documents need. [`DocumentRepository`] is the ready-made implementation.

use crate::config::Config;
use crate::consts::DOCUMENT;
use crate::docstore::DocumentStore;
use crate::entry::DocumentEntry;
use crate::facet::{check_unique_bindings, default_facets, Facet};
use crate::namespaces::NamespaceMap;
use crate::options::StoragePolicy;
use crate::resource::ResourceGraph;
use crate::toc::TocItem;
use crate::util::quote;
use crate::value::{get_text, Row};
use anyhow::{anyhow, Result};
use log::{debug, warn};
use oxigraph::model::NamedNode;
use std::path::Path;
use url::Url;

pub trait Repository {
    fn alias(&self) -> &str;

    fn config(&self) -> &Config;

    fn store(&self) -> &DocumentStore;

    /// Shared data about publishers, subjects and the like, used to label resources.
    fn commondata(&self) -> &ResourceGraph;

    fn namespaces(&self) -> &NamespaceMap {
        self.commondata().namespaces()
    }

    /// The document types selected by the facet query.
    fn rdf_type(&self) -> Vec<NamedNode> {
        vec![DOCUMENT.into_owned()]
    }

    fn facets(&self) -> &[Facet];

    fn collate_locale(&self) -> Option<&str> {
        self.config().collate_locale.as_deref()
    }

    fn canonical_uri(&self, basefile: &str) -> String {
        format!("{}res/{}/{}", self.config().url, self.alias(), basefile)
    }

    /// `<url>dataset/<alias>`, optionally narrowed to a feed (`feed` is appended to
    /// `/feed`, so `Some(".atom")` gives `/feed.atom`) and to one parameter value.
    fn dataset_uri(&self, param: Option<(&str, &str)>, feed: Option<&str>) -> String {
        let mut uri = format!("{}dataset/{}", self.config().url, self.alias());
        if let Some(suffix) = feed {
            uri.push_str("/feed");
            uri.push_str(suffix);
        }
        if let Some((param, value)) = param {
            if !param.is_empty() && !value.is_empty() {
                uri.push_str(&format!("?{}={}", param, quote(value, "/")));
            }
        }
        uri
    }

    /// Inverse of [`canonical_uri`](Self::canonical_uri). Fragments and file suffixes
    /// are stripped; URIs of other repositories, or with an empty basefile, give `None`.
    fn basefile_from_uri(&self, uri: &str) -> Option<String> {
        let prefix = format!("{}res/", self.config().url);
        let path = uri.strip_prefix(&prefix)?;
        let (alias, basefile) = path.split_once('/')?;
        if alias != self.alias() {
            return None;
        }
        let basefile = match basefile.split_once('#') {
            Some((b, _)) => b,
            None => basefile.split('.').next().unwrap_or(basefile),
        };
        if basefile.is_empty() {
            return None;
        }
        Some(basefile.to_string())
    }

    /// Local URL of the file of `basefile` under `maindir`.
    fn generic_url(&self, basefile: &str, maindir: &str, suffix: &str) -> String {
        format!(
            "{}{}/{}/{}{}",
            self.config().url,
            self.alias(),
            maindir,
            basefile,
            suffix
        )
    }

    fn generated_url(&self, basefile: &str) -> String {
        self.generic_url(basefile, "generated", ".html")
    }

    fn parsed_url(&self, basefile: &str) -> String {
        self.generic_url(basefile, "parsed", ".xhtml")
    }

    fn distilled_url(&self, basefile: &str) -> String {
        self.generic_url(basefile, "distilled", ".rdf")
    }

    /// Renders one row of a table of contents page.
    fn toc_item(&self, _binding: &str, row: &Row) -> TocItem {
        let uri = get_text(row, "uri").unwrap_or_default();
        let label = match get_text(row, "dcterms_title").or_else(|_| get_text(row, "dcterms_identifier")) {
            Ok(label) => label,
            Err(_) => {
                warn!("{} has no title or identifier, using its URI as label", uri);
                uri.clone()
            }
        };
        TocItem { label, uri }
    }

    /// Decorates a feed entry before it is sorted. `binding` is `None` for the main feed.
    fn news_item(&self, _binding: Option<&str>, row: Row) -> Row {
        row
    }

    fn news_sortkey(&self) -> &str {
        &self.config().news_sortkey
    }

    fn news_feedsets_main_label(&self) -> &str {
        "All documents"
    }

    /// Published entries whose distilled file exists, with missing fields filled in.
    fn news_entries(&self) -> Result<Vec<DocumentEntry>> {
        let store = self.store();
        let mut entries = vec![];
        for basefile in store.list_basefiles_for("news")? {
            let path = store.documententry_path(&basefile);
            let mut entry = match DocumentEntry::load(&path) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("{}: Couldn't load entry: {}", basefile, e);
                    continue;
                }
            };
            if entry.published.is_none() {
                continue;
            }
            if !store.distilled_path(&basefile).exists() {
                if store.downloaded_path(&basefile).exists() {
                    warn!(
                        "{}: No distilled file at {}, skipping",
                        basefile,
                        store.distilled_path(&basefile).display()
                    );
                } else {
                    warn!(
                        "{}: Entry file for {} probably stale",
                        path.display(),
                        basefile
                    );
                }
                continue;
            }
            let mut dirty = false;
            if entry.id.is_none() {
                entry.id = Some(self.canonical_uri(&basefile));
                dirty = true;
            }
            if entry.url.is_none() {
                entry.url = Some(self.generated_url(&basefile));
                dirty = true;
            }
            if entry.basefile.is_none() {
                entry.basefile = Some(basefile.clone());
                dirty = true;
            }
            if entry.title.is_none() {
                entry.title = entry.id.clone();
                dirty = true;
            }
            if entry.link.is_none() {
                entry.link = Some(self.distilled_url(&basefile));
                dirty = true;
            }
            if entry.content.is_none() {
                entry.content = Some(self.parsed_url(&basefile));
                dirty = true;
            }
            if dirty {
                entry.save(&path)?;
            }
            entries.push(entry);
        }
        debug!("{}: {} news entries", self.alias(), entries.len());
        Ok(entries)
    }

    fn add_dependency(&self, basefile: &str, dependency: &Path) -> Result<bool> {
        self.store()
            .add_dependency(basefile, &dependency.to_string_lossy())
    }
}

/// A repository configured entirely through data: alias, config, facets and commondata.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    alias: String,
    config: Config,
    store: DocumentStore,
    commondata: ResourceGraph,
    rdf_type: Vec<NamedNode>,
    facets: Vec<Facet>,
}

impl DocumentRepository {
    pub fn new(alias: &str, config: Config) -> Result<Self> {
        if alias.is_empty() || alias.contains('/') {
            return Err(anyhow!("Invalid repository alias {:?}", alias));
        }
        let base = Url::parse(&config.url)
            .map_err(|e| anyhow!("Invalid base url {:?}: {}", config.url, e))?;
        if !base.path().ends_with('/') {
            return Err(anyhow!("Base url {} must end with a slash", config.url));
        }
        let store = DocumentStore::new(config.datadir.join(alias));
        Ok(DocumentRepository {
            alias: alias.to_string(),
            config,
            store,
            commondata: ResourceGraph::default(),
            rdf_type: vec![DOCUMENT.into_owned()],
            facets: default_facets(),
        })
    }

    /// Replaces the facet list. Two facets may not share a binding.
    pub fn with_facets(mut self, facets: Vec<Facet>) -> Result<Self> {
        check_unique_bindings(&facets, self.commondata.namespaces())?;
        self.facets = facets;
        Ok(self)
    }

    pub fn with_rdf_type(mut self, rdf_type: Vec<NamedNode>) -> Self {
        self.rdf_type = rdf_type;
        self
    }

    pub fn with_commondata(mut self, commondata: ResourceGraph) -> Result<Self> {
        check_unique_bindings(&self.facets, commondata.namespaces())?;
        self.commondata = commondata;
        Ok(self)
    }

    pub fn with_storage_policy(mut self, policy: StoragePolicy) -> Self {
        self.store = self.store.with_storage_policy(policy);
        self
    }
}

impl Repository for DocumentRepository {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn store(&self) -> &DocumentStore {
        &self.store
    }

    fn commondata(&self) -> &ResourceGraph {
        &self.commondata
    }

    fn rdf_type(&self) -> Vec<NamedNode> {
        self.rdf_type.clone()
    }

    fn facets(&self) -> &[Facet] {
        &self.facets
    }
}
