//! Feed partitioning.
//!
//! Works like the table of contents, but buckets are feeds: every facet with
//! `use_for_feed` becomes a [`Feedset`] with one [`Feed`] per selector value, and a final
//! "All" feedset holds a single feed with every published entry.

use crate::consts::{FACETED_DATA_CACHE, FACETED_ENTRIES_CACHE, FEEDSETS_CACHE, FEED_DIR, NEWS_INDEX, RESOURCE};
use crate::entry::DocumentEntry;
use crate::facet::{Constant, Facet, FieldKey};
use crate::faceted::faceted_data;
use crate::options::RefreshStrategy;
use crate::repository::Repository;
use crate::toc::sort_rows;
use crate::triplestore::TripleStore;
use crate::util::{atomic_write, list_files, outfile_is_newer};
use crate::value::{read_rows, to_pretty_json, write_rows, Row, Value, FACETED_ENTRIES_DATE_FIELDS};
use anyhow::Result;
use log::{debug, warn};
use oxigraph::model::NamedNode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{serde_as, DeserializeAs, SerializeAs};
use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

const FEEDSETS_CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub slug: String,
    pub title: String,
    /// `None` for the feed of all documents.
    pub binding: Option<String>,
    pub value: Option<String>,
    #[serde(skip)]
    pub entries: Vec<Row>,
}

/// Serializes an IRI as a plain string.
pub struct IriString;

impl SerializeAs<NamedNode> for IriString {
    fn serialize_as<S: Serializer>(source: &NamedNode, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(source.as_str())
    }
}

impl<'de> DeserializeAs<'de, NamedNode> for IriString {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<NamedNode, D::Error> {
        let iri = String::deserialize(deserializer)?;
        NamedNode::new(iri).map_err(serde::de::Error::custom)
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedset {
    pub label: String,
    #[serde_as(as = "Option<IriString>")]
    pub predicate: Option<NamedNode>,
    pub feeds: Vec<Feed>,
}

#[derive(Serialize, Deserialize)]
struct FeedsetCache {
    version: u32,
    feedsets: Vec<Feedset>,
}

fn entry_to_row(row: &mut Row, entry: &DocumentEntry) {
    let dates = [
        ("updated", entry.updated),
        ("published", entry.published),
        ("orig_updated", entry.orig_updated),
        ("orig_created", entry.orig_created),
    ];
    for (field, value) in dates {
        match value {
            Some(dt) => row.insert(field.to_string(), Value::DateTime(dt)),
            None => row.remove(field),
        };
    }
    let texts = [
        ("basefile", &entry.basefile),
        ("title", &entry.title),
        ("summary", &entry.summary),
        ("url", &entry.url),
        ("content", &entry.content),
        ("link", &entry.link),
    ];
    for (field, value) in texts {
        match value {
            Some(text) => row.insert(field.to_string(), Value::str(text.as_str())),
            None => row.remove(field),
        };
    }
}

/// Faceted data rows of every published entry, decorated with the entry's dates, title,
/// summary, URL and the URLs of its content and metadata. Cached in `feed/faceted_entries.json`.
pub fn news_facet_entries(
    repo: &dyn Repository,
    store: &dyn TripleStore,
    refresh: RefreshStrategy,
) -> Result<Vec<Row>> {
    let docstore = repo.store();
    let cachepath = docstore.resourcepath(FACETED_ENTRIES_CACHE);
    let mut dependencies = vec![docstore.resourcepath(FACETED_DATA_CACHE)];
    dependencies.extend(list_files(&docstore.resourcepath("entries"), ".json"));
    if !refresh.is_force() && cachepath.exists() && outfile_is_newer(&dependencies, &cachepath) {
        debug!("Loading faceted_entries from {}", cachepath.display());
        return read_rows(&cachepath, FACETED_ENTRIES_DATE_FIELDS);
    }

    let data = faceted_data(repo, store, refresh)?;
    let mut datadict: HashMap<String, Row> = HashMap::new();
    for row in data {
        if let Some(uri) = row.get("uri") {
            datadict.insert(uri.to_string(), row);
        }
    }
    let mut ret = vec![];
    for entry in repo.news_entries()? {
        let id = entry.id.clone().unwrap_or_default();
        let mut row = match datadict.get(&id) {
            Some(row) => row.clone(),
            None => {
                warn!(
                    "{} does not occur in faceted_data, mismatch between data in docentry files and data in triplestore",
                    id
                );
                continue;
            }
        };
        entry_to_row(&mut row, &entry);
        ret.push(row);
    }
    debug!("Saving faceted_entries to {}", cachepath.display());
    write_rows(&cachepath, &ret)?;
    Ok(ret)
}

fn load_feedsets(cachepath: &Path) -> Result<Option<Vec<Feedset>>> {
    let file = std::fs::File::open(cachepath)?;
    let cache: FeedsetCache = serde_json::from_reader(BufReader::new(file))?;
    if cache.version != FEEDSETS_CACHE_VERSION {
        debug!(
            "Ignoring feedsets cache with version {} (expected {})",
            cache.version, FEEDSETS_CACHE_VERSION
        );
        return Ok(None);
    }
    Ok(Some(cache.feedsets))
}

/// One feedset per feed facet plus the trailing "All" feedset. Cached in
/// `feed/feedsets.json` until the faceted entries or any written feed changes.
pub fn news_feedsets(repo: &dyn Repository, data: &[Row], facets: &[Facet]) -> Result<Vec<Feedset>> {
    let docstore = repo.store();
    let cachepath = docstore.resourcepath(FEEDSETS_CACHE);
    let mut dependencies = vec![docstore.resourcepath(FACETED_ENTRIES_CACHE)];
    dependencies.extend(list_files(&docstore.resourcepath(FEED_DIR), ".atom"));
    if !repo.config().force && cachepath.exists() && outfile_is_newer(&dependencies, &cachepath) {
        debug!("Loading feedsets from {}", cachepath.display());
        if let Some(feedsets) = load_feedsets(&cachepath)? {
            return Ok(feedsets);
        }
    }

    let ns = repo.namespaces();
    let commondata = repo.commondata();
    let mut res = vec![];
    for facet in facets.iter().filter(|f| f.use_for_feed) {
        let binding = facet.binding(ns);
        let term = facet.term();
        let mut fragments: HashMap<String, String> = HashMap::new();
        for row in data {
            let selected = match facet.selector.select(row, &binding, commondata) {
                Ok(Some(selected)) => selected,
                _ => continue,
            };
            if let Ok(fragment) = facet.identificator.select(row, &binding, commondata) {
                let fragment = fragment.unwrap_or_else(|| selected.clone());
                fragments.insert(selected, fragment);
            }
        }
        let mut values: Vec<String> = fragments.keys().cloned().collect();
        values.sort();
        if facet.selector_descending {
            values.reverse();
        }
        let feeds = values
            .into_iter()
            .map(|value| {
                let fragment = fragments.remove(&value).unwrap_or_default();
                Feed {
                    slug: format!("{}/{}", term, fragment.to_lowercase()),
                    title: facet.pagetitle_text(&value),
                    binding: Some(binding.clone()),
                    value: Some(fragment),
                    entries: vec![],
                }
            })
            .collect();
        res.push(Feedset {
            label: facet.label_text(),
            predicate: Some(facet.rdftype.clone()),
            feeds,
        });
    }
    res.push(Feedset {
        label: "All".to_string(),
        predicate: None,
        feeds: vec![Feed {
            slug: "main".to_string(),
            title: repo.news_feedsets_main_label().to_string(),
            binding: None,
            value: None,
            entries: vec![],
        }],
    });

    let cache = FeedsetCache {
        version: FEEDSETS_CACHE_VERSION,
        feedsets: res,
    };
    atomic_write(&cachepath, &to_pretty_json(&cache)?)?;
    Ok(cache.feedsets)
}

/// Fills every feed with its entries. Rows are bucketed by identificator and matched to
/// the feed with that value; the "All" feedset gets a catch-all facet keyed on the
/// repository's news sort key, newest first. Entries go through `news_item` before
/// they are sorted.
pub fn news_select_for_feeds(
    repo: &dyn Repository,
    data: &[Row],
    mut feedsets: Vec<Feedset>,
    facets: &[Facet],
) -> Result<Vec<Feedset>> {
    let ns = repo.namespaces();
    let commondata = repo.commondata();
    let mut facets: Vec<Facet> = facets.iter().filter(|f| f.use_for_feed).cloned().collect();
    if facets.len() < feedsets.len() {
        facets.push(
            Facet::builder()
                .rdftype(RESOURCE)
                .selector(Constant)
                .identificator(Constant)
                .key(FieldKey(repo.news_sortkey().to_string()))
                .key_descending(true)
                .build()?,
        );
    }
    for (feedset, facet) in feedsets.iter_mut().zip(facets.iter()) {
        let binding = facet.binding(ns);
        let collator = facet.collator(repo.collate_locale());
        let mut documents: HashMap<Option<String>, Vec<&Row>> = HashMap::new();
        for row in data {
            if let Ok(key) = facet.identificator.select(row, &binding, commondata) {
                documents.entry(key).or_default().push(row);
            }
        }
        for feed in feedset.feeds.iter_mut() {
            let rows = match documents.get(&feed.value) {
                Some(rows) => rows,
                None => continue,
            };
            let entries = rows
                .iter()
                .map(|row| repo.news_item(feed.binding.as_deref(), (*row).clone()))
                .collect();
            feed.entries = sort_rows(entries, facet, &binding, commondata, collator.as_ref());
        }
    }
    Ok(feedsets)
}

/// Selects the entries of every feed.
///
/// Returns `None` when an already written `news/main.atom` is newer than the faceted data.
pub fn news(repo: &dyn Repository, store: &dyn TripleStore) -> Result<Option<Vec<Feedset>>> {
    let config = repo.config();
    let feedindex = repo.store().resourcepath(NEWS_INDEX);
    let cache = repo.store().resourcepath(FACETED_DATA_CACHE);
    if !config.force && outfile_is_newer(&[&cache], &feedindex) {
        debug!("Not regenerating feeds");
        return Ok(None);
    }

    let start = Instant::now();
    let data = news_facet_entries(repo, store, RefreshStrategy::from(config.force))?;
    debug!(
        "news: selected {} decorated rows ({:.3} sec)",
        data.len(),
        start.elapsed().as_secs_f64()
    );
    let facets = repo.facets();
    let feedsets = news_feedsets(repo, &data, facets)?;
    let feedsets = news_select_for_feeds(repo, &data, feedsets, facets)?;
    Ok(Some(feedsets))
}
