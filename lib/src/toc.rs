//! Table of contents partitioning.
//!
//! Every facet with `use_for_toc` becomes a [`TocPageset`] holding one [`TocPage`] per
//! distinct selector value. Rows for which a facet's selector fails are left out of
//! that facet's pages.

use crate::collate::{sort_strings, Collator};
use crate::consts::{FACETED_DATA_CACHE, TOC_INDEX};
use crate::facet::Facet;
use crate::faceted::faceted_data;
use crate::options::RefreshStrategy;
use crate::query::facet_query;
use crate::repository::Repository;
use crate::resource::ResourceGraph;
use crate::triplestore::TripleStore;
use crate::util::outfile_is_newer;
use crate::value::{Row, Value};
use anyhow::Result;
use log::{debug, error, info};
use oxigraph::model::NamedNode;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocPage {
    pub linktext: String,
    pub title: String,
    pub binding: String,
    /// URL-safe identifier of the page, from the facet's identificator.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocPageset {
    pub label: String,
    pub predicate: NamedNode,
    pub pages: Vec<TocPage>,
}

/// One rendered document link on a TOC page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocItem {
    pub label: String,
    pub uri: String,
}

/// Items per page, keyed by the page's `(binding, value)`.
pub type PageContent = BTreeMap<(String, String), Vec<TocItem>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Toc {
    pub pagesets: Vec<TocPageset>,
    pub pagecontent: PageContent,
}

fn compare_values(a: &Value, b: &Value, collator: &dyn Collator) -> Ordering {
    match (a, b) {
        (Value::Str(a), Value::Str(b)) => collator.compare(a, b),
        _ => a.cmp(b),
    }
}

/// Orders `rows` by the facet's key. Rows whose key cannot be computed keep their
/// relative order and go after every keyed row, in either direction.
pub(crate) fn sort_rows(
    rows: Vec<Row>,
    facet: &Facet,
    binding: &str,
    commondata: &ResourceGraph,
    collator: &dyn Collator,
) -> Vec<Row> {
    let mut keyed = vec![];
    let mut unkeyed = vec![];
    for row in rows {
        match facet.key.key(&row, binding, commondata) {
            Ok(key) => keyed.push((key, row)),
            Err(_) => unkeyed.push(row),
        }
    }
    keyed.sort_by(|(a, _), (b, _)| {
        let ord = compare_values(a, b, collator);
        if facet.key_descending {
            ord.reverse()
        } else {
            ord
        }
    });
    keyed
        .into_iter()
        .map(|(_, row)| row)
        .chain(unkeyed)
        .collect()
}

/// Groups rows by selector value, preserving row order within each group. Rows the
/// selector fails on, or puts in no bucket, are skipped.
fn bucket_rows(
    data: &[Row],
    facet: &Facet,
    binding: &str,
    commondata: &ResourceGraph,
) -> HashMap<String, Vec<Row>> {
    let mut documents: HashMap<String, Vec<Row>> = HashMap::new();
    for row in data {
        if let Ok(Some(key)) = facet.selector.select(row, binding, commondata) {
            documents.entry(key).or_default().push(row.clone());
        }
    }
    documents
}

/// One pageset per TOC facet, pages ordered by collated selector value.
pub fn toc_pagesets(repo: &dyn Repository, data: &[Row], facets: &[Facet]) -> Vec<TocPageset> {
    let ns = repo.namespaces();
    let commondata = repo.commondata();
    let mut res = vec![];
    for facet in facets.iter().filter(|f| f.use_for_toc) {
        let binding = facet.binding(ns);
        let mut fragments: HashMap<String, String> = HashMap::new();
        for row in data {
            let selected = match facet.selector.select(row, &binding, commondata) {
                Ok(Some(selected)) => selected,
                _ => continue,
            };
            match facet.identificator.select(row, &binding, commondata) {
                Ok(Some(fragment)) => {
                    fragments.insert(selected, fragment);
                }
                Ok(None) => {
                    fragments.insert(selected.clone(), selected);
                }
                Err(_) => continue,
            }
        }
        let mut values: Vec<String> = fragments.keys().cloned().collect();
        let collator = facet.collator(repo.collate_locale());
        sort_strings(&mut values, collator.as_ref(), facet.selector_descending);

        let pages = values
            .into_iter()
            .map(|value| TocPage {
                title: facet.pagetitle_text(&value),
                binding: binding.clone(),
                value: fragments.remove(&value).unwrap_or_default(),
                linktext: value,
            })
            .collect();
        res.push(TocPageset {
            label: facet.label_text(),
            predicate: facet.rdftype.clone(),
            pages,
        });
    }
    res
}

/// The items of every page: rows bucketed by selector value, matched to the page with
/// that link text, ordered by the facet's key and rendered with `toc_item`.
pub fn toc_select_for_pages(
    repo: &dyn Repository,
    data: &[Row],
    pagesets: &[TocPageset],
    facets: &[Facet],
) -> PageContent {
    let ns = repo.namespaces();
    let commondata = repo.commondata();
    let mut res = PageContent::new();
    let facets = facets.iter().filter(|f| f.use_for_toc);
    for (pageset, facet) in pagesets.iter().zip(facets) {
        let binding = facet.binding(ns);
        let collator = facet.collator(repo.collate_locale());
        for (key, rows) in bucket_rows(data, facet, &binding, commondata) {
            let page = match pageset.pages.iter().find(|p| p.linktext == key) {
                Some(page) => page,
                None => continue,
            };
            let rows = sort_rows(rows, facet, &binding, commondata, collator.as_ref());
            res.insert(
                (page.binding.clone(), page.value.clone()),
                rows.iter().map(|row| repo.toc_item(&binding, row)).collect(),
            );
        }
    }
    res
}

/// Partitions the repository's faceted data into table of contents pages.
///
/// Returns `None` when no TOC is wanted (`tabs` is off), when an already rendered
/// `toc/index.html` is newer than the faceted data, or when there is no data.
pub fn toc(repo: &dyn Repository, store: &dyn TripleStore) -> Result<Option<Toc>> {
    let config = repo.config();
    if !config.tabs {
        info!("{}: Not creating TOC (config has tabs=false)", repo.alias());
        return Ok(None);
    }
    let tocindex = repo.store().resourcepath(TOC_INDEX);
    let cache = repo.store().resourcepath(FACETED_DATA_CACHE);
    if !config.force && outfile_is_newer(&[&cache], &tocindex) {
        debug!("Not regenerating TOCs");
        return Ok(None);
    }

    let start = Instant::now();
    let data = faceted_data(repo, store, RefreshStrategy::from(config.force))?;
    debug!(
        "toc: selected {} rows ({:.3} sec)",
        data.len(),
        start.elapsed().as_secs_f64()
    );
    if data.is_empty() {
        error!("faceted_data found 0 results for query, can't generate TOC");
        info!(
            "(query PROBABLY was '{}')",
            facet_query(repo, &repo.dataset_uri(None, None))
        );
        return Ok(None);
    }
    let facets = repo.facets();
    let pagesets = toc_pagesets(repo, &data, facets);
    let pagecontent = toc_select_for_pages(repo, &data, &pagesets, facets);
    Ok(Some(Toc {
        pagesets,
        pagecontent,
    }))
}
