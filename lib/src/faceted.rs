//! Faceted data: one row per document (or per value of a multi-valued facet), selected
//! from the triple store and cached as JSON next to the repository's dump file.

use crate::consts::{DUMP_FILE, FACETED_DATA_CACHE};
use crate::options::RefreshStrategy;
use crate::query::facet_query;
use crate::repository::Repository;
use crate::triplestore::TripleStore;
use crate::util::outfile_is_newer;
use crate::value::{parse_date_fields, read_rows, write_rows, Row, FACETED_DATA_DATE_FIELDS};
use anyhow::Result;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::time::Instant;

/// Runs the facet query. Store errors propagate; there is no empty fallback.
pub fn facet_select(store: &dyn TripleStore, query: &str) -> Result<Vec<Row>> {
    store.select(query)
}

/// Drops rows that are identical in every binding to an earlier row, keeping the first
/// occurrence. Rows sharing a `uri` but differing elsewhere are kept. Returns the number
/// of dropped rows.
pub fn dedup_rows(rows: Vec<Row>) -> (Vec<Row>, usize) {
    let mut seen = HashSet::new();
    let mut dupes = vec![];
    for (idx, row) in rows.iter().enumerate() {
        if !seen.insert(row) {
            let uri = row.get("uri").map(|u| u.to_string()).unwrap_or_default();
            warn!("faceted_data: found duplicate row (uri {}) at #{}", uri, idx);
            dupes.push(idx);
        }
    }
    if dupes.is_empty() {
        return (rows, 0);
    }
    let dropped: HashSet<usize> = dupes.iter().copied().collect();
    let kept = rows
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !dropped.contains(idx))
        .map(|(_, row)| row)
        .collect();
    (kept, dupes.len())
}

/// The faceted data of `repo`, from `toc/faceted_data.json` when that cache is newer
/// than `distilled/dump.nt`, otherwise freshly selected from `store` and re-cached.
pub fn faceted_data(
    repo: &dyn Repository,
    store: &dyn TripleStore,
    refresh: RefreshStrategy,
) -> Result<Vec<Row>> {
    let cachepath = repo.store().resourcepath(FACETED_DATA_CACHE);
    let dumppath = repo.store().resourcepath(DUMP_FILE);
    let usable = std::fs::metadata(&cachepath)
        .map(|m| m.len() > 2)
        .unwrap_or(false);
    if !refresh.is_force() && usable && outfile_is_newer(&[&dumppath], &cachepath) {
        debug!("Loading faceted_data from {}", cachepath.display());
        return read_rows(&cachepath, FACETED_DATA_DATE_FIELDS);
    }

    let start = Instant::now();
    let query = facet_query(repo, &repo.dataset_uri(None, None));
    let mut rows = facet_select(store, &query)?;
    for row in rows.iter_mut() {
        parse_date_fields(row, FACETED_DATA_DATE_FIELDS);
    }
    let (rows, dropped) = dedup_rows(rows);
    write_rows(&cachepath, &rows)?;
    info!(
        "faceted_data: selected {} rows, {} duplicates dropped ({:.3} sec)",
        rows.len(),
        dropped,
        start.elapsed().as_secs_f64()
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn row(uri: &str, title: &str) -> Row {
        let mut row = Row::new();
        row.insert("uri".into(), Value::str(uri));
        row.insert("dcterms_title".into(), Value::str(title));
        row
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let rows = vec![
            row("ex:1", "Abc"),
            row("ex:2", "Abcd"),
            row("ex:1", "Abc"),
            row("ex:1", "Other title"),
            row("ex:2", "Abcd"),
        ];
        let (rows, dropped) = dedup_rows(rows);
        assert_eq!(dropped, 2);
        assert_eq!(
            rows,
            vec![row("ex:1", "Abc"), row("ex:2", "Abcd"), row("ex:1", "Other title")]
        );
    }
}
