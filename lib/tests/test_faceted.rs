use chrono::NaiveDate;
use docrepo::config::Config;
use docrepo::consts::FACETED_DATA_CACHE;
use docrepo::faceted::faceted_data;
use docrepo::options::RefreshStrategy;
use docrepo::repository::{DocumentRepository, Repository};
use docrepo::triplestore::{OxigraphStore, TripleStore};
use docrepo::value::{read_rows, Row, Value, FACETED_DATA_DATE_FIELDS};
use oxigraph::io::RdfFormat;
use tempfile::tempdir;

const DATA: &str = r#"
@prefix dcterms: <http://purl.org/dc/terms/> .
@prefix foaf: <http://xmlns.com/foaf/0.1/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

<http://localhost:8000/res/base/1> a foaf:Document ;
    dcterms:title "Abc" ;
    dcterms:identifier "Doc 1" ;
    dcterms:issued "2009-04-02"^^xsd:date .

<http://localhost:8000/res/base/2> a foaf:Document ;
    dcterms:title "Abcd" ;
    dcterms:issued "2010-06-30"^^xsd:date .

<http://localhost:8000/res/base/3> a foaf:Document ;
    dcterms:identifier "Doc 3" .

<http://localhost:8000/res/base/4> dcterms:title "Not a document" .
"#;

fn sorted(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort_by(|a, b| a["uri"].cmp(&b["uri"]));
    rows
}

fn setup(datadir: &std::path::Path) -> (DocumentRepository, OxigraphStore) {
    let config = Config::builder().datadir(datadir).build().unwrap();
    let repo = DocumentRepository::new("base", config).unwrap();
    let store = OxigraphStore::in_memory().unwrap();
    store
        .add_serialized(
            DATA.as_bytes(),
            RdfFormat::Turtle,
            Some(&repo.dataset_uri(None, None)),
        )
        .unwrap();
    (repo, store)
}

#[test]
fn test_faceted_data_selects_and_caches() {
    let dir = tempdir().unwrap();
    let (repo, store) = setup(dir.path());

    let rows = sorted(faceted_data(&repo, &store, RefreshStrategy::UseCache).unwrap());
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["dcterms_title"], Value::str("Abc"));
    assert_eq!(
        rows[0]["dcterms_issued"],
        Value::Date(NaiveDate::from_ymd_opt(2009, 4, 2).unwrap())
    );
    assert_eq!(
        rows[0]["rdf_type"],
        Value::str("http://xmlns.com/foaf/0.1/Document")
    );
    // unbound optionals are left out of the row
    assert!(!rows[2].contains_key("dcterms_title"));
    assert!(!rows[2].contains_key("dcterms_publisher"));

    // dates survive the JSON cache as dates
    let cachepath = repo.store().resourcepath(FACETED_DATA_CACHE);
    let cached = sorted(read_rows(&cachepath, FACETED_DATA_DATE_FIELDS).unwrap());
    assert_eq!(cached, rows);

    // a fresh cache is used even when the store has changed
    store.clear(None).unwrap();
    let again = sorted(faceted_data(&repo, &store, RefreshStrategy::UseCache).unwrap());
    assert_eq!(again, rows);

    let forced = faceted_data(&repo, &store, RefreshStrategy::Force).unwrap();
    assert!(forced.is_empty());
}

#[test]
fn test_stale_cache_is_refreshed() {
    let dir = tempdir().unwrap();
    let (repo, store) = setup(dir.path());
    faceted_data(&repo, &store, RefreshStrategy::UseCache).unwrap();

    // a dump written after the cache makes it stale
    std::thread::sleep(std::time::Duration::from_millis(20));
    let dumppath = repo.store().resourcepath("distilled/dump.nt");
    std::fs::create_dir_all(dumppath.parent().unwrap()).unwrap();
    std::fs::write(&dumppath, b"").unwrap();
    store
        .add_serialized(
            b"<http://localhost:8000/res/base/5> a <http://xmlns.com/foaf/0.1/Document> .\n",
            RdfFormat::NTriples,
            Some(&repo.dataset_uri(None, None)),
        )
        .unwrap();
    let rows = faceted_data(&repo, &store, RefreshStrategy::UseCache).unwrap();
    assert_eq!(rows.len(), 4);
}

#[test]
fn test_plain_literal_dates_are_dates_before_and_after_caching() {
    let dir = tempdir().unwrap();
    let (repo, store) = setup(dir.path());
    store
        .add_serialized(
            b"<http://localhost:8000/res/base/3> <http://purl.org/dc/terms/issued> \"2011-01-05\" .\n",
            RdfFormat::NTriples,
            Some(&repo.dataset_uri(None, None)),
        )
        .unwrap();
    let issued = Value::Date(NaiveDate::from_ymd_opt(2011, 1, 5).unwrap());

    let fresh = sorted(faceted_data(&repo, &store, RefreshStrategy::Force).unwrap());
    assert_eq!(fresh[2]["dcterms_issued"], issued);
    let cached = sorted(faceted_data(&repo, &store, RefreshStrategy::UseCache).unwrap());
    assert_eq!(cached, fresh);
}

#[test]
fn test_empty_selection_removes_cache() {
    let dir = tempdir().unwrap();
    let (repo, store) = setup(dir.path());
    let cachepath = repo.store().resourcepath(FACETED_DATA_CACHE);
    faceted_data(&repo, &store, RefreshStrategy::UseCache).unwrap();
    assert!(cachepath.exists());

    store.clear(None).unwrap();
    assert!(faceted_data(&repo, &store, RefreshStrategy::Force).unwrap().is_empty());
    assert!(!cachepath.exists());
}
