use chrono::NaiveDate;
use docrepo::config::Config;
use docrepo::consts::{IDENTIFIER, TITLE};
use docrepo::entry::DocumentEntry;
use docrepo::facet::Facet;
use docrepo::news::{news, news_feedsets, news_select_for_feeds};
use docrepo::repository::{DocumentRepository, Repository};
use docrepo::triplestore::{OxigraphStore, TripleStore};
use docrepo::value::{Row, Value};
use oxigraph::io::RdfFormat;
use tempfile::tempdir;

fn uris(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|r| r["uri"].to_string()).collect()
}

#[test]
fn test_all_feed_holds_every_row() {
    let dir = tempdir().unwrap();
    let config = Config::builder().datadir(dir.path()).build().unwrap();
    // no facet is used for feeds
    let facets = vec![Facet::new(TITLE), Facet::new(IDENTIFIER)];
    let repo = DocumentRepository::new("base", config)
        .unwrap()
        .with_facets(facets.clone())
        .unwrap();

    let mut data = vec![];
    for i in 1..=5u32 {
        let mut row = Row::new();
        row.insert("uri".into(), Value::str(format!("ex:{}", i)));
        row.insert("dcterms_title".into(), Value::str(format!("Title {}", i)));
        // one row without the sort key
        if i != 4 {
            let updated = NaiveDate::from_ymd_opt(2020, 1, i)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            row.insert("updated".into(), Value::DateTime(updated));
        }
        data.push(row);
    }

    let feedsets = news_feedsets(&repo, &data, &facets).unwrap();
    assert_eq!(feedsets.len(), 1);
    let all = feedsets.last().unwrap();
    assert_eq!(all.label, "All");
    assert_eq!(all.feeds.len(), 1);
    assert_eq!(all.feeds[0].binding, None);
    assert_eq!(all.feeds[0].value, None);
    assert_eq!(all.feeds[0].title, "All documents");

    let feedsets = news_select_for_feeds(&repo, &data, feedsets, &facets).unwrap();
    let entries = &feedsets.last().unwrap().feeds[0].entries;
    assert_eq!(entries.len(), data.len());
    assert_eq!(uris(entries), vec!["ex:5", "ex:3", "ex:2", "ex:1", "ex:4"]);
}

const DATA: &str = r#"
@prefix dcterms: <http://purl.org/dc/terms/> .
@prefix foaf: <http://xmlns.com/foaf/0.1/> .

<http://localhost:8000/res/base/1> a foaf:Document ;
    dcterms:title "First" ;
    dcterms:publisher <http://example.org/org/acme> .

<http://localhost:8000/res/base/2> a foaf:Document ;
    dcterms:title "Second" ;
    dcterms:publisher <http://example.org/org/gov> .

<http://localhost:8000/res/base/3> a foaf:Document ;
    dcterms:title "Unpublished" .
"#;

fn write_entry(repo: &DocumentRepository, basefile: &str, day: Option<u32>) {
    let mut entry = DocumentEntry::default();
    if let Some(day) = day {
        let dt = NaiveDate::from_ymd_opt(2013, 3, day)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        entry.published = Some(dt);
        entry.updated = Some(dt);
    }
    entry
        .save(&repo.store().documententry_path(basefile))
        .unwrap();
    let distilled = repo.store().distilled_path(basefile);
    std::fs::create_dir_all(distilled.parent().unwrap()).unwrap();
    std::fs::write(distilled, b"").unwrap();
}

#[test]
fn test_news_from_entries() {
    let dir = tempdir().unwrap();
    let config = Config::builder().datadir(dir.path()).build().unwrap();
    let repo = DocumentRepository::new("base", config).unwrap();
    let store = OxigraphStore::in_memory().unwrap();
    store
        .add_serialized(DATA.as_bytes(), RdfFormat::Turtle, Some(&repo.dataset_uri(None, None)))
        .unwrap();
    write_entry(&repo, "1", Some(12));
    write_entry(&repo, "2", Some(14));
    write_entry(&repo, "3", None);

    let feedsets = news(&repo, &store).unwrap().unwrap();
    let labels: Vec<&str> = feedsets.iter().map(|f| f.label.as_str()).collect();
    assert_eq!(labels, vec!["Sorted by type", "Sorted by publisher", "All"]);

    let main = &feedsets[2].feeds[0];
    assert_eq!(main.slug, "main");
    assert_eq!(
        uris(&main.entries),
        vec![
            "http://localhost:8000/res/base/2",
            "http://localhost:8000/res/base/1"
        ]
    );
    // entry fields are merged into the rows
    assert_eq!(main.entries[0]["title"], Value::str("http://localhost:8000/res/base/2"));
    assert_eq!(
        main.entries[0]["url"],
        Value::str("http://localhost:8000/base/generated/2.html")
    );
    assert_eq!(
        main.entries[0]["link"],
        Value::str("http://localhost:8000/base/distilled/2.rdf")
    );
    assert_eq!(
        main.entries[0]["content"],
        Value::str("http://localhost:8000/base/parsed/2.xhtml")
    );

    let acme = feedsets[1]
        .feeds
        .iter()
        .find(|f| f.slug == "publisher/acme")
        .unwrap();
    assert_eq!(uris(&acme.entries), vec!["http://localhost:8000/res/base/1"]);

    // missing fields were written back to the entry
    let entry = DocumentEntry::load(&repo.store().documententry_path("1")).unwrap();
    assert_eq!(entry.id.as_deref(), Some("http://localhost:8000/res/base/1"));
    assert_eq!(entry.basefile.as_deref(), Some("1"));
}
