use chrono::NaiveDate;
use docrepo::config::Config;
use docrepo::consts::{ISSUED, TITLE};
use docrepo::facet::Facet;
use docrepo::repository::DocumentRepository;
use docrepo::toc::{toc, toc_pagesets, toc_select_for_pages, TocItem};
use docrepo::triplestore::{OxigraphStore, TripleStore};
use docrepo::value::{Row, Value};
use oxigraph::io::RdfFormat;
use tempfile::tempdir;

fn row(uri: &str, title: &str, issued: (i32, u32, u32)) -> Row {
    let mut row = Row::new();
    row.insert("uri".into(), Value::str(uri));
    row.insert("dcterms_title".into(), Value::str(title));
    row.insert(
        "dcterms_issued".into(),
        Value::Date(NaiveDate::from_ymd_opt(issued.0, issued.1, issued.2).unwrap()),
    );
    row
}

fn data() -> Vec<Row> {
    vec![
        row("http://example.org/ex/1", "Abc", (2009, 4, 2)),
        row("http://example.org/ex/2", "Abcd", (2010, 6, 30)),
        row("http://example.org/ex/3", "Dfg", (2010, 8, 1)),
    ]
}

fn repo() -> DocumentRepository {
    DocumentRepository::new("base", Config::default())
        .unwrap()
        .with_facets(vec![Facet::new(TITLE), Facet::new(ISSUED)])
        .unwrap()
}

fn key(binding: &str, value: &str) -> (String, String) {
    (binding.to_string(), value.to_string())
}

fn item(label: &str, uri: &str) -> TocItem {
    TocItem {
        label: label.to_string(),
        uri: uri.to_string(),
    }
}

#[test]
fn test_toc_pagesets() {
    let repo = repo();
    let pagesets = toc_pagesets(&repo, &data(), &[Facet::new(TITLE), Facet::new(ISSUED)]);
    assert_eq!(pagesets.len(), 2);
    assert_eq!(pagesets[0].label, "Sorted by title");
    assert_eq!(pagesets[1].label, "Sorted by publication year");

    let titles: Vec<&str> = pagesets[0].pages.iter().map(|p| p.linktext.as_str()).collect();
    assert_eq!(titles, vec!["a", "d"]);
    assert_eq!(pagesets[0].pages[0].title, "Documents starting with \"a\"");
    assert_eq!(pagesets[0].pages[0].binding, "dcterms_title");
    assert_eq!(pagesets[0].pages[0].value, "a");

    let years: Vec<&str> = pagesets[1].pages.iter().map(|p| p.linktext.as_str()).collect();
    assert_eq!(years, vec!["2009", "2010"]);
    assert_eq!(pagesets[1].pages[1].title, "Documents published in 2010");
}

#[test]
fn test_toc_select_for_pages() {
    let repo = repo();
    let facets = vec![Facet::new(TITLE), Facet::new(ISSUED)];
    let data = data();
    let pagesets = toc_pagesets(&repo, &data, &facets);
    let content = toc_select_for_pages(&repo, &data, &pagesets, &facets);

    assert_eq!(
        content[&key("dcterms_title", "a")],
        vec![
            item("Abc", "http://example.org/ex/1"),
            item("Abcd", "http://example.org/ex/2")
        ]
    );
    assert_eq!(
        content[&key("dcterms_title", "d")],
        vec![item("Dfg", "http://example.org/ex/3")]
    );
    assert_eq!(
        content[&key("dcterms_issued", "2010")],
        vec![
            item("Abcd", "http://example.org/ex/2"),
            item("Dfg", "http://example.org/ex/3")
        ]
    );

    // every row shows up on exactly one page per facet
    for binding in ["dcterms_title", "dcterms_issued"] {
        let count: usize = content
            .iter()
            .filter(|((b, _), _)| b == binding)
            .map(|(_, items)| items.len())
            .sum();
        assert_eq!(count, data.len());
    }
}

#[test]
fn test_rows_missing_a_binding_are_skipped() {
    let repo = repo();
    let facets = vec![Facet::new(TITLE), Facet::new(ISSUED)];
    let mut data = data();
    let mut untitled = Row::new();
    untitled.insert("uri".into(), Value::str("http://example.org/ex/4"));
    untitled.insert("dcterms_issued".into(), Value::str("2011-02"));
    data.push(untitled);

    let pagesets = toc_pagesets(&repo, &data, &facets);
    assert_eq!(pagesets[0].pages.len(), 2);
    assert_eq!(pagesets[1].pages.len(), 3);
    let content = toc_select_for_pages(&repo, &data, &pagesets, &facets);
    // rendered with its uri, since it has neither title nor identifier
    assert_eq!(
        content[&key("dcterms_issued", "2011")],
        vec![item("http://example.org/ex/4", "http://example.org/ex/4")]
    );
}

#[test]
fn test_toc_from_store() {
    let dir = tempdir().unwrap();
    let config = Config::builder().datadir(dir.path()).build().unwrap();
    let repo = DocumentRepository::new("base", config).unwrap();
    let store = OxigraphStore::in_memory().unwrap();

    // nothing related yet
    assert!(toc(&repo, &store).unwrap().is_none());

    let data = r#"
@prefix dcterms: <http://purl.org/dc/terms/> .
@prefix foaf: <http://xmlns.com/foaf/0.1/> .
<http://localhost:8000/res/base/1> a foaf:Document ; dcterms:title "Abc" .
<http://localhost:8000/res/base/2> a foaf:Document ; dcterms:title "Dfg" .
"#;
    store
        .add_serialized(data.as_bytes(), RdfFormat::Turtle, Some("http://localhost:8000/dataset/base"))
        .unwrap();
    let forced = Config::builder().datadir(dir.path()).force(true).build().unwrap();
    let repo = DocumentRepository::new("base", forced).unwrap();
    let result = toc(&repo, &store).unwrap().unwrap();
    let title = result
        .pagesets
        .iter()
        .find(|p| p.label == "Sorted by title")
        .unwrap();
    assert_eq!(title.pages.len(), 2);
    assert_eq!(
        result.pagecontent[&key("dcterms_title", "d")],
        vec![item("Dfg", "http://localhost:8000/res/base/2")]
    );

    let tabless = Config::builder().datadir(dir.path()).tabs(false).build().unwrap();
    let repo = DocumentRepository::new("base", tabless).unwrap();
    assert!(toc(&repo, &store).unwrap().is_none());
}
