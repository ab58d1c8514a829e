//! Relating a document: pushing it into the full-text index, registering it as a
//! dependency of the documents it refers to and loading its triples into the store.
//!
//! The three steps always run in that order. The index is the strictest about value
//! types, so mistyped metadata is rejected before anything reaches the triple store.

use crate::consts::{DUMP_FILE, SAME_AS, TYPE};
use crate::describer::Describer;
use crate::entry::DocumentEntry;
use crate::facet::Facet;
use crate::fulltext::{self, FieldValue, FulltextIndex};
use crate::options::RelateNeeded;
use crate::repository::Repository;
use crate::resource::ResourceGraph;
use crate::triplestore::TripleStore;
use crate::util::{list_files, normalize_space, outfile_is_newer, read_graph, serialize_graph};
use crate::value::{Row, Value};
use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use oxigraph::io::RdfFormat;
use oxigraph::model::{NamedOrBlankNode, Term};
use scraper::{ElementRef, Html, Node, Selector as CssSelector};
use std::collections::{BTreeMap, HashSet};
use std::io::{BufReader, Write};
use std::time::Instant;

lazy_static! {
    static ref BODY: CssSelector = CssSelector::parse("body").unwrap();
    static ref ABOUT: CssSelector = CssSelector::parse("[about]").unwrap();
}

/// Repositories in most recently used order. Dependency resolution asks each in turn
/// whether it owns a URI, and moves the one that did to the front.
pub struct RepoMru<'a> {
    repos: Vec<&'a dyn Repository>,
}

impl<'a> RepoMru<'a> {
    /// `repo` first, then the others in the given order.
    pub fn new(repo: &'a dyn Repository, otherrepos: &[&'a dyn Repository]) -> Self {
        let mut mru = RepoMru { repos: vec![repo] };
        for other in otherrepos {
            mru.ensure(*other);
        }
        mru
    }

    /// Adds `repo` at the end unless a repository with the same alias is present.
    pub fn ensure(&mut self, repo: &'a dyn Repository) {
        if !self.repos.iter().any(|r| r.alias() == repo.alias()) {
            self.repos.push(repo);
        }
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.repos.iter().map(|r| r.alias()).collect()
    }

    pub fn repos(&self) -> &[&'a dyn Repository] {
        &self.repos
    }

    fn promote(&mut self, idx: usize) {
        let repo = self.repos.remove(idx);
        self.repos.insert(0, repo);
    }
}

/// Adds the distilled RDF/XML of `basefile` to the repository's dataset context.
/// Returns the number of bytes loaded.
pub fn relate_triples(repo: &dyn Repository, basefile: &str, store: &dyn TripleStore) -> Result<usize> {
    let start = Instant::now();
    let path = repo.store().distilled_path(basefile);
    let context = repo.dataset_uri(None, None);
    let data = std::fs::read(&path)?;
    store.add_serialized(&data, RdfFormat::RdfXml, Some(&context))?;
    debug!(
        "Added {} to context {} ({:.3} sec)",
        path.display(),
        context,
        start.elapsed().as_secs_f64()
    );
    Ok(data.len())
}

/// Registers `basefile` as a dependency of every document it refers to, in whichever
/// repository owns that document. Returns the number of registered references.
pub fn relate_dependencies(repo: &dyn Repository, basefile: &str, repos: &mut RepoMru<'_>) -> Result<usize> {
    let start = Instant::now();
    let file = std::fs::File::open(repo.store().distilled_path(basefile))?;
    let graph = read_graph(BufReader::new(file), RdfFormat::RdfXml)?;
    let subjects: HashSet<NamedOrBlankNode> = graph.iter().map(|t| t.subject.into_owned()).collect();
    let parsed = repo.store().parsed_path(basefile);
    let mut deps = 0;
    for triple in graph.iter() {
        if triple.predicate == TYPE || triple.predicate == SAME_AS {
            continue;
        }
        let object = match triple.object.into_owned() {
            Term::NamedNode(node) => node,
            _ => continue,
        };
        if subjects.contains(&NamedOrBlankNode::NamedNode(object.clone())) {
            continue;
        }
        let mut handled = None;
        for (idx, other) in repos.repos().iter().enumerate() {
            let dep = match other.basefile_from_uri(object.as_str()) {
                Some(dep) => dep,
                None => continue,
            };
            if other.alias() != repo.alias() || dep != basefile {
                other.add_dependency(&dep, &parsed)?;
                deps += 1;
                handled = Some(idx);
                break;
            }
        }
        if let Some(idx) = handled {
            repos.promote(idx);
        }
    }
    debug!(
        "Registered {} dependencies ({:.3} sec)",
        deps,
        start.elapsed().as_secs_f64()
    );
    Ok(deps)
}

/// Text nodes up to the first element.
fn leading_text<'a>(nodes: impl Iterator<Item = &'a Node>) -> String {
    nodes
        .take_while(|n| !n.is_element())
        .filter_map(|n| n.as_text())
        .map(|t| &**t)
        .collect()
}

/// Text of `node` and its children, followed by the text trailing `node` itself, leaving
/// out nested resources and verbatim blocks together with the text that trails them.
/// Every element except a, b, i and span is followed by a space.
fn extract_plaintext(node: ElementRef<'_>, resources: &[ElementRef<'_>]) -> String {
    let mut plaintext = leading_text(node.children().map(|n| n.value()));
    for child in node.children().filter_map(ElementRef::wrap) {
        if child.value().attr("class") == Some("verbatim") || resources.iter().any(|r| r.id() == child.id()) {
            continue;
        }
        plaintext.push_str(&extract_plaintext(child, resources));
    }
    plaintext.push_str(&leading_text(node.next_siblings().map(|n| n.value())));
    let trailspace = match node.value().name() {
        "a" | "b" | "i" | "span" => "",
        _ => " ",
    };
    format!("{}{}", plaintext.trim(), trailspace)
}

/// The body followed by every descendant with a distinct `@about`.
fn fulltext_resources<'a>(body: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut uris: HashSet<&str> = HashSet::new();
    if let Some(about) = body.value().attr("about") {
        uris.insert(about);
    }
    let mut res = vec![body];
    for element in body.select(&ABOUT) {
        if element.id() == body.id() {
            continue;
        }
        if let Some(about) = element.value().attr("about") {
            if uris.insert(about) {
                res.push(element);
            }
        }
    }
    res
}

fn field_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Date(d) => d.to_string(),
        FieldValue::DateTime(dt) => Value::DateTime(*dt).to_string(),
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Resource { iri, .. } => iri.clone(),
        FieldValue::Many(values) => values.first().map(field_text).unwrap_or_default(),
    }
}

/// Index value of `facet` for the resource `desc` points at, if it has one.
fn fulltext_value(
    facet: &Facet,
    is_body: bool,
    desc: &Describer<'_>,
    commondata: &ResourceGraph,
) -> Option<FieldValue> {
    if facet.toplevel_only && !is_body {
        return None;
    }
    // values may be IRIs or literals, look for both
    let mut rels = desc.getrels(facet.rdftype.as_ref());
    let mut values: Vec<FieldValue> = if facet.is_resource() {
        rels.sort();
        rels.into_iter()
            .map(|iri| FieldValue::Resource {
                label: commondata.label(&iri).unwrap_or_else(|| iri.clone()),
                iri,
            })
            .collect()
    } else if !rels.is_empty() {
        rels.into_iter().map(FieldValue::Text).collect()
    } else {
        let mut literals = desc.getvalues(facet.rdftype.as_ref());
        literals.sort_by(|a, b| a.value().cmp(b.value()));
        literals
            .iter()
            .map(|l| FieldValue::from_literal(l.as_ref()))
            .collect()
    };
    if values.is_empty() {
        return None;
    }
    let value = if facet.multiple_values {
        FieldValue::Many(values)
    } else {
        if values.len() > 1 {
            warn!(
                "{} had multiple values for {} but multiple_values was not specified, randomly selecting one",
                desc.current(),
                facet.rdftype
            );
        }
        values.swap_remove(0)
    };
    if facet.dimension_label.is_none() {
        return Some(value);
    }
    // a relabeled facet indexes what its selector makes of the value
    let mut row = Row::new();
    row.insert("value".to_string(), Value::str(field_text(&value)));
    match facet.selector.select(&row, "value", commondata) {
        Ok(Some(selected)) => Some(FieldValue::Text(selected)),
        _ => None,
    }
}

/// Indexes the text of the document and each of its identified parts, together with
/// the facet values of each. Returns the number of indexed resources.
pub fn relate_fulltext(repo: &dyn Repository, basefile: &str, index: &mut dyn FulltextIndex) -> Result<usize> {
    let start = Instant::now();
    let docstore = repo.store();
    let html = Html::parse_document(&std::fs::read_to_string(docstore.parsed_path(basefile))?);
    let file = std::fs::File::open(docstore.distilled_path(basefile))?;
    let graph = read_graph(BufReader::new(file), RdfFormat::RdfXml)?;
    let body = html
        .select(&BODY)
        .next()
        .ok_or_else(|| anyhow!("{}: parsed document has no body", basefile))?;
    let body_about = body.value().attr("about");
    let resources = fulltext_resources(body);
    let ns = repo.namespaces();
    let commondata = repo.commondata();

    let mut count = 0;
    let mut words = 0;
    for resource in &resources {
        let about = match (resource.value().attr("about"), resource.value().attr("id"), body_about) {
            (Some(about), _, _) => about.to_string(),
            (None, Some(id), Some(body_about)) => format!("{}#{}", body_about, id),
            _ => continue,
        };
        let desc = Describer::new(&graph, &about)?;
        let plaintext = normalize_space(&extract_plaintext(*resource, &resources));
        let is_body = resource.id() == body.id();
        let mut fields = BTreeMap::new();
        for facet in repo.facets() {
            if let Some(value) = fulltext_value(facet, is_body, &desc, commondata) {
                fields.insert(facet.binding(ns), value);
            }
        }
        index.update(&about, repo.alias(), basefile, &plaintext, fields)?;
        count += 1;
        words += plaintext.split_whitespace().count();
    }
    index.commit()?;
    debug!(
        "Added {} resources ({} words) to fulltext index ({:.3} sec)",
        count,
        words,
        start.elapsed().as_secs_f64()
    );
    Ok(count)
}

// bulk mode: append the document as N-Triples to this process's part file
fn append_bulk_triples(repo: &dyn Repository, basefile: &str) -> Result<usize> {
    let start = Instant::now();
    let docstore = repo.store();
    let nttemp = docstore.resourcepath(&format!(
        "distilled/dump.{}.{}.nt",
        repo.config().clientname,
        std::process::id()
    ));
    let file = std::fs::File::open(docstore.distilled_path(basefile))?;
    let graph = read_graph(BufReader::new(file), RdfFormat::RdfXml)?;
    if let Some(dir) = nttemp.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut fp = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&nttemp)?;
    fp.write_all(&serialize_graph(&graph, RdfFormat::NTriples)?)?;
    debug!(
        "Added {} triples to {} ({:.3} sec)",
        graph.len(),
        nttemp.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(graph.len())
}

/// Per-step `seconds:result` fields, triples first. Triples appended to the bulk dump
/// are only loaded at teardown, so they are reported as `bulk`.
fn relate_summary(triples: Option<(f64, &str)>, deps: (f64, &str), fulltext: (f64, &str)) -> String {
    let triples = match triples {
        Some((elapsed, value)) => format!("{:.3}:{}", elapsed, value),
        None => "bulk".to_string(),
    };
    format!(
        "[{}/{:.3}:{}/{:.3}:{}]",
        triples, deps.0, deps.1, fulltext.0, fulltext.1
    )
}

/// Runs the requested relate steps for one document: full-text indexing, then
/// dependency registration, then triple loading, and stamps the document entry.
///
/// Returns `false` without doing anything when relating is disabled for the
/// repository. Any failing step aborts the rest and is returned to the caller.
pub fn relate<'a>(
    repo: &'a dyn Repository,
    basefile: &str,
    repos: &mut RepoMru<'a>,
    needed: RelateNeeded,
    store: &dyn TripleStore,
    index: Option<&mut dyn FulltextIndex>,
) -> Result<bool> {
    let config = repo.config();
    if !config.relate {
        warn!("{}: repo {} config has relate=false", basefile, repo.alias());
        return Ok(false);
    }
    if !needed.any() {
        debug!("{}: nothing to relate", basefile);
        return Ok(false);
    }
    let entry_path = repo.store().documententry_path(basefile);
    let mut entry = DocumentEntry::load(&entry_path)?;
    let start = Instant::now();
    let (mut e_triples, mut e_deps, mut e_fulltext) = (0.0, 0.0, 0.0);
    let (mut v_triples, mut v_deps, mut v_fulltext) = ("-1".to_string(), "-1".to_string(), "-1".to_string());
    let mut bulk = false;
    repos.ensure(repo);

    if config.fulltextindex && needed.fulltext {
        let index = index.ok_or_else(|| anyhow!("Full-text indexing is enabled but no index was given"))?;
        let step = Instant::now();
        v_fulltext = relate_fulltext(repo, basefile, index)?.to_string();
        e_fulltext = step.elapsed().as_secs_f64();
        entry.indexed_ft = Some(DocumentEntry::now());
    }

    if needed.dependencies {
        let step = Instant::now();
        let deps = relate_dependencies(repo, basefile, repos)?;
        v_deps = format!("{}[{}]", deps, repos.len());
        e_deps = step.elapsed().as_secs_f64();
        entry.indexed_dep = Some(DocumentEntry::now());
    }

    if needed.triples {
        if config.bulktripleload && config.all {
            append_bulk_triples(repo, basefile)?;
            bulk = true;
        } else {
            let step = Instant::now();
            v_triples = relate_triples(repo, basefile, store)?.to_string();
            e_triples = step.elapsed().as_secs_f64();
        }
        entry.indexed_ts = Some(DocumentEntry::now());
    }
    entry.save(&entry_path)?;
    let triples = (!bulk).then_some((e_triples, v_triples.as_str()));
    info!(
        "{}: relate OK ({:.3} sec) {}",
        basefile,
        start.elapsed().as_secs_f64(),
        relate_summary(triples, (e_deps, &v_deps), (e_fulltext, &v_fulltext))
    );
    Ok(true)
}

/// Prepares a batch relate of every document in the repository.
///
/// Returns `false` when there is nothing to do: the dump is newer than every distilled
/// file (it is re-uploaded first when `upload` is set), or relating is disabled. With
/// `force` the dataset context is cleared first.
pub fn relate_all_setup(
    repo: &dyn Repository,
    store: &dyn TripleStore,
    otherrepos: &[&dyn Repository],
) -> Result<bool> {
    let config = repo.config();
    let docstore = repo.store();
    let context = repo.dataset_uri(None, None);
    let dumppath = docstore.resourcepath(DUMP_FILE);

    let distilled: Vec<_> = docstore
        .list_basefiles_for("generate")?
        .iter()
        .map(|b| docstore.distilled_path(b))
        .collect();
    if !config.force && outfile_is_newer(&distilled, &dumppath) {
        if config.upload {
            info!("Clearing context {} before uploading dump", context);
            store.clear(Some(&context))?;
            info!("Adding {} to {}", dumppath.display(), context);
            store.add_serialized_file(&dumppath, RdfFormat::NTriples, Some(&context))?;
        }
        return Ok(false);
    }
    if config.force {
        info!(
            "Clearing context {} at repository {}",
            context, config.storerepository
        );
        store.clear(Some(&context))?;
    }
    if !config.relate {
        info!("{}: Not relating", repo.alias());
        return Ok(false);
    }
    if config.fulltextindex {
        // fails early if the index cannot hold every repository's facets
        let mut repos: Vec<&dyn Repository> = vec![repo];
        repos.extend(otherrepos.iter().copied().filter(|r| r.alias() != repo.alias()));
        fulltext::connect(&config.indextype, &config.indexlocation, &repos)?;
    }
    Ok(true)
}

/// Finishes a batch relate: bulk loads the collected N-Triples parts when in bulk
/// mode, then dumps the dataset context to `distilled/dump.nt`.
pub fn relate_all_teardown(repo: &dyn Repository, store: &dyn TripleStore) -> Result<bool> {
    let config = repo.config();
    let docstore = repo.store();
    let context = repo.dataset_uri(None, None);
    let dumppath = docstore.resourcepath(DUMP_FILE);

    if config.bulktripleload {
        let start = Instant::now();
        let temppath = docstore.resourcepath("distilled/dump.nt.temppath");
        let distilled_dir = docstore.resourcepath("distilled");
        let mut parts = vec![];
        for file in list_files(&distilled_dir, ".nt") {
            if file.parent() == Some(distilled_dir.as_path()) && file != dumppath {
                parts.push(file);
            }
        }
        let mut data = vec![];
        for part in &parts {
            data.extend(std::fs::read(part)?);
        }
        std::fs::create_dir_all(&distilled_dir)?;
        std::fs::write(&temppath, &data)?;
        for part in &parts {
            std::fs::remove_file(part)?;
        }
        debug!("Concatenated {} nt files into {}", parts.len(), temppath.display());
        store.add_serialized_file(&temppath, RdfFormat::NTriples, Some(&context))?;
        let triplecount = data.split(|b| *b == b'\n').filter(|l| !l.is_empty()).count();
        std::fs::remove_file(&temppath)?;
        info!(
            "Loaded {} triples to context {} from {} ({:.3} sec)",
            triplecount,
            context,
            temppath.display(),
            start.elapsed().as_secs_f64()
        );
    }

    let start = Instant::now();
    match store.get_serialized_file(&dumppath, RdfFormat::NTriples, Some(&context)) {
        Ok(()) => {
            let triplecount = store.triple_count(Some(&context)).unwrap_or(0);
            info!(
                "Dumped {} triples from context {} to {} ({:.3} sec)",
                triplecount,
                context,
                dumppath.display(),
                start.elapsed().as_secs_f64()
            );
        }
        Err(e) => {
            warn!("Couldn't get dataset, creating empty {}: {}", dumppath.display(), e);
            crate::util::atomic_write(&dumppath, b"")?;
        }
    }
    Ok(true)
}
