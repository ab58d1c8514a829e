use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use log::debug;
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::graph::Graph as OxigraphGraph;
use oxigraph::model::{Triple, TripleRef};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref PLACEHOLDER: Regex = Regex::new(r"%\((\w+)\)s").unwrap();
}

/// Guesses the RDF serialization of a file from its extension, defaulting to Turtle.
pub fn rdf_format_for(path: &Path) -> RdfFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ttl") | Some("n3") => RdfFormat::Turtle,
        Some("rdf") | Some("xml") => RdfFormat::RdfXml,
        Some("nt") => RdfFormat::NTriples,
        Some("nq") => RdfFormat::NQuads,
        Some("trig") => RdfFormat::TriG,
        _ => RdfFormat::Turtle,
    }
}

pub fn read_graph_file(file: &Path) -> Result<OxigraphGraph> {
    debug!("Reading file: {}", file.display());
    let format = rdf_format_for(file);
    let content = BufReader::new(std::fs::File::open(file)?);
    read_graph(content, format)
}

pub fn read_graph<R: std::io::Read>(content: R, format: RdfFormat) -> Result<OxigraphGraph> {
    let mut graph = OxigraphGraph::new();
    for quad in RdfParser::from_format(format).for_reader(content) {
        let quad = quad?;
        graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
    }
    Ok(graph)
}

pub fn serialize_graph(graph: &OxigraphGraph, format: RdfFormat) -> Result<Vec<u8>> {
    let mut serializer = RdfSerializer::from_format(format).for_writer(Vec::new());
    for triple in graph.iter() {
        serializer.serialize_triple(TripleRef {
            subject: triple.subject,
            predicate: triple.predicate,
            object: triple.object,
        })?;
    }
    Ok(serializer.finish()?)
}

/// Writes `data` to `path` through a temporary file in the same directory that is
/// renamed into place, so readers never observe a partially written file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| anyhow!(e.error))?;
    Ok(())
}

pub fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// True if `outfile` exists and is at least as new as every existing `infile`.
/// Missing infiles are ignored.
pub fn outfile_is_newer<P: AsRef<Path>>(infiles: &[P], outfile: &Path) -> bool {
    let out = match mtime(outfile) {
        Some(t) => t,
        None => return false,
    };
    infiles
        .iter()
        .filter_map(|p| mtime(p.as_ref()))
        .all(|t| t <= out)
}

/// Every regular file below `dir` whose name ends with `suffix`, in sorted order.
pub fn list_files(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return vec![];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(suffix))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Collapses runs of whitespace to a single space and trims the ends.
pub fn normalize_space(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Sort key for titles: lowercased, a leading "the " removed, non-word characters dropped.
pub fn title_sortkey(s: &str) -> String {
    let lower = s.trim().to_lowercase();
    let stripped = lower.strip_prefix("the ").unwrap_or(&lower);
    NON_WORD.replace_all(stripped, "").into_owned()
}

/// Substitutes `%(name)s` placeholders. Unknown names are left untouched.
pub fn fill_template(template: &str, values: &BTreeMap<&str, &str>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            values
                .get(&caps[1])
                .map(|v| v.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Percent-encodes everything outside the unreserved set and `safe`.
pub fn quote(s: &str, safe: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        let c = b as char;
        if b.is_ascii_alphanumeric() || "_.-~".contains(c) || (b.is_ascii() && safe.contains(c)) {
            out.push(c);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

pub fn unquote(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
