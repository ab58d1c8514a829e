//! Per-document bookkeeping kept as JSON under `entries/`.

use crate::util::atomic_write;
use anyhow::Result;
use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::path::Path;

/// Fields are declared in alphabetical order so that saved entries have sorted keys.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DocumentEntry {
    pub basefile: Option<String>,
    /// URL of the parsed document.
    pub content: Option<String>,
    /// Canonical URI of the document.
    pub id: Option<String>,
    pub indexed_dep: Option<NaiveDateTime>,
    pub indexed_ft: Option<NaiveDateTime>,
    pub indexed_ts: Option<NaiveDateTime>,
    /// URL of the distilled RDF metadata.
    pub link: Option<String>,
    pub orig_checked: Option<NaiveDateTime>,
    pub orig_created: Option<NaiveDateTime>,
    pub orig_updated: Option<NaiveDateTime>,
    pub orig_url: Option<String>,
    /// Unset until the document has been published in a feed.
    pub published: Option<NaiveDateTime>,
    pub summary: Option<String>,
    pub title: Option<String>,
    pub updated: Option<NaiveDateTime>,
    pub url: Option<String>,
}

impl DocumentEntry {
    /// Loads the entry at `path`, or an empty one if there is no such file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(DocumentEntry::default());
        }
        let file = std::fs::File::open(path)?;
        let entry = serde_json::from_reader(BufReader::new(file))?;
        Ok(entry)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        debug!("Saving entry to {}", path.display());
        let data = serde_json::to_vec_pretty(self)?;
        atomic_write(path, &data)
    }

    pub fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
