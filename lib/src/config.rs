//! Defines the configuration shared by every repository in a site: where data lives,
//! which collaborators to connect to and which parts of the pipeline are enabled.

use crate::util::atomic_write;
use anyhow::Result;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Builder)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct Config {
    /// Root directory; each repository stores its files under `datadir/<alias>`.
    pub datadir: PathBuf,
    /// Base URL used when minting canonical and dataset URIs.
    pub url: String,
    /// Ignore caches and freshness checks.
    pub force: bool,
    pub storetype: String,
    // empty means an in-memory store
    pub storelocation: String,
    pub storerepository: String,
    pub fulltextindex: bool,
    pub indextype: String,
    // empty means the index is not persisted
    pub indexlocation: String,
    pub relate: bool,
    pub bulktripleload: bool,
    /// Set by batch drivers that relate every document of a repository.
    pub all: bool,
    pub upload: bool,
    pub clientname: String,
    /// When false, no table of contents is produced.
    pub tabs: bool,
    #[builder(setter(into, strip_option))]
    pub collate_locale: Option<String>,
    pub news_sortkey: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            datadir: PathBuf::from("data"),
            url: "http://localhost:8000/".to_string(),
            force: false,
            storetype: "oxigraph".to_string(),
            storelocation: String::new(),
            storerepository: "docrepo".to_string(),
            fulltextindex: true,
            indextype: "memory".to_string(),
            indexlocation: String::new(),
            relate: true,
            bulktripleload: false,
            all: false,
            upload: false,
            clientname: String::new(),
            tabs: true,
            collate_locale: None,
            news_sortkey: "updated".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        atomic_write(file, config_str.as_bytes())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Prints out the current Config in a clear and readable way for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Data directory: {}", self.datadir.display());
        println!("  URL: {}", self.url);
        println!("  Force: {}", self.force);
        println!(
            "  Triple store: {} ({})",
            self.storetype,
            if self.storelocation.is_empty() {
                "in-memory"
            } else {
                self.storelocation.as_str()
            }
        );
        println!("  Store repository: {}", self.storerepository);
        println!("  Full-text index: {}", self.fulltextindex);
        if self.fulltextindex {
            println!("    Type: {}", self.indextype);
            if !self.indexlocation.is_empty() {
                println!("    Location: {}", self.indexlocation);
            }
        }
        println!("  Relate: {}", self.relate);
        println!("  Bulk triple load: {}", self.bulktripleload);
        println!("  All: {}", self.all);
        println!("  Upload: {}", self.upload);
        if !self.clientname.is_empty() {
            println!("  Client name: {}", self.clientname);
        }
        println!("  Tabs: {}", self.tabs);
        if let Some(locale) = &self.collate_locale {
            println!("  Collate locale: {}", locale);
        }
        println!("  News sort key: {}", self.news_sortkey);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::builder()
            .datadir(dir.path().join("data"))
            .url("http://example.org/")
            .collate_locale("sv_SE")
            .bulktripleload(true)
            .build()
            .unwrap();
        assert_eq!(config.news_sortkey, "updated");
        assert!(config.relate);

        let file = dir.path().join("config.json");
        config.save_to_file(&file).unwrap();
        let loaded = Config::from_file(&file).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_config_save_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("site/config.json");
        Config::builder().url("http://example.org/").build().unwrap().save_to_file(&file).unwrap();
        let config = Config::builder().tabs(false).build().unwrap();
        config.save_to_file(&file).unwrap();
        assert_eq!(Config::from_file(&file).unwrap(), config);
        let names: Vec<_> = std::fs::read_dir(dir.path().join("site"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config.json")]);
    }

    #[test]
    fn test_config_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        std::fs::write(&file, r#"{"url": "http://example.org/", "tabs": false}"#).unwrap();
        let config = Config::from_file(&file).unwrap();
        assert_eq!(config.url, "http://example.org/");
        assert!(!config.tabs);
        assert_eq!(config.storetype, "oxigraph");
        assert_eq!(config.collate_locale, None);
    }
}
