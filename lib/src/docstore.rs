//! Where a repository keeps its files.
//!
//! Every artifact of a document lives under `<datadir>/<alias>/<maindir>/`, named after
//! the document's basefile. Basefiles may contain characters that are awkward in file
//! names, so they are percent-quoted, and `%` escapes are pushed into their own path
//! segment to keep directories small.

use crate::options::StoragePolicy;
use crate::util::{atomic_write, list_files, quote, unquote};
use anyhow::{anyhow, Result};
use fs2::FileExt;
use log::debug;
use std::path::{Path, PathBuf};

const SAFE: &str = "/;@&=+,";

#[derive(Debug, Clone)]
pub struct DocumentStore {
    datadir: PathBuf,
    storage_policy: StoragePolicy,
    downloaded_suffix: String,
}

impl DocumentStore {
    /// `datadir` is the repository's own directory, i.e. `<config.datadir>/<alias>`.
    pub fn new<P: Into<PathBuf>>(datadir: P) -> Self {
        DocumentStore {
            datadir: datadir.into(),
            storage_policy: StoragePolicy::File,
            downloaded_suffix: ".html".to_string(),
        }
    }

    pub fn with_storage_policy(mut self, policy: StoragePolicy) -> Self {
        self.storage_policy = policy;
        self
    }

    pub fn with_downloaded_suffix(mut self, suffix: &str) -> Self {
        self.downloaded_suffix = suffix.to_string();
        self
    }

    pub fn datadir(&self) -> &Path {
        &self.datadir
    }

    pub fn storage_policy(&self) -> StoragePolicy {
        self.storage_policy
    }

    pub fn basefile_to_pathfrag(basefile: &str) -> String {
        quote(basefile, SAFE).replace('%', "/%")
    }

    pub fn pathfrag_to_basefile(pathfrag: &str) -> String {
        let pathfrag = pathfrag.replace(std::path::MAIN_SEPARATOR, "/");
        unquote(&pathfrag.replace("/%", "%"))
    }

    /// Path of the file for `basefile` in `maindir`, according to the storage policy.
    pub fn path(&self, basefile: &str, maindir: &str, suffix: &str) -> PathBuf {
        let pathfrag = Self::basefile_to_pathfrag(basefile);
        // a leading escape must not turn the fragment into an absolute path
        let pathfrag = pathfrag.trim_start_matches('/');
        let dir = self.datadir.join(maindir);
        match self.storage_policy {
            StoragePolicy::File => dir.join(format!("{}{}", pathfrag, suffix)),
            StoragePolicy::Dir => dir.join(pathfrag).join(format!("index{}", suffix)),
        }
    }

    /// Path of a repository-wide file such as `toc/faceted_data.json`.
    pub fn resourcepath(&self, name: &str) -> PathBuf {
        self.datadir.join(name)
    }

    pub fn downloaded_path(&self, basefile: &str) -> PathBuf {
        self.path(basefile, "downloaded", &self.downloaded_suffix)
    }

    pub fn parsed_path(&self, basefile: &str) -> PathBuf {
        self.path(basefile, "parsed", ".xhtml")
    }

    pub fn distilled_path(&self, basefile: &str) -> PathBuf {
        self.path(basefile, "distilled", ".rdf")
    }

    pub fn generated_path(&self, basefile: &str) -> PathBuf {
        self.path(basefile, "generated", ".html")
    }

    pub fn documententry_path(&self, basefile: &str) -> PathBuf {
        self.path(basefile, "entries", ".json")
    }

    pub fn dependencies_path(&self, basefile: &str) -> PathBuf {
        self.path(basefile, "deps", ".txt")
    }

    /// Basefiles that are ready for `action`, in sorted order.
    pub fn list_basefiles_for(&self, action: &str) -> Result<Vec<String>> {
        let (maindir, suffix) = match action {
            "parse" => ("downloaded", self.downloaded_suffix.as_str()),
            "relate" => ("distilled", ".rdf"),
            "generate" => ("parsed", ".xhtml"),
            "news" => ("entries", ".json"),
            other => return Err(anyhow!("No basefiles are listed for action {}", other)),
        };
        let dir = self.datadir.join(maindir);
        let mut basefiles = vec![];
        for file in list_files(&dir, suffix) {
            let relative = match file.strip_prefix(&dir) {
                Ok(r) => r.to_string_lossy().to_string(),
                Err(_) => continue,
            };
            let pathfrag = &relative[..relative.len() - suffix.len()];
            let pathfrag = match self.storage_policy {
                StoragePolicy::File => pathfrag,
                StoragePolicy::Dir => match pathfrag.strip_suffix("index") {
                    Some(p) => p.trim_end_matches(['/', std::path::MAIN_SEPARATOR]),
                    None => continue,
                },
            };
            basefiles.push(Self::pathfrag_to_basefile(pathfrag));
        }
        basefiles.sort();
        Ok(basefiles)
    }

    fn lock_dependencies(&self) -> Result<std::fs::File> {
        let dir = self.datadir.join("deps");
        std::fs::create_dir_all(&dir)?;
        let lock = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(dir.join(".lock"))?;
        lock.lock_exclusive()?;
        Ok(lock)
    }

    /// Records that `basefile` depends on `dependency`. Returns false if it already did.
    pub fn add_dependency(&self, basefile: &str, dependency: &str) -> Result<bool> {
        let lock = self.lock_dependencies()?;
        let path = self.dependencies_path(basefile);
        let mut lines = if path.exists() {
            self.read_dependencies(basefile)?
        } else {
            vec![]
        };
        let added = if lines.iter().any(|l| l == dependency) {
            false
        } else {
            lines.push(dependency.to_string());
            let mut content = lines.join("\n");
            content.push('\n');
            atomic_write(&path, content.as_bytes())?;
            debug!("{}: added dependency {}", basefile, dependency);
            true
        };
        lock.unlock()?;
        Ok(added)
    }

    pub fn read_dependencies(&self, basefile: &str) -> Result<Vec<String>> {
        let path = self.dependencies_path(basefile);
        if !path.exists() {
            return Ok(vec![]);
        }
        Ok(std::fs::read_to_string(path)?
            .lines()
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let store = DocumentStore::new("/data/base");
        assert_eq!(
            store.distilled_path("123/a"),
            PathBuf::from("/data/base/distilled/123/a.rdf")
        );
        assert_eq!(
            store.parsed_path("a b"),
            PathBuf::from("/data/base/parsed/a/%20b.xhtml")
        );
        let store = store.with_storage_policy(StoragePolicy::Dir);
        assert_eq!(
            store.generated_path("123/a"),
            PathBuf::from("/data/base/generated/123/a/index.html")
        );
        assert_eq!(
            store.resourcepath("toc/faceted_data.json"),
            PathBuf::from("/data/base/toc/faceted_data.json")
        );
    }

    #[test]
    fn test_pathfrag_roundtrip() {
        for basefile in ["123/a", "a b", "sfs:1998:204", "ö"] {
            let frag = DocumentStore::basefile_to_pathfrag(basefile);
            assert_eq!(DocumentStore::pathfrag_to_basefile(&frag), basefile);
        }
    }

    #[test]
    fn test_list_basefiles() {
        let dir = tempfile::tempdir().unwrap();
        for policy in [StoragePolicy::File, StoragePolicy::Dir] {
            let store = DocumentStore::new(dir.path().join(format!("{:?}", policy)))
                .with_storage_policy(policy);
            for basefile in ["123/a", "b c", "1"] {
                atomic_write(&store.distilled_path(basefile), b"").unwrap();
            }
            std::fs::write(store.resourcepath("distilled/dump.nt"), b"").unwrap();
            assert_eq!(
                store.list_basefiles_for("relate").unwrap(),
                vec!["1", "123/a", "b c"]
            );
            assert!(store.list_basefiles_for("fly").is_err());
        }
    }

    #[test]
    fn test_add_dependency_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        assert!(store.add_dependency("1", "data/other/parsed/2.xhtml").unwrap());
        assert!(!store.add_dependency("1", "data/other/parsed/2.xhtml").unwrap());
        assert!(store.add_dependency("1", "data/other/parsed/3.xhtml").unwrap());
        assert_eq!(
            std::fs::read_to_string(store.dependencies_path("1")).unwrap(),
            "data/other/parsed/2.xhtml\ndata/other/parsed/3.xhtml\n"
        );
    }
}
