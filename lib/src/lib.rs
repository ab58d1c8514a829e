//! Faceted metadata pipeline for repositories of RDF-annotated documents.
//!
//! A repository keeps downloaded, parsed and distilled versions of each document in a
//! [`docstore::DocumentStore`]. Relating a document pushes it into a full-text index,
//! the dependency files of the documents it refers to and a triple store. From the
//! triple store, the facets of the repository select one row per document, which are
//! then partitioned into table of contents pages and news feeds.

extern crate derive_builder;

pub mod collate;
pub mod config;
pub mod consts;
pub mod describer;
pub mod docstore;
pub mod entry;
pub mod errors;
pub mod facet;
pub mod faceted;
pub mod fulltext;
pub mod namespaces;
pub mod news;
pub mod options;
pub mod query;
pub mod relate;
pub mod repository;
pub mod resource;
pub mod toc;
pub mod triplestore;
pub mod util;
pub mod value;

pub use config::Config;
pub use facet::Facet;
pub use faceted::faceted_data;
pub use news::news;
pub use query::facet_query;
pub use relate::{relate, relate_all_setup, relate_all_teardown};
pub use repository::{DocumentRepository, Repository};
pub use toc::toc;
pub use value::{Row, Value};

/// Initializes logging. `DOCREPO_LOG`, when set, takes precedence over `RUST_LOG`.
/// Calling it more than once is harmless.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("DOCREPO_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
    let _ = env_logger::try_init();
}
