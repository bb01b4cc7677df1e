//! Catalog fetch and bulk document download.
//!
//! Talks to the vendor's technical-literature catalog endpoint, turns rows
//! into [`Manual`](periscope_core::Manual) records, and streams the PDFs to
//! the local data directory.

use thiserror::Error;

pub mod catalog;
pub mod download;

pub use catalog::{DEFAULT_CATALOG_URL, build_client, fetch_catalog, parse_catalog};
pub use download::{DownloadProgress, DownloadStats, download_all, download_manual};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
