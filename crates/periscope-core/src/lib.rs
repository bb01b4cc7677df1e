use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub mod analyze;
pub mod backend;
pub mod cluster;
pub mod config_file;
pub mod extract;
pub mod pool;
pub mod report;
pub mod segment;
pub mod store;
pub mod vectorize;

// Re-export for convenience
pub use backend::{BackendError, OutlineEntry, PdfBackend};
pub use cluster::cluster_similarity;
pub use report::{GroupMember, ReportError, SectionGroup, SimilarityReport, build_report};
pub use store::{MANIFEST_VERSION, StoreError, load_manifest, save_manifest};
pub use vectorize::{Vectorized, vectorize};

/// A reference manual document and its derived sections.
///
/// `sections` is `None` until segmentation has been attempted. After an
/// analysis run it is always `Some` — an unreadable outline yields
/// `Some(vec![])` (analyzed but empty), which is distinct from
/// not-yet-attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manual {
    pub title: String,
    pub description: String,
    pub url: String,
    pub parts: Vec<String>,
    pub path: PathBuf,
    pub sections: Option<Vec<Section>>,
}

impl Manual {
    pub fn new(
        title: String,
        description: String,
        url: String,
        parts: Vec<String>,
        path: PathBuf,
    ) -> Self {
        Self {
            title,
            description,
            url,
            parts,
            path,
            sections: None,
        }
    }
}

/// A named page range within a manual, corresponding to one peripheral.
///
/// `page_from` is 0-indexed inclusive, `page_to` 0-indexed exclusive.
/// Sections of one manual never overlap: adjacent sections share a boundary
/// page (`a.page_to == b.page_from`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Abbreviation extracted from the outline title, e.g. "USART".
    pub title: String,
    pub page_from: u32,
    pub page_to: u32,
    /// Destination file for the extracted page range.
    pub path: PathBuf,
}

/// Per-manual extraction statistics.
#[derive(Debug, Clone, Default)]
pub struct ManualStats {
    /// Sections found by segmentation (or carried over from the manifest).
    pub sections: usize,
    /// Section files written by this run.
    pub extracted: usize,
    /// Section files that already existed.
    pub cached: usize,
    /// Sections whose qpdf invocation failed.
    pub failed: usize,
}

/// Progress events emitted during a batch analysis run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Analyzing {
        index: usize,
        total: usize,
        title: String,
    },
    Segmented {
        index: usize,
        total: usize,
        title: String,
        sections: usize,
    },
    SegmentationFailed {
        index: usize,
        total: usize,
        title: String,
        error: String,
    },
    SectionExtracted {
        index: usize,
        section: String,
    },
    SectionCached {
        index: usize,
        section: String,
    },
    SectionFailed {
        index: usize,
        section: String,
        error: String,
    },
    ManualComplete {
        index: usize,
        total: usize,
        title: String,
        stats: ManualStats,
    },
}

/// Configuration for a batch analysis run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of pool workers segmenting/extracting manuals concurrently.
    pub num_workers: usize,
    /// qpdf executable used for the page-copy step.
    pub qpdf_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_workers: 4,
            qpdf_path: "qpdf".into(),
        }
    }
}

/// Segment and extract a list of manuals.
///
/// Each manual is processed independently by a fixed-size worker pool;
/// failures are confined to the manual they occur in. Progress events are
/// emitted via the callback. The returned list preserves the input order,
/// with `sections` populated for every manual that was processed.
pub async fn analyze_manuals(
    manuals: Vec<Manual>,
    config: Config,
    backend: Arc<dyn PdfBackend>,
    progress: impl Fn(ProgressEvent) + Send + Sync + 'static,
    cancel: CancellationToken,
) -> Vec<Manual> {
    analyze::analyze_manuals(manuals, config, backend, progress, cancel).await
}
