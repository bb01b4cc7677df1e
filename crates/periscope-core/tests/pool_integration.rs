//! Integration tests for the [`AnalysisPool`].
//!
//! These tests use an in-memory backend and pre-created section files, so
//! no real PDF is opened and no qpdf process is spawned (every section hits
//! the cached path).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use periscope_core::backend::{BackendError, OutlineEntry};
use periscope_core::pool::{AnalysisPool, ManualJob};
use periscope_core::{Config, Manual, PdfBackend, ProgressEvent};
use tokio_util::sync::CancellationToken;

/// Backend with a canned outline: two peripheral chapters and one
/// non-matching entry between them.
struct CannedBackend {
    outline_reads: AtomicUsize,
}

impl CannedBackend {
    fn new() -> Self {
        Self {
            outline_reads: AtomicUsize::new(0),
        }
    }
}

impl PdfBackend for CannedBackend {
    fn read_outline(&self, _: &Path) -> Result<Vec<OutlineEntry>, BackendError> {
        self.outline_reads.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            OutlineEntry {
                title: "Universal synchronous asynchronous receiver transmitter (USART)".into(),
                page: 10,
            },
            OutlineEntry {
                title: "Electrical characteristics".into(),
                page: 40,
            },
            OutlineEntry {
                title: "General-purpose timers (TIM)".into(),
                page: 50,
            },
        ])
    }

    fn page_count(&self, _: &Path) -> Result<u32, BackendError> {
        Ok(100)
    }

    fn extract_text(&self, _: &Path) -> Result<String, BackendError> {
        Ok(String::new())
    }
}

fn config() -> Arc<Config> {
    Arc::new(Config {
        num_workers: 2,
        // Never invoked in these tests; a bogus path would fail loudly if it
        // were.
        qpdf_path: "/nonexistent/qpdf".into(),
    })
}

fn manual(dir: &Path, title: &str) -> Manual {
    Manual::new(
        title.to_string(),
        format!("{title} description"),
        String::new(),
        vec![],
        dir.join(format!("{title}.pdf")),
    )
}

/// Pre-create the section files the canned outline will produce, so the
/// extraction step takes the cached path for every section.
fn precreate_sections(manual: &Manual) {
    for abbrev in ["USART", "TIM"] {
        let path = PathBuf::from(format!("{}.{abbrev}.pdf", manual.path.display()));
        std::fs::write(path, b"stub").unwrap();
    }
}

#[tokio::test]
async fn single_manual_segments_and_caches() {
    let dir = tempfile::tempdir().unwrap();
    let m = manual(dir.path(), "RM0001");
    precreate_sections(&m);

    let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let cancel = CancellationToken::new();
    let pool = AnalysisPool::new(config(), Arc::new(CannedBackend::new()), cancel, 2);

    let (tx, rx) = tokio::sync::oneshot::channel();
    pool.submit(ManualJob {
        manual: m,
        result_tx: tx,
        index: 0,
        total: 1,
        progress: Arc::new(move |e| sink.lock().unwrap().push(e)),
    })
    .await;

    let result = rx.await.expect("should receive result");
    pool.shutdown().await;

    let sections = result.sections.expect("should be analyzed");
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].title, "USART");
    assert_eq!(sections[0].page_from, 10);
    assert_eq!(sections[0].page_to, 50);
    assert_eq!(sections[1].title, "TIM");
    assert_eq!(sections[1].page_to, 100);

    let events = events.lock().unwrap();
    let complete = events
        .iter()
        .find_map(|e| match e {
            ProgressEvent::ManualComplete { stats, .. } => Some(stats.clone()),
            _ => None,
        })
        .expect("should emit ManualComplete");
    assert_eq!(complete.sections, 2);
    assert_eq!(complete.cached, 2);
    assert_eq!(complete.failed, 0);
}

#[tokio::test]
async fn multiple_jobs_all_collected() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let pool = AnalysisPool::new(config(), Arc::new(CannedBackend::new()), cancel, 2);

    let total = 5;
    let mut receivers = Vec::with_capacity(total);
    for i in 0..total {
        let m = manual(dir.path(), &format!("RM{i:04}"));
        precreate_sections(&m);

        let (tx, rx) = tokio::sync::oneshot::channel();
        pool.submit(ManualJob {
            manual: m,
            result_tx: tx,
            index: i,
            total,
            progress: Arc::new(|_| {}),
        })
        .await;
        receivers.push(rx);
    }

    let mut results = Vec::with_capacity(total);
    for rx in receivers {
        results.push(rx.await.expect("should receive result"));
    }
    pool.shutdown().await;

    assert_eq!(results.len(), total);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.title, format!("RM{i:04}"));
        assert_eq!(r.sections.as_ref().unwrap().len(), 2);
    }
}

#[tokio::test]
async fn cancellation_returns_manuals_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let pool = AnalysisPool::new(config(), Arc::new(CannedBackend::new()), cancel.clone(), 2);

    cancel.cancel();

    let (tx, rx) = tokio::sync::oneshot::channel();
    pool.submit(ManualJob {
        manual: manual(dir.path(), "RM0001"),
        result_tx: tx,
        index: 0,
        total: 1,
        progress: Arc::new(|_| {}),
    })
    .await;

    let result = rx.await.expect("should receive result");
    pool.shutdown().await;

    assert!(result.sections.is_none());
}

#[tokio::test]
async fn already_segmented_manual_skips_the_backend() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(CannedBackend::new());
    let cancel = CancellationToken::new();
    let pool = AnalysisPool::new(config(), backend.clone(), cancel, 1);

    let mut m = manual(dir.path(), "RM0001");
    m.sections = Some(Vec::new());

    let (tx, rx) = tokio::sync::oneshot::channel();
    pool.submit(ManualJob {
        manual: m,
        result_tx: tx,
        index: 0,
        total: 1,
        progress: Arc::new(|_| {}),
    })
    .await;

    let result = rx.await.expect("should receive result");
    pool.shutdown().await;

    assert_eq!(result.sections.as_ref().unwrap().len(), 0);
    assert_eq!(backend.outline_reads.load(Ordering::SeqCst), 0);
}
