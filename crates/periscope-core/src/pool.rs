//! Fixed-size worker pool for manual segmentation and extraction.
//!
//! Each worker receives one manual, segments and extracts it independently,
//! and returns the updated manual over a oneshot channel. Workers share no
//! mutable state; the coordinator ([`crate::analyze`]) merges results back
//! into the authoritative list sequentially after the pool drains.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::extract::{SectionOutcome, extract_sections};
use crate::segment::analyze_manual;
use crate::{Config, Manual, ManualStats, PdfBackend, ProgressEvent};

/// A manual analysis job submitted to the pool.
pub struct ManualJob {
    pub manual: Manual,
    pub result_tx: oneshot::Sender<Manual>,
    pub index: usize,
    pub total: usize,
    /// Progress callback for this job.
    pub progress: Arc<dyn Fn(ProgressEvent) + Send + Sync>,
}

/// A pool of worker tasks that segment and extract manuals.
///
/// Submit jobs via [`submit()`](AnalysisPool::submit); receive each updated
/// manual via the oneshot receiver paired with its job.
pub struct AnalysisPool {
    job_tx: async_channel::Sender<ManualJob>,
    pool_handle: JoinHandle<()>,
}

impl AnalysisPool {
    /// Create a new pool with `num_workers` worker tasks.
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn PdfBackend>,
        cancel: CancellationToken,
        num_workers: usize,
    ) -> Self {
        let (job_tx, job_rx) = async_channel::unbounded::<ManualJob>();

        let pool_handle = tokio::spawn(async move {
            let mut handles = Vec::with_capacity(num_workers.max(1));
            for _ in 0..num_workers.max(1) {
                handles.push(tokio::spawn(worker_loop(
                    job_rx.clone(),
                    config.clone(),
                    backend.clone(),
                    cancel.clone(),
                )));
            }
            drop(job_rx);

            // Workers exit when job_tx closes (or on cancellation).
            for h in handles {
                let _ = h.await;
            }
        });

        Self {
            job_tx,
            pool_handle,
        }
    }

    /// Submit a job to the pool.
    pub async fn submit(&self, job: ManualJob) {
        let _ = self.job_tx.send(job).await;
    }

    /// Close the pool and wait for all workers to finish.
    pub async fn shutdown(self) {
        self.job_tx.close();
        let _ = self.pool_handle.await;
    }
}

/// Worker loop: segment (unless already segmented), then extract.
async fn worker_loop(
    job_rx: async_channel::Receiver<ManualJob>,
    config: Arc<Config>,
    backend: Arc<dyn PdfBackend>,
    cancel: CancellationToken,
) {
    while let Ok(job) = job_rx.recv().await {
        let ManualJob {
            mut manual,
            result_tx,
            index,
            total,
            progress,
        } = job;

        if cancel.is_cancelled() {
            // Hand the manual back untouched so the coordinator keeps it.
            let _ = result_tx.send(manual);
            continue;
        }

        progress(ProgressEvent::Analyzing {
            index,
            total,
            title: manual.title.clone(),
        });

        // Segmentation is skipped once sections exist (idempotent); mupdf
        // reads are blocking, so they run off the async threads.
        if manual.sections.is_none() {
            let backend = backend.clone();
            let path = manual.path.clone();
            let segmented =
                tokio::task::spawn_blocking(move || analyze_manual(backend.as_ref(), &path)).await;

            match segmented {
                Ok(Ok(sections)) => {
                    progress(ProgressEvent::Segmented {
                        index,
                        total,
                        title: manual.title.clone(),
                        sections: sections.len(),
                    });
                    manual.sections = Some(sections);
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        manual = %manual.path.display(),
                        error = %e,
                        "segmentation failed"
                    );
                    progress(ProgressEvent::SegmentationFailed {
                        index,
                        total,
                        title: manual.title.clone(),
                        error: e.to_string(),
                    });
                    // Analyzed but empty — distinct from not-yet-attempted.
                    manual.sections = Some(Vec::new());
                }
                Err(join_err) => {
                    tracing::error!(
                        manual = %manual.path.display(),
                        error = %join_err,
                        "segmentation task panicked"
                    );
                    progress(ProgressEvent::SegmentationFailed {
                        index,
                        total,
                        title: manual.title.clone(),
                        error: join_err.to_string(),
                    });
                    manual.sections = Some(Vec::new());
                }
            }
        }

        // Extraction always runs: the existence check makes it free for
        // already-materialized sections and heals earlier failures.
        let sections = manual.sections.clone().unwrap_or_default();
        let stats = if sections.is_empty() {
            ManualStats::default()
        } else {
            let progress_cb = progress.clone();
            extract_sections(&config.qpdf_path, &manual.path, &sections, |section, outcome| {
                let event = match outcome {
                    SectionOutcome::Extracted => ProgressEvent::SectionExtracted {
                        index,
                        section: section.title.clone(),
                    },
                    SectionOutcome::Cached => ProgressEvent::SectionCached {
                        index,
                        section: section.title.clone(),
                    },
                    SectionOutcome::Failed(error) => ProgressEvent::SectionFailed {
                        index,
                        section: section.title.clone(),
                        error: error.clone(),
                    },
                };
                progress_cb(event);
            })
            .await
        };

        tracing::info!(
            index,
            manual = %manual.title,
            sections = stats.sections,
            extracted = stats.extracted,
            cached = stats.cached,
            failed = stats.failed,
            "manual analyzed"
        );

        progress(ProgressEvent::ManualComplete {
            index,
            total,
            title: manual.title.clone(),
            stats,
        });

        let _ = result_tx.send(manual);
    }
}
