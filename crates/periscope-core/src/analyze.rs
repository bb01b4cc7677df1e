//! Batch coordinator: drives the [`AnalysisPool`](crate::pool::AnalysisPool)
//! over a manual list and merges results back in input order.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::pool::{AnalysisPool, ManualJob};
use crate::{Config, Manual, PdfBackend, ProgressEvent};

/// Segment and extract a list of manuals with a fixed-size worker pool.
///
/// Every manual is submitted as an independent job; results are collected
/// via oneshot channels and written back by index, so the returned list is
/// aligned with the input. A manual whose worker was cancelled (or whose
/// result channel was dropped) is returned unchanged.
pub async fn analyze_manuals(
    manuals: Vec<Manual>,
    config: Config,
    backend: Arc<dyn PdfBackend>,
    progress: impl Fn(ProgressEvent) + Send + Sync + 'static,
    cancel: CancellationToken,
) -> Vec<Manual> {
    let total = manuals.len();
    if total == 0 {
        return manuals;
    }

    let num_workers = config.num_workers.max(1);
    let config = Arc::new(config);
    let progress = Arc::new(progress);

    let pool = AnalysisPool::new(config, backend, cancel.clone(), num_workers);

    let mut receivers = Vec::with_capacity(total);
    let mut results: Vec<Option<Manual>> = manuals.iter().cloned().map(Some).collect();

    for (i, manual) in manuals.into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        let (result_tx, result_rx) = tokio::sync::oneshot::channel();
        pool.submit(ManualJob {
            manual,
            result_tx,
            index: i,
            total,
            progress: progress.clone(),
        })
        .await;
        receivers.push((i, result_rx));
    }

    for (i, rx) in receivers {
        if let Ok(manual) = rx.await {
            results[i] = Some(manual);
        }
    }

    pool.shutdown().await;

    results.into_iter().flatten().collect()
}
