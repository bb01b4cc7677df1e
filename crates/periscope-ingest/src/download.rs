//! Bulk PDF download with a bounded amount of concurrency.
//!
//! Each manual streams to `<path>.part` and is renamed into place once the
//! body is fully written, so an interrupted run never leaves a truncated
//! file behind under the final name. Existing files are kept as-is.

use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use periscope_core::Manual;

use crate::IngestError;

/// Progress events emitted during a bulk download run.
#[derive(Debug, Clone)]
pub enum DownloadProgress {
    Started {
        index: usize,
        total: usize,
        title: String,
        total_bytes: Option<u64>,
    },
    Chunk {
        index: usize,
        bytes_downloaded: u64,
    },
    Cached {
        index: usize,
        total: usize,
        title: String,
    },
    Complete {
        index: usize,
        total: usize,
        title: String,
    },
    Failed {
        index: usize,
        total: usize,
        title: String,
        error: String,
    },
}

/// Outcome counts for a bulk download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub downloaded: usize,
    pub cached: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Per-manual download outcome.
enum Outcome {
    Downloaded,
    Cached,
    Failed,
    Cancelled,
}

async fn fetch_to_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    mut on_chunk: impl FnMut(u64, Option<u64>),
) -> Result<(), IngestError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| IngestError::Http(e.to_string()))?;
    if !response.status().is_success() {
        return Err(IngestError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let total_bytes = response.content_length();
    on_chunk(0, total_bytes);

    let part_path = path.with_extension("pdf.part");
    let mut out = tokio::fs::File::create(&part_path).await?;
    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;

    let written: Result<(), IngestError> = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| IngestError::Http(e.to_string()))?;
            tokio::io::AsyncWriteExt::write_all(&mut out, &chunk).await?;
            bytes_downloaded += chunk.len() as u64;
            on_chunk(bytes_downloaded, total_bytes);
        }
        tokio::io::AsyncWriteExt::flush(&mut out).await?;
        Ok(())
    }
    .await;
    drop(out);

    // A truncated body must not leave a partial file behind.
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(e);
    }

    tokio::fs::rename(&part_path, path).await?;
    Ok(())
}

/// Download one manual's PDF, skipping it when the file already exists.
///
/// Returns `Ok(true)` when a new file was written and `Ok(false)` when the
/// existing file was kept.
pub async fn download_manual(
    client: &reqwest::Client,
    manual: &Manual,
    mut on_chunk: impl FnMut(u64, Option<u64>),
) -> Result<bool, IngestError> {
    if manual.path.is_file() {
        return Ok(false);
    }
    fetch_to_file(client, &manual.url, &manual.path, &mut on_chunk).await?;
    Ok(true)
}

/// Download every manual in `manuals`, at most `workers` at a time.
///
/// Individual failures are reported via `progress` and counted; they never
/// abort the rest of the batch. Cancellation stops scheduling new downloads
/// and lets in-flight ones finish their current state transition.
pub async fn download_all(
    client: &reqwest::Client,
    manuals: &[Manual],
    workers: usize,
    progress: Arc<dyn Fn(DownloadProgress) + Send + Sync>,
    cancel: CancellationToken,
) -> DownloadStats {
    let total = manuals.len();

    let outcomes: Vec<Outcome> = futures_util::stream::iter(manuals.iter().enumerate().map(
        |(index, manual)| {
            let client = client.clone();
            let progress = progress.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return Outcome::Cancelled;
                }
                if manual.path.is_file() {
                    progress(DownloadProgress::Cached {
                        index,
                        total,
                        title: manual.title.clone(),
                    });
                    return Outcome::Cached;
                }

                let on_chunk = |bytes_downloaded: u64, total_bytes: Option<u64>| {
                    if bytes_downloaded == 0 {
                        progress(DownloadProgress::Started {
                            index,
                            total,
                            title: manual.title.clone(),
                            total_bytes,
                        });
                    } else {
                        progress(DownloadProgress::Chunk {
                            index,
                            bytes_downloaded,
                        });
                    }
                };

                match fetch_to_file(&client, &manual.url, &manual.path, on_chunk).await {
                    Ok(()) => {
                        progress(DownloadProgress::Complete {
                            index,
                            total,
                            title: manual.title.clone(),
                        });
                        Outcome::Downloaded
                    }
                    Err(e) => {
                        tracing::warn!(
                            title = %manual.title,
                            url = %manual.url,
                            error = %e,
                            "download failed"
                        );
                        progress(DownloadProgress::Failed {
                            index,
                            total,
                            title: manual.title.clone(),
                            error: e.to_string(),
                        });
                        Outcome::Failed
                    }
                }
            }
        },
    ))
    .buffer_unordered(workers.max(1))
    .collect()
    .await;

    let mut stats = DownloadStats::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Downloaded => stats.downloaded += 1,
            Outcome::Cached => stats.cached += 1,
            Outcome::Failed => stats.failed += 1,
            Outcome::Cancelled => stats.cancelled += 1,
        }
    }

    tracing::info!(
        downloaded = stats.downloaded,
        cached = stats.cached,
        failed = stats.failed,
        cancelled = stats.cancelled,
        "download run finished"
    );
    stats
}
