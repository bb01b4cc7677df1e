use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

mod output;

use output::ColorMode;

/// Reference-manual section comparison across a microcontroller family
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the manual catalog and download new PDFs
    Update {
        /// Data directory for documents and the manifest
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Catalog endpoint URL
        #[arg(long)]
        catalog_url: Option<String>,

        /// Number of concurrent downloads
        #[arg(long)]
        download_workers: Option<usize>,

        /// Refresh the catalog only, skip PDF downloads
        #[arg(long)]
        no_download: bool,
    },

    /// Segment downloaded manuals into peripheral sections and extract them
    Analyze {
        /// Data directory for documents and the manifest
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Number of concurrent analysis workers
        #[arg(long)]
        num_workers: Option<usize>,

        /// Path to the qpdf executable
        #[arg(long)]
        qpdf: Option<String>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Group manuals by similarity of one peripheral section
    Compare {
        /// Peripheral abbreviation to compare, e.g. USART
        section: String,

        /// Data directory for documents and the manifest
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path to output file (plain text, no colors)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

/// Effective settings after cascading CLI flags > env vars > config file >
/// defaults.
struct Settings {
    data_dir: PathBuf,
    num_workers: usize,
    download_workers: usize,
    qpdf_path: String,
    catalog_url: String,
}

fn resolve_settings(
    data_dir: Option<PathBuf>,
    num_workers: Option<usize>,
    download_workers: Option<usize>,
    qpdf: Option<String>,
    catalog_url: Option<String>,
) -> Settings {
    let file = periscope_core::config_file::load_config();

    let data_dir = data_dir
        .or_else(|| std::env::var("PERISCOPE_DATA_DIR").ok().map(PathBuf::from))
        .or_else(|| {
            file.storage
                .as_ref()
                .and_then(|s| s.data_dir.clone())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(".periscope/data"));

    let num_workers = num_workers
        .or_else(|| {
            std::env::var("PERISCOPE_NUM_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
        })
        .or_else(|| file.concurrency.as_ref().and_then(|c| c.num_workers))
        .unwrap_or(4);

    let download_workers = download_workers
        .or_else(|| {
            std::env::var("PERISCOPE_DOWNLOAD_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
        })
        .or_else(|| file.concurrency.as_ref().and_then(|c| c.download_workers))
        .unwrap_or(10);

    let qpdf_path = qpdf
        .or_else(|| std::env::var("PERISCOPE_QPDF").ok())
        .or_else(|| file.tools.as_ref().and_then(|t| t.qpdf_path.clone()))
        .unwrap_or_else(|| "qpdf".to_string());

    let catalog_url = catalog_url
        .or_else(|| std::env::var("PERISCOPE_CATALOG_URL").ok())
        .or_else(|| file.catalog.as_ref().and_then(|c| c.url.clone()))
        .unwrap_or_else(|| periscope_ingest::DEFAULT_CATALOG_URL.to_string());

    Settings {
        data_dir,
        num_workers,
        download_workers,
        qpdf_path,
        catalog_url,
    }
}

fn manifest_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("manifest.json")
}

fn ctrl_c_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Update {
            data_dir,
            catalog_url,
            download_workers,
            no_download,
        } => {
            let settings = resolve_settings(data_dir, None, download_workers, None, catalog_url);
            update(settings, no_download).await
        }
        Command::Analyze {
            data_dir,
            num_workers,
            qpdf,
            no_color,
        } => {
            let settings = resolve_settings(data_dir, num_workers, None, qpdf, None);
            analyze(settings, no_color).await
        }
        Command::Compare {
            section,
            data_dir,
            output,
            no_color,
        } => {
            let settings = resolve_settings(data_dir, None, None, None, None);
            compare(settings, &section, output, no_color)
        }
    }
}

async fn update(settings: Settings, no_download: bool) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let client = periscope_ingest::build_client()?;

    println!("Fetching manual catalog...");
    let mut manuals =
        periscope_ingest::fetch_catalog(&client, &settings.catalog_url, &settings.data_dir).await?;
    println!("Catalog lists {} reference manuals", manuals.len());

    // Carry analysis results over from the previous manifest, so a catalog
    // refresh does not force re-segmentation of unchanged manuals.
    let manifest = manifest_path(&settings.data_dir);
    if let Some(previous) = periscope_core::load_manifest(&manifest)? {
        for manual in &mut manuals {
            if let Some(old) = previous
                .iter()
                .find(|m| m.title == manual.title && m.path == manual.path)
            {
                manual.sections = old.sections.clone();
            }
        }
    }

    if !no_download {
        let total = manuals.len() as u64;
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {msg} [{bar:40.cyan/dim}] {pos}/{len} (eta {eta})",
            )?
            .progress_chars("=> "),
        );
        bar.set_message("Downloading");

        let bar_cb = bar.clone();
        let progress = Arc::new(move |event: periscope_ingest::DownloadProgress| {
            use periscope_ingest::DownloadProgress::*;
            match event {
                Cached { .. } | Complete { .. } => bar_cb.inc(1),
                Failed { title, error, .. } => {
                    bar_cb.println(format!("FAILED {title}: {error}"));
                    bar_cb.inc(1);
                }
                Started { .. } | Chunk { .. } => {}
            }
        });

        let cancel = ctrl_c_token();
        let stats = periscope_ingest::download_all(
            &client,
            &manuals,
            settings.download_workers,
            progress,
            cancel,
        )
        .await;
        bar.finish_with_message(format!(
            "{} downloaded, {} cached, {} failed",
            stats.downloaded, stats.cached, stats.failed
        ));
        if stats.cancelled > 0 {
            println!("Interrupted: {} downloads not attempted", stats.cancelled);
        }
    }

    periscope_core::save_manifest(&manifest, &manuals)?;
    println!("Manifest written to {}", manifest.display());
    Ok(())
}

async fn analyze(settings: Settings, no_color: bool) -> anyhow::Result<()> {
    let manifest = manifest_path(&settings.data_dir);
    let manuals = periscope_core::load_manifest(&manifest)?.ok_or_else(|| {
        anyhow::anyhow!(
            "No manifest at {}. Run: periscope update",
            manifest.display()
        )
    })?;

    let color = ColorMode(!no_color);
    let writer: Arc<Mutex<Box<dyn Write + Send>>> = Arc::new(Mutex::new(Box::new(std::io::stdout())));

    let progress_writer = Arc::clone(&writer);
    let progress = move |event: periscope_core::ProgressEvent| {
        if let Ok(mut w) = progress_writer.lock() {
            let _ = output::print_progress(&mut *w, &event, color);
            let _ = w.flush();
        }
    };

    let config = periscope_core::Config {
        num_workers: settings.num_workers,
        qpdf_path: settings.qpdf_path.clone(),
    };
    let backend = Arc::new(periscope_pdf_mupdf::MupdfBackend::new());
    let cancel = ctrl_c_token();

    let manuals =
        periscope_core::analyze_manuals(manuals, config, backend, progress, cancel).await;

    periscope_core::save_manifest(&manifest, &manuals)?;

    let analyzed = manuals.iter().filter(|m| m.sections.is_some()).count();
    println!("Analyzed {}/{} manuals", analyzed, manuals.len());
    Ok(())
}

fn compare(
    settings: Settings,
    section: &str,
    output: Option<PathBuf>,
    no_color: bool,
) -> anyhow::Result<()> {
    let manifest = manifest_path(&settings.data_dir);
    let manuals = periscope_core::load_manifest(&manifest)?.ok_or_else(|| {
        anyhow::anyhow!(
            "No manifest at {}. Run: periscope update && periscope analyze",
            manifest.display()
        )
    })?;

    let backend = periscope_pdf_mupdf::MupdfBackend::new();
    let report = periscope_core::build_report(&manuals, section, &backend)?;

    let use_color = !no_color && output.is_none();
    let mut writer: Box<dyn Write> = if let Some(ref output_path) = output {
        Box::new(std::fs::File::create(output_path)?)
    } else {
        Box::new(std::io::stdout())
    };

    output::print_report(&mut writer, &report, ColorMode(use_color))?;
    Ok(())
}
