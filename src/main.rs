// Command-line entry point for the image compressor.
// The lib.rs file is the public API; this binary only wires files to the coordinator.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use image_compressor::core::{BatchItem, Progress, TranscodeResult};
use image_compressor::utils::data_uri;
use image_compressor::{BatchSettings, Coordinator, CoordinatorConfig, ImageFormat};

/// Re-encode images to JPEG, PNG, WebP or AVIF with automatic format fallback.
#[derive(Parser, Debug)]
#[command(name = "image-compressor")]
#[command(about = "Compress images with automatic format fallback")]
struct Args {
    /// Input image files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Encoder quality, 0-100. Ignored for PNG.
    #[arg(short, long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: u8,

    /// Target format: jpeg, png, webp or avif
    #[arg(short, long, default_value = "webp")]
    format: ImageFormat,

    /// Deliberately degrade output: downscale, posterize and add noise
    #[arg(long)]
    meme: bool,

    /// Directory the encoded files are written to
    #[arg(short, long, default_value = "compressed")]
    out_dir: PathBuf,

    /// Try the server-side AVIF endpoint before encoding locally
    #[arg(long)]
    server_avif: bool,

    /// Server-side AVIF endpoint
    #[arg(long)]
    avif_endpoint: Option<String>,

    /// Per-image worker timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print a JSON summary instead of log lines
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    info!("=== Image Compressor Starting ===");

    let config = build_config(&args)?;

    let mut items = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let (data, size) = data_uri::from_file(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        items.push(BatchItem::new(path.display().to_string(), data, size));
    }

    let coordinator = Coordinator::new(config)?;
    debug!("Coordinator config: {:?}", coordinator.config());
    let settings = BatchSettings {
        quality: args.quality,
        target_format: args.format,
        degrade: args.meme,
    };

    let results = coordinator
        .transcode_many(items, settings, report_progress, |result| {
            if let Some(notice) = result.encoded().and_then(|e| e.downgrade_notice.as_deref()) {
                warn!("{}: {}", result.source_name.as_deref().unwrap_or("?"), notice);
            }
        })
        .await;

    coordinator.dispose().await;

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    let mut written = Vec::with_capacity(results.len());
    let mut taken = HashSet::new();
    for result in &results {
        written.push(write_output(&args.out_dir, result, &mut taken).await?);
    }

    if args.json {
        let summary: Vec<_> = results
            .iter()
            .zip(&written)
            .map(|(result, path)| summarize(result, path.as_deref()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} images failed", results.len());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_names(false)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Environment settings overlaid with command-line flags.
fn build_config(args: &Args) -> Result<CoordinatorConfig> {
    let mut config = CoordinatorConfig::from_env()?;
    if args.server_avif {
        config.remote.enabled = true;
    }
    if let Some(endpoint) = &args.avif_endpoint {
        config.remote.endpoint = endpoint.clone();
    }
    if let Some(ms) = args.timeout_ms {
        anyhow::ensure!(ms > 0, "--timeout-ms must be greater than zero");
        config.worker_timeout_ms = ms;
    }
    Ok(config)
}

fn report_progress(progress: Progress) {
    match &progress.error {
        Some(error) => warn!(
            "[{}/{}] {} failed: {}",
            progress.completed_tasks,
            progress.total_tasks,
            progress.task_id.as_deref().unwrap_or("?"),
            error
        ),
        None => info!(
            "[{}/{}] {:.0}% {}",
            progress.completed_tasks,
            progress.total_tasks,
            progress.percentage(),
            progress.task_id.as_deref().unwrap_or("")
        ),
    }
}

/// Writes a successful result next to its siblings as `<stem>.<ext>`.
async fn write_output(
    out_dir: &Path,
    result: &TranscodeResult,
    taken: &mut HashSet<PathBuf>,
) -> Result<Option<PathBuf>> {
    let Some(encoded) = result.encoded() else {
        return Ok(None);
    };

    let source = result.source_name.as_deref().unwrap_or(&result.correlation_id);
    let stem = Path::new(source)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&result.correlation_id);
    let target = output_path(out_dir, stem, encoded.actual_format.primary_extension(), taken);

    let blob = data_uri::parse(&encoded.encoded_image)?;
    tokio::fs::write(&target, &blob.bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    info!(
        "{} -> {} ({} bytes, {}% saved)",
        source,
        target.display(),
        encoded.encoded_size,
        encoded.compression_ratio
    );
    Ok(Some(target))
}

/// `<stem>.<ext>` in `out_dir`, or `<stem>-<n>.<ext>` if an earlier input of this run
/// already claimed that name.
fn output_path(out_dir: &Path, stem: &str, ext: &str, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let mut target = out_dir.join(format!("{stem}.{ext}"));
    let mut n = 1;
    while taken.contains(&target) {
        target = out_dir.join(format!("{stem}-{n}.{ext}"));
        n += 1;
    }
    if n > 1 {
        warn!("{stem}.{ext} is already used by another input, writing {}", target.display());
    }
    taken.insert(target.clone());
    target
}

fn summarize(result: &TranscodeResult, output: Option<&Path>) -> serde_json::Value {
    match result.encoded() {
        Some(encoded) => serde_json::json!({
            "source": result.source_name,
            "success": true,
            "output": output.map(|p| p.display().to_string()),
            "originalSize": result.original_size,
            "size": encoded.encoded_size,
            "format": encoded.actual_format,
            "compressionRatio": encoded.compression_ratio,
            "downgradeNotice": encoded.downgrade_notice,
            "message": encoded.status_message,
        }),
        None => serde_json::json!({
            "source": result.source_name,
            "success": false,
            "originalSize": result.original_size,
            "error": result.error_message(),
        }),
    }
}
