//! Download engine. Maps fetched asset records onto `root[/album]/<file>`
//! and downloads them with bounded concurrency. Every item is independent:
//! a failure is recorded in the [`DownloadReport`] and the batch carries on.

pub mod error;
pub mod file;
pub mod paths;

use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::graph::{AssetRecord, Transport};
pub use error::DownloadError;
pub use paths::DownloadPlan;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Knobs for one `download_all` run. Decoupled from CLI parsing so the
/// engine can be tested independently.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub concurrency: usize,
    pub dry_run: bool,
    pub no_progress_bar: bool,
    /// Stamp each file's mtime with the asset's `created_time`.
    pub set_mtime: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
            no_progress_bar: false,
            set_mtime: true,
        }
    }
}

#[derive(Debug)]
pub enum SkipReason {
    /// Record has no `source`; nothing to download.
    NoSource,
    DryRun(PathBuf),
    /// Shutdown was requested before the item finished. Nothing was
    /// written to its destination.
    Cancelled,
}

#[derive(Debug)]
pub enum ItemOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    Skipped(SkipReason),
    Failed {
        path: Option<PathBuf>,
        error: DownloadError,
    },
}

/// Per-item outcomes, in the same order as the input records.
#[derive(Debug)]
pub struct DownloadReport {
    pub outcomes: Vec<ItemOutcome>,
    pub elapsed: Duration,
}

impl DownloadReport {
    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Downloaded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn was_cancelled(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o, ItemOutcome::Skipped(SkipReason::Cancelled)))
    }

    /// `(input index, destination if known, error)` for every failed item.
    pub fn failures(&self) -> impl Iterator<Item = (usize, Option<&Path>, &DownloadError)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, o)| match o {
                ItemOutcome::Failed { path, error } => Some((i, path.as_deref(), error)),
                _ => None,
            })
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

/// Create a progress bar with a consistent template.
///
/// Hidden when the user passed `--no-progress-bar` or stdout is not a TTY.
fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .expect("valid template")
        .progress_chars("=> "),
    );
    pb
}

/// Download every record with a `source` into `root`.
///
/// Records are scheduled in input order, at most `options.concurrency` at a
/// time. Once `shutdown` fires no new item starts and in-flight downloads
/// are abandoned with their scratch files removed; all of these are
/// reported as cancelled.
pub async fn download_all(
    transport: &dyn Transport,
    items: &[AssetRecord],
    root: &Path,
    options: &DownloadOptions,
    shutdown: CancellationToken,
) -> DownloadReport {
    let started = Instant::now();
    let mut outcomes: Vec<Option<ItemOutcome>> = items
        .iter()
        .map(|rec| {
            rec.source
                .is_none()
                .then_some(ItemOutcome::Skipped(SkipReason::NoSource))
        })
        .collect();

    let work: Vec<(usize, &AssetRecord)> = items
        .iter()
        .enumerate()
        .filter(|(_, rec)| rec.source.is_some())
        .collect();
    let total = work.len();
    tracing::info!(
        "==> Starting download of {} assets into {}",
        total,
        root.display()
    );

    if !options.dry_run {
        let directories: BTreeSet<PathBuf> = work
            .iter()
            .filter_map(|(_, rec)| {
                DownloadPlan::new(root, rec.album_name(), rec.source.as_deref()?).ok()
            })
            .map(|plan| plan.directory)
            .collect();
        for dir in &directories {
            let removed = file::remove_stale_parts(dir).await;
            if removed > 0 {
                tracing::info!(
                    "Removed {} partial files left in {} by an interrupted run",
                    removed,
                    dir.display()
                );
            }
        }
    }

    let pb = create_progress_bar(options.no_progress_bar, total as u64);
    let shutdown_ref = &shutdown;

    let mut results = stream::iter(work)
        .take_while(|_| std::future::ready(!shutdown_ref.is_cancelled()))
        .map(|(index, record)| async move {
            let outcome =
                download_one(transport, index, record, root, options, shutdown_ref).await;
            (index, outcome)
        })
        .buffer_unordered(options.concurrency.max(1));

    let mut done = 0usize;
    while let Some((index, outcome)) = results.next().await {
        done += 1;
        match &outcome {
            ItemOutcome::Downloaded { path, bytes } => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("")
                    .to_string();
                pb.set_message(name);
                tracing::debug!(
                    size_bytes = bytes,
                    "Downloaded {}/{}: {}",
                    done,
                    total,
                    path.display()
                );
            }
            ItemOutcome::Skipped(SkipReason::DryRun(path)) => {
                pb.suspend(|| tracing::info!("[DRY RUN] Would download {}", path.display()));
            }
            ItemOutcome::Failed { path, error } => {
                let target = path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| format!("item #{index}"));
                pb.suspend(|| tracing::error!("Download failed: {}: {}", target, error));
            }
            ItemOutcome::Skipped(_) => {}
        }
        outcomes[index] = Some(outcome);
        pb.inc(1);
    }
    drop(results);
    pb.finish_and_clear();

    let outcomes: Vec<ItemOutcome> = outcomes
        .into_iter()
        .map(|o| o.unwrap_or(ItemOutcome::Skipped(SkipReason::Cancelled)))
        .collect();
    let report = DownloadReport {
        outcomes,
        elapsed: started.elapsed(),
    };
    log_summary(&report, options.dry_run);
    report
}

fn log_summary(report: &DownloadReport, dry_run: bool) {
    if dry_run {
        tracing::info!("── Dry Run Summary ──");
    } else {
        tracing::info!("── Summary ──");
    }
    tracing::info!(
        "  {} downloaded, {} skipped, {} failed, {} total",
        report.downloaded(),
        report.skipped(),
        report.failed(),
        report.outcomes.len()
    );
    if report.failed() > 0 {
        let remote = report.failures().filter(|(_, _, e)| e.is_remote()).count();
        tracing::info!(
            "  failures: {} remote (HTTP/network), {} local",
            remote,
            report.failed() - remote
        );
    }
    if report.was_cancelled() {
        tracing::info!("  Interrupted by shutdown before all items finished");
    }
    tracing::info!("  elapsed: {}", format_duration(report.elapsed));
}

async fn download_one(
    transport: &dyn Transport,
    index: usize,
    record: &AssetRecord,
    root: &Path,
    options: &DownloadOptions,
    shutdown: &CancellationToken,
) -> ItemOutcome {
    let Some(source) = record.source.as_deref() else {
        return ItemOutcome::Skipped(SkipReason::NoSource);
    };

    let plan = match DownloadPlan::new(root, record.album_name(), source) {
        Ok(plan) => plan,
        Err(error) => return ItemOutcome::Failed { path: None, error },
    };

    if options.dry_run {
        return ItemOutcome::Skipped(SkipReason::DryRun(plan.file_path));
    }

    let part_path = paths::temp_download_path(&plan.file_path, index);
    let fetched = tokio::select! {
        result = fetch_to_disk(transport, source, &plan, &part_path) => result,
        () = shutdown.cancelled() => {
            let _ = tokio::fs::remove_file(&part_path).await;
            tracing::debug!(path = %plan.file_path.display(), "download abandoned on shutdown");
            return ItemOutcome::Skipped(SkipReason::Cancelled);
        }
    };
    let bytes = match fetched {
        Ok(bytes) => bytes,
        Err(error) => {
            return ItemOutcome::Failed {
                path: Some(plan.file_path),
                error,
            }
        }
    };

    if options.set_mtime {
        if let Some(created) = record.created() {
            let mtime_path = plan.file_path.clone();
            let ts = created.timestamp();
            match tokio::task::spawn_blocking(move || file::set_file_mtime(&mtime_path, ts)).await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    "Could not set mtime on {}: {}",
                    plan.file_path.display(),
                    e
                ),
                Err(e) => tracing::warn!("mtime task panicked: {}", e),
            }
        }
    }

    ItemOutcome::Downloaded {
        path: plan.file_path,
        bytes,
    }
}

/// Create the folder, GET the source and stream the body to disk. Returns
/// bytes written.
async fn fetch_to_disk(
    transport: &dyn Transport,
    source: &str,
    plan: &DownloadPlan,
    part_path: &Path,
) -> Result<u64, DownloadError> {
    tokio::fs::create_dir_all(&plan.directory)
        .await
        .map_err(|source| DownloadError::CreateDir {
            path: plan.directory.clone(),
            source,
        })?;

    tracing::debug!(path = %plan.file_path.display(), "downloading");
    let response = transport.get_stream(source).await?;
    if !response.is_ok() {
        return Err(DownloadError::HttpStatus {
            status: response.status,
            url: source.to_string(),
        });
    }

    file::stream_to_file(&plan.file_path, part_path, source, response.body).await
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
