//! fbbackup-rs — back up a Facebook account's photos and videos.
//!
//! Walks the Graph API's cursor-paginated photo and video edges for the
//! token's user and mirrors every asset to disk, one folder per category and
//! one subfolder per album. A failed download never stops the batch; a
//! failed fetch stops only its own category.

#![warn(clippy::all)]

mod cli;
mod config;
mod download;
mod graph;
mod shutdown;
mod types;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::Config;
use download::DownloadOptions;
use graph::{AssetRecord, GraphClient, GraphError, HttpTransport};
use types::Category;

/// Totals across all categories of one run.
#[derive(Debug, Default)]
struct RunTotals {
    fetch_failures: usize,
    downloaded: usize,
    download_failures: usize,
}

async fn fetch_category(
    client: &GraphClient,
    category: Category,
) -> Result<Vec<AssetRecord>, GraphError> {
    match category {
        Category::MyPhotos => client.user_photos().await,
        Category::PhotosOfMe => client.user_tagged_photos().await,
        Category::MyVideos => client.user_videos().await,
        Category::VideosOfMe => client.user_tagged_videos().await,
    }
}

/// Fetch one category and download it into its folder.
///
/// Only an auth failure is returned as an error: every later category would
/// fail the same way. Anything else is logged and counted.
async fn backup_category(
    client: &GraphClient,
    category: Category,
    config: &Config,
    options: &DownloadOptions,
    shutdown_token: CancellationToken,
    totals: &mut RunTotals,
) -> anyhow::Result<()> {
    tracing::info!("Fetching {}...", category);
    let records = match fetch_category(client, category).await {
        Ok(records) => records,
        Err(e) if e.is_auth_error() => {
            anyhow::bail!("Access token rejected while fetching {}: {}", category, e)
        }
        Err(e) => {
            tracing::error!("No {} retrieved: {}", category.describe(), e);
            totals.fetch_failures += 1;
            return Ok(());
        }
    };

    if records.is_empty() {
        tracing::info!("No {} to download", category.describe());
        return Ok(());
    }

    let report = download::download_all(
        client.transport(),
        &records,
        &config.category_root(category),
        options,
        shutdown_token,
    )
    .await;

    totals.downloaded += report.downloaded();
    totals.download_failures += report.failed();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(cli)?;
    tracing::info!(concurrency = config.threads_num, "Starting fbbackup-rs");
    tracing::debug!(?config, "Configuration");

    let transport = HttpTransport::new(config.timeout, config.proxy.as_ref())?;
    let client = GraphClient::new(Box::new(transport), config.access_token.clone())
        .with_max_pages(config.max_pages);

    match client.user_info().await {
        Ok(me) => tracing::info!(
            "Backing up account {} ({})",
            me.name.as_deref().unwrap_or("<unknown>"),
            me.id.as_deref().unwrap_or("?")
        ),
        Err(e) if e.is_auth_error() => anyhow::bail!("Access token rejected: {}", e),
        Err(e) => tracing::warn!("Could not fetch user info: {}", e),
    }

    let shutdown_token = shutdown::install_signal_handler()?;
    let options = config.download_options();
    let mut totals = RunTotals::default();

    for &category in &config.categories {
        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, skipping remaining categories");
            break;
        }
        backup_category(
            &client,
            category,
            &config,
            &options,
            shutdown_token.clone(),
            &mut totals,
        )
        .await?;
    }

    tracing::info!(
        "Backup finished: {} downloaded, {} failed downloads, {} failed categories",
        totals.downloaded,
        totals.download_failures,
        totals.fetch_failures
    );

    if totals.fetch_failures > 0 || totals.download_failures > 0 {
        anyhow::bail!(
            "{} categories could not be fetched, {} downloads failed",
            totals.fetch_failures,
            totals.download_failures
        );
    }

    Ok(())
}
