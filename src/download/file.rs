use std::fs::FileTimes;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::StreamExt;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;
use super::paths::is_part_file;
use crate::graph::transport::ByteStream;

/// Stream `body` into `part_path`, then rename it over `dest`.
///
/// The destination only ever holds a complete file. On any failure, an
/// empty body included, the scratch file is removed and `dest` is left
/// as it was. Returns the number of bytes written.
pub async fn stream_to_file(
    dest: &Path,
    part_path: &Path,
    url: &str,
    body: ByteStream,
) -> Result<u64, DownloadError> {
    let result = write_then_rename(dest, part_path, url, body).await;
    if result.is_err() {
        let _ = fs::remove_file(part_path).await;
    }
    result
}

async fn write_then_rename(
    dest: &Path,
    part_path: &Path,
    url: &str,
    mut body: ByteStream,
) -> Result<u64, DownloadError> {
    let write_err = |source: std::io::Error| DownloadError::Write {
        path: dest.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part_path)
        .await
        .map_err(write_err)?;

    let mut bytes_written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(write_err)?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await.map_err(write_err)?;
    drop(file);

    if bytes_written == 0 {
        return Err(DownloadError::EmptyBody {
            url: url.to_string(),
        });
    }

    fs::rename(part_path, dest).await.map_err(write_err)?;
    Ok(bytes_written)
}

/// Remove scratch files left in `dir` by an interrupted run. Returns how
/// many were deleted. A missing directory has nothing to clean.
pub async fn remove_stale_parts(dir: &Path) -> usize {
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return 0;
    };
    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_part_file(name) {
            continue;
        }
        match fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Could not remove {}: {}", entry.path().display(), e),
        }
    }
    removed
}

/// Set the modification and access times of a file to the given Unix
/// timestamp. Timestamps before 1970 are clamped to the epoch where the
/// platform cannot represent them.
pub fn set_file_mtime(path: &Path, timestamp: i64) -> std::io::Result<()> {
    let time = if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(timestamp.unsigned_abs()))
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };
    let times = FileTimes::new().set_modified(time).set_accessed(time);
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_times(times)?;
    Ok(())
}
