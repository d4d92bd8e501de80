use std::path::{Path, PathBuf};

use url::Url;

use super::error::DownloadError;

/// Where one asset lands on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub directory: PathBuf,
    pub file_path: PathBuf,
}

impl DownloadPlan {
    /// `root[/album]/<last segment of source>`.
    pub fn new(root: &Path, album_name: Option<&str>, source: &str) -> Result<Self, DownloadError> {
        let directory = album_directory(root, album_name);
        let filename = source_filename(source)?;
        let file_path = directory.join(filename);
        Ok(Self {
            directory,
            file_path,
        })
    }
}

/// Destination folder for an album. Names that would not form a single
/// plain path component fall back to the root.
pub fn album_directory(root: &Path, album_name: Option<&str>) -> PathBuf {
    let cleaned = album_name.map(|n| clean_filename(n.trim()));
    match cleaned.as_deref() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => root.join(name),
        _ => root.to_path_buf(),
    }
}

/// Final non-empty path segment of the source URL, query excluded.
pub fn source_filename(source: &str) -> Result<String, DownloadError> {
    let url = Url::parse(source).map_err(|e| DownloadError::InvalidSource {
        url: source.to_string(),
        reason: e.to_string(),
    })?;
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(clean_filename)
        .filter(|name| !name.is_empty() && name != "." && name != "..");
    segment.ok_or_else(|| DownloadError::NoFilename(source.to_string()))
}

/// Remove characters that are invalid on common filesystems:
/// `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`.
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect()
}

/// Per-item scratch file next to the destination. The index keeps two
/// in-flight items with the same name from sharing a scratch file.
pub(crate) fn temp_download_path(file_path: &Path, index: usize) -> PathBuf {
    let name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    let dir = file_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!(".{name}.{index}.part"))
}

/// Whether `name` has the shape produced by [`temp_download_path`].
pub(crate) fn is_part_file(name: &str) -> bool {
    let Some(inner) = name
        .strip_prefix('.')
        .and_then(|n| n.strip_suffix(".part"))
    else {
        return false;
    };
    match inner.rsplit_once('.') {
        Some((stem, index)) => {
            !stem.is_empty() && !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
