//! Input resolution: turn the `--pdf_path` argument into a local PDF file.
//!
//! Local paths are checked for existence, readability and the `%PDF` magic
//! bytes. HTTP(S) URLs are downloaded into a [`TempDir`] that lives as long as
//! the [`ResolvedInput`], since pdfium can only open files from disk.

use crate::error::CheckError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The resolved input — either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in `_temp_dir` until this is dropped.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Path to the PDF on disk.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// Directory next to which the default feedback directory is created.
    ///
    /// For a download this is the working directory, not the temp dir.
    pub fn anchor_dir(&self) -> PathBuf {
        match self {
            ResolvedInput::Local(p) => match p.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
            ResolvedInput::Downloaded { .. } => PathBuf::from("."),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the `--pdf_path` argument to a local PDF file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, CheckError> {
    if input.trim().is_empty() {
        return Err(CheckError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, CheckError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(CheckError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(f) => check_magic(&path, f)?,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(CheckError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(CheckError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Require the `%PDF` magic at the start of `reader`.
///
/// A file shorter than the magic is rejected the same way as a wrong one.
fn check_magic(path: &Path, reader: impl Read) -> Result<(), CheckError> {
    let mut head = Vec::with_capacity(4);
    reader
        .take(4)
        .read_to_end(&mut head)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => CheckError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => CheckError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
        })?;

    let mut magic = [0u8; 4];
    magic[..head.len()].copy_from_slice(&head);
    if &magic != b"%PDF" {
        return Err(CheckError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, CheckError> {
    info!("Downloading PDF from: {}", url);

    let download_failed = |reason: String| CheckError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CheckError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| CheckError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url));

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(CheckError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| CheckError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL, so the feedback directory keeps a useful name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return if last.to_ascii_lowercase().ends_with(".pdf") {
                        last.to_string()
                    } else {
                        format!("{last}.pdf")
                    };
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
