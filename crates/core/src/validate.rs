use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

use crate::error::{ClientError, Result};

/// 500 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

pub const ALLOWED_MEDIA_TYPES: [&str; 4] = [
    "video/mp4",
    "video/avi",
    "video/quicktime",
    "video/x-matroska",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Please upload a valid video file (MP4, AVI, MOV, or MKV)")]
    UnsupportedType { media_type: String },

    #[error("File size must be less than 500MB")]
    TooLarge { size: u64 },
}

/// A file the user picked, described only by its metadata until it is uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub media_type: String,
}

impl CandidateFile {
    /// Reads the size from disk and declares a media type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)
            .await
            .map_err(|source| ClientError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            media_type: media_type_for(path).to_string(),
        })
    }
}

/// Media type a browser would declare for the file's extension.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "avi" => "video/avi",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Only the first file of a multi-file selection is considered.
pub fn first_candidate<T>(files: impl IntoIterator<Item = T>) -> Option<T> {
    let mut files = files.into_iter();
    let first = files.next()?;
    let ignored = files.count();
    if ignored > 0 {
        tracing::debug!(ignored, "ignoring extra selected files");
    }
    Some(first)
}

/// Type check first, then size. No I/O.
pub fn validate(file: &CandidateFile) -> std::result::Result<(), Rejection> {
    if !ALLOWED_MEDIA_TYPES.contains(&file.media_type.as_str()) {
        return Err(Rejection::UnsupportedType {
            media_type: file.media_type.clone(),
        });
    }

    if file.size > MAX_UPLOAD_BYTES {
        return Err(Rejection::TooLarge { size: file.size });
    }

    Ok(())
}
