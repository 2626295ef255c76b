use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::LazyLock,
};

use bytes::Bytes;
use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};
use tempfile::NamedTempFile;

use crate::{
    classify::{Failure, classify},
    error::{ClientError, Operation, Result},
    transport::{ApiClient, RequestOptions},
    types::{ArtifactFormat, ArtifactKind, DownloadRequest},
};

static DISPOSITION_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename="([^"]+)""#).expect("disposition pattern is valid"));

/// A downloaded artifact held in memory, not yet saved.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub request: DownloadRequest,
    /// Disposition filename if the server sent one, otherwise a synthesized name.
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedArtifact {
    pub request: DownloadRequest,
    pub path: PathBuf,
    pub size: u64,
}

impl Artifact {
    /// Writes into a temporary file next to the target and moves it into place
    /// without replacing an existing file: `name.pdf` becomes `name (1).pdf` and so
    /// on. The temporary file never outlives this call.
    pub async fn save_to(&self, dir: &Path) -> Result<SavedArtifact> {
        let dir = dir.to_path_buf();
        let filename = self.filename.clone();
        let bytes = self.bytes.clone();
        let wanted = dir.join(&self.filename);

        let target = tokio::task::spawn_blocking(move || write_atomically(&dir, &filename, &bytes))
            .await
            .map_err(io::Error::other)
            .and_then(|result| result)
            .map_err(|source| ClientError::SaveFile {
                path: wanted,
                source,
            })?;

        tracing::info!(path = %target.display(), size = self.bytes.len(), "artifact saved");
        Ok(SavedArtifact {
            request: self.request,
            path: target,
            size: self.bytes.len() as u64,
        })
    }
}

const MAX_NAME_ATTEMPTS: usize = 1000;

fn write_atomically(dir: &Path, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let target = dir.join(numbered_name(filename, attempt));
        match temp.persist_noclobber(&target) {
            Ok(_) => return Ok(target),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => temp = e.file,
            Err(e) => return Err(e.error),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {} in {}", filename, dir.display()),
    ))
}

/// `report.pdf`, `report (1).pdf`, `report (2).pdf`, ...
fn numbered_name(filename: &str, attempt: usize) -> String {
    if attempt == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, attempt, ext),
        _ => format!("{} ({})", filename, attempt),
    }
}

/// Filename suggested by a `Content-Disposition` value, reduced to its last path
/// component so it cannot point outside the download directory.
pub fn disposition_filename(value: &str) -> Option<String> {
    let captured = DISPOSITION_FILENAME.captures(value)?.get(1)?.as_str();
    Path::new(captured)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

pub fn resolve_filename(headers: &HeaderMap, request: DownloadRequest, filename: &str) -> String {
    headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(disposition_filename)
        .unwrap_or_else(|| request.fallback_filename(filename))
}

/// Fetches artifacts of a completed analysis. Stateless: every call is a single
/// attempt that neither reads nor touches the upload session.
#[derive(Clone, Debug)]
pub struct ArtifactDownloader {
    client: ApiClient,
}

impl ArtifactDownloader {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn fetch_artifact(
        &self,
        filename: &str,
        kind: ArtifactKind,
        format: ArtifactFormat,
    ) -> Result<Artifact> {
        self.fetch(
            filename,
            DownloadRequest::Artifact { kind, format },
            self.client.default_request(),
        )
        .await
    }

    pub async fn fetch_highlight(&self, filename: &str) -> Result<Artifact> {
        self.fetch(
            filename,
            DownloadRequest::Highlight,
            self.client.default_request(),
        )
        .await
    }

    pub async fn fetch(
        &self,
        filename: &str,
        request: DownloadRequest,
        options: RequestOptions,
    ) -> Result<Artifact> {
        tracing::info!(filename, %request, "downloading artifact");
        self.try_fetch(filename, request, options)
            .await
            .map_err(|failure| classify(failure, Operation::from(request)))
    }

    /// Fetch, then save into `dir`.
    pub async fn download(
        &self,
        filename: &str,
        request: DownloadRequest,
        options: RequestOptions,
        dir: &Path,
    ) -> Result<SavedArtifact> {
        self.fetch(filename, request, options)
            .await?
            .save_to(dir)
            .await
    }

    async fn try_fetch(
        &self,
        filename: &str,
        request: DownloadRequest,
        options: RequestOptions,
    ) -> std::result::Result<Artifact, Failure> {
        let url = match request {
            DownloadRequest::Artifact { kind, format } => {
                self.client
                    .endpoint(["download", kind.as_str(), format.as_str(), filename])?
            }
            DownloadRequest::Highlight => self.client.endpoint(["highlights", filename])?,
        };

        let response = self.client.send(self.client.get(url), options).await?;

        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        Ok(Artifact {
            request,
            filename: resolve_filename(&headers, request, filename),
            content_type: headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            bytes,
        })
    }
}
