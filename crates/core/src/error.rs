use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::{
    config::ConfigError,
    types::{ArtifactFormat, ArtifactKind, DownloadRequest},
    validate::Rejection,
};

/// The network operation an error belongs to. Each has its own generic fallback text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Artifact {
        kind: ArtifactKind,
        format: ArtifactFormat,
    },
    Highlight,
}

impl Operation {
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Operation::Upload => "Error uploading video. Please try again.",
            Operation::Artifact { .. } => "Error downloading file. Please try again.",
            Operation::Highlight => "Error downloading highlights. Please try again.",
        }
    }
}

impl From<DownloadRequest> for Operation {
    fn from(request: DownloadRequest) -> Self {
        match request {
            DownloadRequest::Artifact { kind, format } => Operation::Artifact { kind, format },
            DownloadRequest::Highlight => Operation::Highlight,
        }
    }
}

/// Every way an upload or download can end badly. `Display` is the user-facing message.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Rejected(#[from] Rejection),

    #[error("An upload is already in progress. Wait for it to finish.")]
    UploadInFlight,

    #[error("{reason}")]
    MalformedResponse { reason: String },

    #[error("{message}")]
    Server { status: StatusCode, message: String },

    #[error("{fallback}")]
    UndecodableServer {
        status: StatusCode,
        fallback: &'static str,
    },

    #[error("No response from server. Please check if the server is running.")]
    NoResponse {
        #[source]
        source: reqwest::Error,
    },

    #[error(
        "The server did not finish responding within the configured timeout. The analysis may still be running."
    )]
    TimedOut {
        #[source]
        source: reqwest::Error,
    },

    #[error("{message}")]
    RequestSetup { message: String },

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save {path}: {source}")]
    SaveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Status code for errors that carried a server response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Server { status, .. } | ClientError::UndecodableServer { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
