//! Kinoscope Core Library
//!
//! Client side of a remote video-analysis service: validate a video, upload it with
//! the requested options, and fetch the transcript, analysis and highlight reel it
//! produces.

pub mod classify;
pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod format;
mod lenient;
pub mod transport;
pub mod types;
pub mod upload;
pub mod validate;

// Re-export commonly used items at crate root
pub use config::{ClientConfig, ConfigError, Credentials};
pub use download::{Artifact, ArtifactDownloader, SavedArtifact};
pub use error::{ClientError, Operation, Result};
pub use events::{ErrorEvent, ErrorFeed};
pub use format::{format_record_readable, format_timestamp};
pub use transport::{ApiClient, RequestOptions};
pub use types::{
    AnalysisRecord, ArtifactFormat, ArtifactKind, DownloadRequest, Resolution, Summaries,
    TimestampEntry, UploadOptions,
};
pub use upload::{UploadSession, UploadState};
pub use validate::{CandidateFile, Rejection, first_candidate, validate};
