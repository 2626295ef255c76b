use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::lenient;

/// Which artifacts the server should produce for one upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    pub transcription: bool,
    pub summary: bool,
    pub highlight: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            transcription: true,
            summary: true,
            highlight: false,
        }
    }
}

impl UploadOptions {
    /// Form fields as the server expects them: literal `"true"` / `"false"` strings.
    pub fn form_fields(&self) -> [(&'static str, String); 3] {
        [
            ("transcription", self.transcription.to_string()),
            ("summary", self.summary.to_string()),
            ("highlight", self.highlight.to_string()),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Analysis,
    Transcript,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Analysis => "analysis",
            ArtifactKind::Transcript => "transcript",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactFormat {
    Txt,
    Docx,
    Pdf,
}

impl ArtifactFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFormat::Txt => "txt",
            ArtifactFormat::Docx => "docx",
            ArtifactFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {what} `{value}` (expected one of: {expected})")]
pub struct ParseArtifactError {
    what: &'static str,
    value: String,
    expected: &'static str,
}

impl FromStr for ArtifactKind {
    type Err = ParseArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "analysis" => Ok(ArtifactKind::Analysis),
            "transcript" => Ok(ArtifactKind::Transcript),
            _ => Err(ParseArtifactError {
                what: "artifact kind",
                value: s.to_string(),
                expected: "analysis, transcript",
            }),
        }
    }
}

impl FromStr for ArtifactFormat {
    type Err = ParseArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" => Ok(ArtifactFormat::Txt),
            "docx" => Ok(ArtifactFormat::Docx),
            "pdf" => Ok(ArtifactFormat::Pdf),
            _ => Err(ParseArtifactError {
                what: "artifact format",
                value: s.to_string(),
                expected: "txt, docx, pdf",
            }),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-shot request for a derived artifact of a completed analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DownloadRequest {
    Artifact {
        kind: ArtifactKind,
        format: ArtifactFormat,
    },
    Highlight,
}

impl DownloadRequest {
    /// Name used when the server does not suggest one.
    pub fn fallback_filename(&self, filename: &str) -> String {
        match self {
            DownloadRequest::Artifact { kind, format } => {
                format!("{}_{}.{}", filename, kind, format)
            }
            DownloadRequest::Highlight => format!("{}_highlights.mp4", filename),
        }
    }
}

impl fmt::Display for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadRequest::Artifact { kind, format } => write!(f, "{} ({})", kind, format),
            DownloadRequest::Highlight => f.write_str("highlights video"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Structured summary. Sections the server left out, nulled, or mistyped read as empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summaries {
    #[serde(default, deserialize_with = "lenient::value")]
    pub paragraph_summary: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub bullet_points: Vec<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub key_points: Vec<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub decisions: Vec<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub action_items: Vec<String>,
}

/// A caption line; `timestamp` is whatever label the server produced (e.g. `00:01:12`
/// or a number of seconds).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimestampEntry {
    #[serde(default, deserialize_with = "lenient::label")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient::value")]
    pub text: String,
}

/// Normalized, immutable result of one successful upload.
///
/// A missing transcript means the video had no usable audio, so the summary and
/// caption accessors report nothing even when the server sent them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    filename: String,
    duration: f64,
    fps: f64,
    resolution: Resolution,
    transcript: Option<String>,
    transcript_file: Option<String>,
    analysis_file: Option<String>,
    highlight_file: Option<String>,
    summaries: Option<Summaries>,
    timestamps: Option<Vec<TimestampEntry>>,
}

/// Builder-style parts for [`AnalysisRecord::new`].
#[derive(Clone, Debug, Default)]
pub struct RecordFiles {
    pub transcript_file: Option<String>,
    pub analysis_file: Option<String>,
    pub highlight_file: Option<String>,
}

impl AnalysisRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        filename: String,
        duration: f64,
        fps: f64,
        resolution: Resolution,
        transcript: Option<String>,
        files: RecordFiles,
        summaries: Option<Summaries>,
        timestamps: Option<Vec<TimestampEntry>>,
    ) -> Self {
        Self {
            filename,
            duration,
            fps,
            resolution,
            transcript,
            transcript_file: files.transcript_file,
            analysis_file: files.analysis_file,
            highlight_file: files.highlight_file,
            summaries,
            timestamps,
        }
    }

    /// Identifier the server expects in every download path. Empty when the server
    /// didn't name the file, in which case nothing can be downloaded.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref().filter(|t| !t.is_empty())
    }

    pub fn transcript_file(&self) -> Option<&str> {
        self.transcript_file.as_deref()
    }

    pub fn analysis_file(&self) -> Option<&str> {
        self.analysis_file.as_deref()
    }

    pub fn highlight_file(&self) -> Option<&str> {
        self.highlight_file.as_deref()
    }

    pub fn summaries(&self) -> Option<&Summaries> {
        self.transcript()?;
        self.summaries.as_ref()
    }

    pub fn timestamps(&self) -> Option<&[TimestampEntry]> {
        self.transcript()?;
        self.timestamps.as_deref()
    }

    /// Downloads worth offering for this record; none without a transcript or filename.
    pub fn available_downloads(&self) -> Vec<DownloadRequest> {
        if self.transcript().is_none() || self.filename.is_empty() {
            return Vec::new();
        }

        use ArtifactFormat::*;
        use ArtifactKind::*;
        vec![
            DownloadRequest::Artifact { kind: Analysis, format: Txt },
            DownloadRequest::Artifact { kind: Analysis, format: Docx },
            DownloadRequest::Artifact { kind: Analysis, format: Pdf },
            DownloadRequest::Artifact { kind: Transcript, format: Txt },
            DownloadRequest::Artifact { kind: Transcript, format: Docx },
            DownloadRequest::Highlight,
        ]
    }
}
