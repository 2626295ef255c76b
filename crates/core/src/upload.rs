use std::sync::{Arc, Mutex};

use reqwest::{
    Body,
    multipart::{Form, Part},
};
use serde::Deserialize;
use tokio::{fs::File, sync::watch};

use crate::{
    classify::{Failure, classify},
    lenient,
    error::{ClientError, Operation, Result},
    transport::{ApiClient, RequestOptions},
    types::{AnalysisRecord, RecordFiles, Resolution, Summaries, TimestampEntry, UploadOptions},
    validate::{CandidateFile, validate},
};

const INVALID_FORMAT: &str = "Invalid response format from server";
const INVALID_METADATA: &str = "Invalid video metadata in response";

#[derive(Clone, Debug, Default, PartialEq)]
pub enum UploadState {
    #[default]
    Idle,
    InFlight,
    Failed(String),
    Succeeded(Arc<AnalysisRecord>),
}

impl UploadState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, UploadState::InFlight)
    }
}

/// Owns the lifecycle of submissions, one at a time.
///
/// A `submit` while another is in flight is rejected with
/// [`ClientError::UploadInFlight`]; the running upload is not disturbed.
pub struct UploadSession {
    client: ApiClient,
    state: watch::Sender<UploadState>,
    latest: Mutex<Option<Arc<AnalysisRecord>>>,
}

impl UploadSession {
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(UploadState::Idle);
        Self {
            client,
            state,
            latest: Mutex::new(None),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    /// Observe state transitions while a submit is running.
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    /// Record of the last successful upload, kept across later failures.
    pub fn latest_record(&self) -> Option<Arc<AnalysisRecord>> {
        self.latest.lock().expect("upload session poisoned").clone()
    }

    pub async fn submit(
        &self,
        file: &CandidateFile,
        options: UploadOptions,
    ) -> Result<Arc<AnalysisRecord>> {
        self.submit_with(file, options, self.client.default_request())
            .await
    }

    pub async fn submit_with(
        &self,
        file: &CandidateFile,
        options: UploadOptions,
        request: RequestOptions,
    ) -> Result<Arc<AnalysisRecord>> {
        if self.state.borrow().is_in_flight() {
            return Err(ClientError::UploadInFlight);
        }

        if let Err(rejection) = validate(file) {
            if !publish_unless_in_flight(&self.state, UploadState::Failed(rejection.to_string())) {
                return Err(ClientError::UploadInFlight);
            }
            return Err(rejection.into());
        }

        let Some(guard) = InFlightGuard::enter(&self.state) else {
            return Err(ClientError::UploadInFlight);
        };

        tracing::info!(file = %file.name, size = file.size, ?options, "uploading video");
        let outcome = self
            .perform(file, options, request)
            .await
            .map_err(|failure| classify(failure, Operation::Upload));

        match &outcome {
            Ok(record) => {
                tracing::info!(filename = record.filename(), "analysis received");
                *self.latest.lock().expect("upload session poisoned") = Some(Arc::clone(record));
                guard.finish(UploadState::Succeeded(Arc::clone(record)));
            }
            Err(err) => guard.finish(UploadState::Failed(err.to_string())),
        }

        outcome
    }

    async fn perform(
        &self,
        file: &CandidateFile,
        options: UploadOptions,
        request: RequestOptions,
    ) -> std::result::Result<Arc<AnalysisRecord>, Failure> {
        let url = self.client.endpoint(["upload"])?;
        let form = build_form(file, options).await?;

        let response = self
            .client
            .send(self.client.post(url).multipart(form), request)
            .await?;
        let body = response.bytes().await?;

        parse_upload_response(&body).map(Arc::new)
    }
}

async fn build_form(
    file: &CandidateFile,
    options: UploadOptions,
) -> std::result::Result<Form, Failure> {
    let handle = File::open(&file.path)
        .await
        .map_err(|e| Failure::Setup(format!("Failed to read {}: {}", file.path.display(), e)))?;

    let video = Part::stream_with_length(Body::from(handle), file.size)
        .file_name(file.name.clone())
        .mime_str(&file.media_type)
        .map_err(|e| Failure::Setup(e.to_string()))?;

    let form = options
        .form_fields()
        .into_iter()
        .fold(Form::new().part("video", video), |form, (name, value)| {
            form.text(name, value)
        });

    Ok(form)
}

#[derive(Deserialize)]
struct UploadResponse {
    summary: Option<SummaryPayload>,
}

#[derive(Deserialize)]
struct SummaryPayload {
    #[serde(default, deserialize_with = "lenient::value")]
    filename: Option<String>,
    #[serde(default, deserialize_with = "lenient::value")]
    duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient::value")]
    fps: Option<f64>,
    #[serde(default, deserialize_with = "lenient::value")]
    resolution: Option<[f64; 2]>,
    #[serde(default, deserialize_with = "lenient::value")]
    transcript: Option<String>,
    #[serde(default, deserialize_with = "lenient::value")]
    transcript_file: Option<String>,
    #[serde(default, deserialize_with = "lenient::value")]
    analysis_file: Option<String>,
    #[serde(default, deserialize_with = "lenient::value")]
    highlight_file: Option<String>,
    #[serde(default, deserialize_with = "lenient::value")]
    summaries: Option<Summaries>,
    #[serde(default, deserialize_with = "lenient::entries")]
    timestamps: Option<Vec<TimestampEntry>>,
}

/// Zero and NaN count as missing.
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

/// A 2xx status alone is not a result: the summary, its duration and fps must be there.
/// Every other field is optional and read leniently.
fn parse_upload_response(body: &[u8]) -> std::result::Result<AnalysisRecord, Failure> {
    let response: UploadResponse = serde_json::from_slice(body)
        .map_err(|_| Failure::Malformed(INVALID_FORMAT.to_string()))?;
    let summary = response
        .summary
        .ok_or_else(|| Failure::Malformed(INVALID_FORMAT.to_string()))?;

    let (Some(duration), Some(fps)) = (present(summary.duration), present(summary.fps)) else {
        return Err(Failure::Malformed(INVALID_METADATA.to_string()));
    };
    let filename = summary.filename.unwrap_or_default();
    if filename.is_empty() {
        tracing::warn!("analysis reply has no filename; downloads are unavailable");
    }

    let resolution = summary
        .resolution
        .map(|[width, height]| Resolution {
            width: width as u32,
            height: height as u32,
        })
        .unwrap_or(Resolution {
            width: 0,
            height: 0,
        });

    Ok(AnalysisRecord::new(
        filename,
        duration,
        fps,
        resolution,
        summary.transcript,
        RecordFiles {
            transcript_file: summary.transcript_file,
            analysis_file: summary.analysis_file,
            highlight_file: summary.highlight_file,
        },
        summary.summaries,
        summary.timestamps,
    ))
}

/// Replaces the state unless an upload holds it. Returns whether it was replaced.
fn publish_unless_in_flight(state: &watch::Sender<UploadState>, next: UploadState) -> bool {
    state.send_if_modified(|current| {
        if current.is_in_flight() {
            return false;
        }
        *current = next;
        true
    })
}

/// Holds the `InFlight` state; whatever happens to the submit future, it is cleared.
struct InFlightGuard<'a> {
    state: &'a watch::Sender<UploadState>,
    finished: bool,
}

impl<'a> InFlightGuard<'a> {
    fn enter(state: &'a watch::Sender<UploadState>) -> Option<Self> {
        publish_unless_in_flight(state, UploadState::InFlight).then(|| Self {
            state,
            finished: false,
        })
    }

    fn finish(mut self, next: UploadState) {
        self.finished = true;
        self.state.send_replace(next);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("upload abandoned before completion");
            self.state.send_replace(UploadState::Idle);
        }
    }
}
