//! One routine turns every failed request into a [`ClientError`].
//!
//! Downloads ask for a binary body, so a server error arrives as opaque bytes even
//! though it is JSON. The body is always read as bytes and decoded here, for uploads
//! and downloads alike.

use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{ClientError, Operation};

/// Raw outcome of a request that did not produce a usable success response.
#[derive(Debug)]
pub enum Failure {
    /// Non-2xx reply; `body` is whatever bytes came with it.
    Status { status: StatusCode, body: Bytes },
    /// Sent, but no reply arrived.
    NoResponse(reqwest::Error),
    /// The opt-in request time limit ran out before the reply finished.
    TimedOut(reqwest::Error),
    /// Never sent.
    Setup(String),
    /// 2xx reply that doesn't carry a usable result.
    Malformed(String),
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Failure::Setup(err.to_string())
        } else if err.is_timeout() && !err.is_connect() {
            Failure::TimedOut(err)
        } else {
            Failure::NoResponse(err)
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Extracts the `error` message from a (possibly binary) body.
pub fn decode_error_body(body: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(body).ok()?;
    let payload: ErrorBody = serde_json::from_str(text).ok()?;
    payload.error.filter(|message| !message.is_empty())
}

pub fn classify(failure: Failure, operation: Operation) -> ClientError {
    let error = match failure {
        Failure::Status { status, body } => match decode_error_body(&body) {
            Some(message) => ClientError::Server { status, message },
            None => ClientError::UndecodableServer {
                status,
                fallback: operation.fallback_message(),
            },
        },
        Failure::NoResponse(source) => ClientError::NoResponse { source },
        Failure::TimedOut(source) => ClientError::TimedOut { source },
        Failure::Setup(message) if message.is_empty() => ClientError::RequestSetup {
            message: operation.fallback_message().to_string(),
        },
        Failure::Setup(message) => ClientError::RequestSetup { message },
        Failure::Malformed(reason) => ClientError::MalformedResponse { reason },
    };

    tracing::warn!(?operation, error = %error, "request failed");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArtifactFormat, ArtifactKind};

    const PDF: Operation = Operation::Artifact {
        kind: ArtifactKind::Analysis,
        format: ArtifactFormat::Pdf,
    };

    fn status(body: &'static [u8]) -> Failure {
        Failure::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn binary_json_body_yields_its_message() {
        let err = classify(status(br#"{"error":"quota exceeded"}"#), PDF);
        assert!(matches!(&err, ClientError::Server { message, .. } if message == "quota exceeded"));
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn non_utf8_body_falls_back() {
        let err = classify(status(&[0xff, 0xfe, 0x00, 0x9f]), PDF);
        assert_eq!(err.to_string(), "Error downloading file. Please try again.");
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn unparseable_text_falls_back_per_operation() {
        let err = classify(status(b"<html>Bad Gateway</html>"), Operation::Highlight);
        assert_eq!(
            err.to_string(),
            "Error downloading highlights. Please try again."
        );

        let err = classify(status(b""), Operation::Upload);
        assert_eq!(err.to_string(), "Error uploading video. Please try again.");
    }

    #[test]
    fn json_without_a_usable_error_field_falls_back() {
        let bodies: [&[u8]; 4] = [
            br#"{"detail":"nope"}"#,
            br#"{"error":""}"#,
            br#"{"error":42}"#,
            b"null",
        ];
        for body in bodies {
            let err = classify(
                Failure::Status {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: Bytes::copy_from_slice(body),
                },
                Operation::Upload,
            );
            assert!(matches!(err, ClientError::UndecodableServer { .. }));
        }
    }

    #[test]
    fn setup_errors_keep_their_message() {
        let err = classify(Failure::Setup("bad header".to_string()), PDF);
        assert_eq!(err.to_string(), "bad header");

        let err = classify(Failure::Setup(String::new()), PDF);
        assert_eq!(err.to_string(), PDF.fallback_message());
    }

    #[test]
    fn malformed_success_is_a_failure() {
        let err = classify(
            Failure::Malformed("Invalid video metadata in response".to_string()),
            Operation::Upload,
        );
        assert!(matches!(err, ClientError::MalformedResponse { .. }));
    }
}
