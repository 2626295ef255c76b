mod common;

use kinoscope_core::{
    ArtifactDownloader, ArtifactFormat, ArtifactKind, ClientError, DownloadRequest,
    RequestOptions,
};
use reqwest::StatusCode;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use common::{client_at, client_for, unreachable_base_url};

#[tokio::test]
async fn disposition_filename_names_the_saved_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/transcript/docx/demo"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/vnd.openxmlformats-officedocument.wordprocessingml.document")
                .insert_header("content-disposition", r#"attachment; filename="demo transcript.docx""#)
                .set_body_bytes(b"PK\x03\x04docx".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let downloader = ArtifactDownloader::new(client_for(&server));
    let dir = tempfile::tempdir().unwrap();

    let saved = downloader
        .download(
            "demo",
            DownloadRequest::Artifact {
                kind: ArtifactKind::Transcript,
                format: ArtifactFormat::Docx,
            },
            RequestOptions::default(),
            dir.path(),
        )
        .await
        .unwrap();

    assert_eq!(saved.path, dir.path().join("demo transcript.docx"));
    assert_eq!(std::fs::read(&saved.path).unwrap(), b"PK\x03\x04docx");
}

#[tokio::test]
async fn missing_disposition_synthesizes_the_filename() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/analysis/pdf/demo"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.7".to_vec()),
        )
        .mount(&server)
        .await;

    let downloader = ArtifactDownloader::new(client_for(&server));
    let artifact = downloader
        .fetch_artifact("demo", ArtifactKind::Analysis, ArtifactFormat::Pdf)
        .await
        .unwrap();

    assert_eq!(artifact.filename, "demo_analysis.pdf");
    assert_eq!(artifact.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(&artifact.bytes[..], b"%PDF-1.7");
}

#[tokio::test]
async fn binary_error_body_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/analysis/txt/demo"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(br#"{"error":"quota exceeded"}"#.to_vec()),
        )
        .mount(&server)
        .await;

    let downloader = ArtifactDownloader::new(client_for(&server));
    let err = downloader
        .fetch_artifact("demo", ArtifactKind::Analysis, ArtifactFormat::Txt)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "quota exceeded");
    assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn opaque_error_body_uses_the_download_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/analysis/docx/demo"))
        .respond_with(ResponseTemplate::new(500).set_body_bytes(vec![0xde, 0xad, 0xbe, 0xef, 0xff]))
        .mount(&server)
        .await;

    let downloader = ArtifactDownloader::new(client_for(&server));
    let dir = tempfile::tempdir().unwrap();
    let err = downloader
        .download(
            "demo",
            DownloadRequest::Artifact {
                kind: ArtifactKind::Analysis,
                format: ArtifactFormat::Docx,
            },
            RequestOptions::default(),
            dir.path(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::UndecodableServer { .. }));
    assert_eq!(err.to_string(), "Error downloading file. Please try again.");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn highlight_download_uses_its_own_path_and_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/highlights/demo"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(b"\x00\x00\x00\x18ftypmp42".to_vec()),
        )
        .mount(&server)
        .await;

    let downloader = ArtifactDownloader::new(client_for(&server));
    let artifact = downloader.fetch_highlight("demo").await.unwrap();

    assert_eq!(artifact.filename, "demo_highlights.mp4");
    assert_eq!(artifact.request, DownloadRequest::Highlight);
}

#[tokio::test]
async fn highlight_failure_uses_the_highlight_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/highlights/demo"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let downloader = ArtifactDownloader::new(client_for(&server));
    let err = downloader.fetch_highlight("demo").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error downloading highlights. Please try again."
    );
}

#[tokio::test]
async fn highlight_json_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/highlights/demo"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_bytes(br#"{"error":"Highlights were not requested"}"#.to_vec()),
        )
        .mount(&server)
        .await;

    let downloader = ArtifactDownloader::new(client_for(&server));
    let err = downloader.fetch_highlight("demo").await.unwrap_err();

    assert_eq!(err.to_string(), "Highlights were not requested");
}

#[tokio::test]
async fn unreachable_server_is_reported_as_no_response() {
    let downloader = ArtifactDownloader::new(client_at(&unreachable_base_url().await));
    let err = downloader.fetch_highlight("demo").await.unwrap_err();

    assert!(matches!(err, ClientError::NoResponse { .. }));
    assert_eq!(
        err.to_string(),
        "No response from server. Please check if the server is running."
    );
}

#[tokio::test]
async fn filename_is_a_single_encoded_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/transcript/txt/team%20sync.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("transcript"))
        .expect(1)
        .mount(&server)
        .await;

    let downloader = ArtifactDownloader::new(client_for(&server));
    let artifact = downloader
        .fetch_artifact("team sync.mp4", ArtifactKind::Transcript, ArtifactFormat::Txt)
        .await
        .unwrap();

    assert_eq!(artifact.filename, "team sync.mp4_transcript.txt");
}
