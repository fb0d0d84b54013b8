//! Detection client tests

use super::payload::AnalyzeRequest;
use super::*;
use crate::scanner::types::UnitMeta;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn units(count: usize) -> Vec<ScanUnit> {
    let meta = UnitMeta::new("repo-1", "commit-1", "blob-1", "notes.txt");
    (0..count)
        .map(|i| ScanUnit::new(&meta, format!("note {} for John Smith", i), i * 100).unwrap())
        .collect()
}

fn options(dry_run: bool) -> ClientOptions {
    ClientOptions {
        confidence_threshold: 0.8,
        batch_limit: 5,
        dry_run,
    }
}

fn live_settings(endpoint: &str) -> DetectionSettings {
    DetectionSettings {
        endpoint: Some(endpoint.to_string()),
        api_key: Some("secret-key".to_string()),
        timeout: Duration::from_secs(5),
        ..DetectionSettings::default()
    }
}

fn response_body(units: &[ScanUnit]) -> String {
    serde_json::json!({
        "kind": "PiiEntityRecognitionResults",
        "results": {
            "documents": [
                {
                    "id": units[0].id(),
                    "redactedText": "note 0 for **********",
                    "entities": [
                        {"text": "John Smith", "category": "Person", "offset": 11,
                         "length": 10, "confidenceScore": 0.99},
                        {"text": "note", "category": "Organization", "offset": 0,
                         "length": 4, "confidenceScore": 0.31}
                    ]
                },
                {
                    "id": "not-a-requested-unit",
                    "entities": [
                        {"text": "x", "category": "Person", "offset": 0,
                         "length": 1, "confidenceScore": 1.0}
                    ]
                }
            ],
            "errors": [
                {"id": units[1].id(), "error": {"code": "InvalidDocument", "message": "empty"}}
            ]
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_dry_run_returns_one_empty_result_per_unit() {
    let client = LanguageServiceClient::new(DetectionSettings::default(), options(true)).unwrap();
    let batch = units(5);
    let documents = client.detect(&batch).await.unwrap();

    assert_eq!(documents.len(), 5);
    for (document, unit) in documents.iter().zip(&batch) {
        assert_eq!(document.id, unit.id());
        assert!(document.results.is_empty());
        assert!(document.redacted_text.is_none());
    }
}

#[tokio::test]
async fn test_empty_request_returns_nothing() {
    let client = LanguageServiceClient::new(DetectionSettings::default(), options(true)).unwrap();
    assert!(client.detect(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_batch_is_rejected() {
    let client = LanguageServiceClient::new(DetectionSettings::default(), options(true)).unwrap();
    let err = client.detect(&units(6)).await.unwrap_err();
    assert!(matches!(err, DetectionError::Validation { .. }));
}

#[test]
fn test_missing_credentials_fail_construction() {
    let err = LanguageServiceClient::new(DetectionSettings::default(), options(false)).unwrap_err();
    assert!(matches!(err, DetectionError::Configuration { .. }));

    let mut settings = live_settings("https://example.invalid");
    settings.api_key = Some("  ".to_string());
    assert!(LanguageServiceClient::new(settings, options(false)).is_err());

    let settings = live_settings("ftp://example.invalid");
    assert!(LanguageServiceClient::new(settings, options(false)).is_err());
}

#[test]
fn test_debug_output_hides_api_key() {
    let rendered = format!("{:?}", live_settings("https://example.invalid"));
    assert!(!rendered.contains("secret-key"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn test_analyze_url() {
    let settings = live_settings("https://lang.example.com/");
    assert_eq!(
        settings.analyze_url().unwrap(),
        "https://lang.example.com/language/:analyze-text?api-version=2023-04-01"
    );
}

#[test]
fn test_request_payload_shape() {
    let batch = units(2);
    let settings = live_settings("https://example.invalid");
    let value = serde_json::to_value(AnalyzeRequest::new(&batch, &settings)).unwrap();

    assert_eq!(value["kind"], "PiiEntityRecognition");
    let documents = value["analysisInput"]["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[1]["id"], batch[1].id());
    assert_eq!(documents[1]["language"], "en");
    assert_eq!(documents[1]["text"], batch[1].text());
    assert_eq!(value["parameters"]["modelVersion"], "latest");
    assert_eq!(value["parameters"]["domain"], "phi");
}

#[test]
fn test_parse_response_filters_and_correlates() {
    let batch = units(3);
    let documents =
        client::parse_response(&response_body(&batch), &batch, 0.8, SERVICE_NAME).unwrap();

    // Only the analysed unit comes back; the errored and absent ones are left out
    assert_eq!(documents.len(), 1);
    let first = &documents[0];
    assert_eq!(first.id, batch[0].id());
    assert_eq!(first.results.len(), 1);
    assert_eq!(first.results[0].text, "John Smith");
    assert_eq!(first.results[0].offset, 11);
    assert_eq!(first.results[0].service, SERVICE_NAME);
    assert_eq!(first.redacted_text.as_deref(), Some("note 0 for **********"));

    assert!(documents.iter().all(|d| d.id != batch[1].id() && d.id != batch[2].id()));
}

#[test]
fn test_parse_response_keeps_request_order() {
    let batch = units(3);
    let body = serde_json::json!({
        "results": {"documents": [
            {"id": batch[2].id(), "entities": []},
            {"id": batch[0].id(), "entities": []}
        ]}
    })
    .to_string();
    let documents = client::parse_response(&body, &batch, 0.8, SERVICE_NAME).unwrap();
    let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec![batch[0].id(), batch[2].id()]);
}

#[test]
fn test_document_listed_as_error_is_not_clean() {
    let batch = units(1);
    let body = serde_json::json!({
        "results": {
            "documents": [{"id": batch[0].id(), "entities": []}],
            "errors": [{"id": batch[0].id(), "error": {"code": "InternalServerError", "message": "retry"}}]
        }
    })
    .to_string();
    let documents = client::parse_response(&body, &batch, 0.8, SERVICE_NAME).unwrap();
    assert!(documents.is_empty());
}

#[test]
fn test_threshold_is_inclusive() {
    let batch = units(1);
    let body = serde_json::json!({
        "results": {"documents": [{"id": batch[0].id(), "entities": [
            {"text": "a", "category": "Age", "offset": 0, "length": 1, "confidenceScore": 0.8},
            {"text": "b", "category": "Age", "offset": 1, "length": 1, "confidenceScore": 0.7999}
        ]}]}
    })
    .to_string();
    let documents = client::parse_response(&body, &batch, 0.8, SERVICE_NAME).unwrap();
    assert_eq!(documents[0].results.len(), 1);
    assert_eq!(documents[0].results[0].text, "a");
}

#[test]
fn test_undecodable_response() {
    let batch = units(1);
    let err = client::parse_response("<html>busy</html>", &batch, 0.8, SERVICE_NAME).unwrap_err();
    assert!(matches!(err, DetectionError::Decode { .. }));
}

/// Serve one canned HTTP response and hand back the raw request
async fn serve_once(status_line: &'static str, body: String) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buffer = [0u8; 4096];
        loop {
            let read = socket.read(&mut buffer).await.unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buffer[..read]);
            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let lower = line.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|value| value.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).to_string()
    });

    (address, handle)
}

#[tokio::test]
async fn test_live_request_round_trip() {
    let batch = units(2);
    let (address, server) = serve_once("HTTP/1.1 200 OK", response_body(&batch)).await;

    let client = LanguageServiceClient::new(live_settings(&address), options(false)).unwrap();
    let documents = client.detect(&batch).await.unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].results.len(), 1);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /language/:analyze-text?api-version=2023-04-01"));
    assert!(request
        .to_ascii_lowercase()
        .contains("ocp-apim-subscription-key: secret-key"));
    assert!(request.contains("\"kind\":\"PiiEntityRecognition\""));
}

#[tokio::test]
async fn test_http_error_status_is_surfaced() {
    let batch = units(1);
    let (address, server) =
        serve_once("HTTP/1.1 429 Too Many Requests", "{\"error\":\"slow down\"}".to_string()).await;

    let client = LanguageServiceClient::new(live_settings(&address), options(false)).unwrap();
    let err = client.detect(&batch).await.unwrap_err();
    match err {
        DetectionError::Status { status, message } => {
            assert_eq!(status, 429);
            assert!(message.contains("slow down"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_service_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = LanguageServiceClient::new(live_settings(&address), options(false)).unwrap();
    let err = client.detect(&units(1)).await.unwrap_err();
    assert!(matches!(err, DetectionError::Transport { .. }));
}
