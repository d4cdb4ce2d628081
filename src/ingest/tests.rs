//! Tests for the ingestion notifier

use super::*;
use crate::config::SnowflakeConfig;
use crate::error::Error;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_KEY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/data/test_rsa_key.pem"
));

fn test_config(ingest_url: &str) -> SnowflakeConfig {
    SnowflakeConfig {
        account: "xy12345".to_string(),
        user: "loader".to_string(),
        private_key_pem: TEST_KEY.to_string(),
        public_key_fp: "SHA256:abcdef0123456789".to_string(),
        database: "INGEST".to_string(),
        schema: "INGEST".to_string(),
        warehouse: "INGEST".to_string(),
        role: "INGEST".to_string(),
        table: "LIFT_TICKETS".to_string(),
        pipe: "LIFT_TICKETS_PIPE".to_string(),
        stage_url: "/tmp/unused".to_string(),
        ingest_url: Some(ingest_url.to_string()),
    }
}

// ============================================================================
// JWT Tests
// ============================================================================

#[test]
fn test_jwt_issuer_and_subject_format() {
    let auth = KeyPairAuth::new(&test_config("http://unused")).unwrap();
    assert_eq!(auth.issuer(), "XY12345.LOADER.SHA256:abcdef0123456789");
}

#[test]
fn test_jwt_fingerprint_prefix_is_added_once() {
    let mut config = test_config("http://unused");
    config.public_key_fp = "abcdef0123456789".to_string();
    let auth = KeyPairAuth::new(&config).unwrap();
    assert_eq!(auth.issuer(), "XY12345.LOADER.SHA256:abcdef0123456789");
}

#[tokio::test]
async fn test_jwt_token_is_signed_rs256_and_cached() {
    let auth = KeyPairAuth::new(&test_config("http://unused")).unwrap();
    let token = auth.token().await.unwrap();
    assert_eq!(token.split('.').count(), 3);

    let header = jsonwebtoken::decode_header(&token).unwrap();
    assert_eq!(header.alg, jsonwebtoken::Algorithm::RS256);

    // Fresh token is reused, not re-signed.
    assert_eq!(auth.token().await.unwrap(), token);
}

#[test]
fn test_jwt_rejects_garbage_key() {
    let mut config = test_config("http://unused");
    config.private_key_pem = "not a key".to_string();
    assert!(matches!(KeyPairAuth::new(&config), Err(Error::Jwt(_))));
}

// ============================================================================
// Client Tests
// ============================================================================

#[tokio::test]
async fn test_insert_file_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/data/pipes/INGEST.INGEST.LIFT_TICKETS_PIPE/insertFiles"))
        .and(body_partial_json(serde_json::json!({
            "files": [{"path": "abc.parquet"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseCode": "SUCCESS",
            "requestId": "req-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = IngestClient::new(&test_config(&server.uri())).unwrap();
    let response = client.insert_file("abc.parquet").await.unwrap();
    assert!(response.is_success());
    assert_eq!(response.response_code, "SUCCESS");
}

#[tokio::test]
async fn test_insert_file_non_success_code_is_returned_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseCode": "FAILURE"
        })))
        .mount(&server)
        .await;

    let client = IngestClient::new(&test_config(&server.uri())).unwrap();
    let response = client.insert_file("abc.parquet").await.unwrap();
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_insert_file_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("pipe not found"))
        .expect(1)
        .mount(&server)
        .await;

    let client = IngestClient::new(&test_config(&server.uri())).unwrap();
    let err = client.insert_file("abc.parquet").await.unwrap_err();
    match err {
        Error::IngestStatus { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("pipe not found"));
        }
        other => panic!("expected IngestStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_insert_file_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseCode": "SUCCESS"
        })))
        .mount(&server)
        .await;

    let client = IngestClient::new(&test_config(&server.uri()))
        .unwrap()
        .with_retry(3, std::time::Duration::from_millis(1));
    let response = client.insert_file("abc.parquet").await.unwrap();
    assert!(response.is_success());
}
