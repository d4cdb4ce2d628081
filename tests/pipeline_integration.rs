//! End-to-end pipeline tests
//!
//! Full flow: NDJSON input → batches → Parquet → staged file → ingest
//! notification, with an in-memory object store standing in for the table
//! stage and a mock HTTP server for the ingest endpoint.

use futures::stream::BoxStream;
use futures::TryStreamExt;
use liftpipe::config::SnowflakeConfig;
use liftpipe::error::Error;
use liftpipe::ingest::IngestClient;
use liftpipe::output::arrow_to_tickets;
use liftpipe::pipeline::Pipeline;
use liftpipe::source::{TicketGenerator, TicketReader, DEFAULT_RESORTS};
use liftpipe::stage::TableStage;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_KEY: &str = include_str!("data/test_rsa_key.pem");

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

async fn success_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/v1/data/pipes/INGEST.INGEST.LIFT_TICKETS_PIPE/insertFiles",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseCode": "SUCCESS"
        })))
        .mount(&server)
        .await;
    server
}

fn ndjson_feed(count: usize, seed: u64) -> String {
    let mut generator = TicketGenerator::with_seed(DEFAULT_RESORTS, seed);
    let mut feed: String = (0..count)
        .map(|_| serde_json::to_string(&generator.generate()).unwrap() + "\n")
        .collect();
    feed.push('\n'); // end-of-stream marker
    feed
}

/// File names the ingest service was notified about, in request order
async fn notified_files(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|req| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            body["files"][0]["path"].as_str().unwrap().to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_seven_records_capacity_three_end_to_end() {
    let server = success_server().await;
    let store = Arc::new(InMemory::new());
    let stage = TableStage::with_store(store.clone(), "LIFT_TICKETS");
    let ingest = IngestClient::new(&test_config(&server.uri())).unwrap();
    let pipeline = Pipeline::new(stage, ingest).unwrap();
    let temp_path = pipeline.temp_path().to_path_buf();

    let feed = ndjson_feed(7, 42);
    let expected_txids: Vec<String> = TicketReader::new(Cursor::new(feed.clone()))
        .map(|r| r.unwrap().txid)
        .collect();

    let reader = TicketReader::new(Cursor::new(feed));
    let stats = pipeline.run(reader, 3).await.unwrap();

    assert_eq!(stats.records, 7);
    assert_eq!(stats.committed, 3);
    assert_eq!(stats.failed, 0);

    // Three distinct uniquely-named staged files, notified in batch order.
    let files = notified_files(&server).await;
    assert_eq!(files.len(), 3);
    let mut unique = files.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 3);
    for name in &files {
        assert!(name.ends_with(".parquet"));
    }

    // Decode each staged file; batch sizes are 3, 3, 1 and record order
    // across batches matches input order.
    let mut seen_txids = Vec::new();
    let mut sizes = Vec::new();
    for name in &files {
        let data = store
            .get(&ObjectPath::from(name.as_str()))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(data)
            .unwrap()
            .build()
            .unwrap();
        let mut rows = 0;
        for batch in reader {
            let tickets = arrow_to_tickets(&batch.unwrap()).unwrap();
            rows += tickets.len();
            seen_txids.extend(tickets.into_iter().map(|t| t.txid));
        }
        sizes.push(rows);
    }
    assert_eq!(sizes, vec![3, 3, 1]);
    assert_eq!(seen_txids, expected_txids);

    assert!(!temp_path.exists(), "temp dir removed at run end");
}

#[tokio::test]
async fn test_empty_stream_creates_nothing_and_cleans_up() {
    let server = success_server().await;
    let store = Arc::new(InMemory::new());
    let stage = TableStage::with_store(store.clone(), "LIFT_TICKETS");
    let ingest = IngestClient::new(&test_config(&server.uri())).unwrap();
    let pipeline = Pipeline::new(stage, ingest).unwrap();
    let temp_path = pipeline.temp_path().to_path_buf();

    let reader = TicketReader::new(Cursor::new("\n"));
    let stats = pipeline.run(reader, 3).await.unwrap();

    assert_eq!(stats.records, 0);
    assert_eq!(stats.committed, 0);
    let staged: Vec<_> = store.list(None).try_collect().await.unwrap();
    assert!(staged.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!temp_path.exists());
}

#[tokio::test]
async fn test_failed_upload_retains_file_and_skips_notification() {
    let server = success_server().await;
    let stage = TableStage::with_store(Arc::new(FailingStore), "LIFT_TICKETS")
        .with_retry(0, std::time::Duration::from_millis(1));
    let ingest = IngestClient::new(&test_config(&server.uri())).unwrap();
    let pipeline = Pipeline::new(stage, ingest).unwrap();

    let mut generator = TicketGenerator::with_seed(DEFAULT_RESORTS, 7);
    let batch = vec![generator.generate(), generator.generate()];

    let err = pipeline.commit_batch(0, &batch).await.unwrap_err();
    assert!(matches!(err, Error::StageUpload { .. }));

    // Local file retained for forensics; no ingest request issued.
    let leftover: Vec<_> = std::fs::read_dir(pipeline.temp_path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(leftover.len(), 1);
    assert!(leftover[0].extension().is_some_and(|e| e == "parquet"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cleanup_runs_despite_failed_batches() {
    let server = success_server().await;
    let stage = TableStage::with_store(Arc::new(FailingStore), "LIFT_TICKETS")
        .with_retry(0, std::time::Duration::from_millis(1));
    let ingest = IngestClient::new(&test_config(&server.uri())).unwrap();
    let pipeline = Pipeline::new(stage, ingest).unwrap();
    let temp_path = pipeline.temp_path().to_path_buf();

    let reader = TicketReader::new(Cursor::new(ndjson_feed(5, 3)));
    let stats = pipeline.run(reader, 2).await.unwrap();

    assert_eq!(stats.records, 5);
    assert_eq!(stats.committed, 0);
    assert_eq!(stats.failed, 3);
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(
        !temp_path.exists(),
        "temp dir removed even when every batch fails"
    );
}

// ============================================================================
// Failing store test double
// ============================================================================

/// Object store whose writes always fail
#[derive(Debug)]
struct FailingStore;

impl fmt::Display for FailingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FailingStore")
    }
}

fn refused() -> object_store::Error {
    object_store::Error::Generic {
        store: "failing",
        source: "transfer refused".into(),
    }
}

#[async_trait::async_trait]
impl ObjectStore for FailingStore {
    async fn put_opts(
        &self,
        _location: &ObjectPath,
        _payload: PutPayload,
        _opts: object_store::PutOptions,
    ) -> object_store::Result<object_store::PutResult> {
        Err(refused())
    }

    async fn put_multipart_opts(
        &self,
        _location: &ObjectPath,
        _opts: object_store::PutMultipartOpts,
    ) -> object_store::Result<Box<dyn object_store::MultipartUpload>> {
        Err(refused())
    }

    async fn get_opts(
        &self,
        _location: &ObjectPath,
        _options: object_store::GetOptions,
    ) -> object_store::Result<object_store::GetResult> {
        Err(refused())
    }

    async fn delete(&self, _location: &ObjectPath) -> object_store::Result<()> {
        Err(refused())
    }

    fn list(
        &self,
        _prefix: Option<&ObjectPath>,
    ) -> BoxStream<'_, object_store::Result<object_store::ObjectMeta>> {
        Box::pin(futures::stream::empty())
    }

    async fn list_with_delimiter(
        &self,
        _prefix: Option<&ObjectPath>,
    ) -> object_store::Result<object_store::ListResult> {
        Err(refused())
    }

    async fn copy(&self, _from: &ObjectPath, _to: &ObjectPath) -> object_store::Result<()> {
        Err(refused())
    }

    async fn copy_if_not_exists(
        &self,
        _from: &ObjectPath,
        _to: &ObjectPath,
    ) -> object_store::Result<()> {
        Err(refused())
    }
}
