//! Table stage uploader
//!
//! `@%TABLE` is Snowflake's table-internal stage; here it is backed by an
//! `object_store` namespace parsed from a URL (S3, GCS, Azure, or a local
//! path for development). Upload puts the serialized file under its own name
//! and deletes the local copy only after the put is acknowledged, so a failed
//! transfer always leaves the file behind for reconciliation.

use crate::error::{Error, Result};
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default bounded retry for the idempotent put
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// One table's staging namespace
pub struct TableStage {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    scheme: String,
    table: String,
    max_retries: u32,
    initial_backoff: Duration,
}

impl TableStage {
    /// Parse a stage URL and bind it to one table.
    ///
    /// Supported: `s3://bucket/prefix`, `gs://bucket/prefix`,
    /// `az://container/prefix`, and local filesystem paths.
    pub fn parse(url: &str, table: &str) -> Result<Self> {
        let (store, prefix, scheme): (Arc<dyn ObjectStore>, String, &str) =
            if let Some(rest) = url.strip_prefix("s3://") {
                let (bucket, prefix) = split_bucket(rest);
                let store = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .build()
                    .map_err(|e| Error::config(format!("Failed to create S3 client: {e}")))?;
                (Arc::new(store), prefix, "s3")
            } else if let Some(rest) = url.strip_prefix("gs://") {
                let (bucket, prefix) = split_bucket(rest);
                let store = GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(bucket)
                    .build()
                    .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;
                (Arc::new(store), prefix, "gs")
            } else if let Some(rest) = url.strip_prefix("az://") {
                let (container, prefix) = split_bucket(rest);
                let store = MicrosoftAzureBuilder::from_env()
                    .with_container_name(container)
                    .build()
                    .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;
                (Arc::new(store), prefix, "az")
            } else {
                let path = url.strip_prefix("file://").unwrap_or(url);
                std::fs::create_dir_all(path).map_err(|e| {
                    Error::config(format!("Failed to create stage directory {path}: {e}"))
                })?;
                let store = LocalFileSystem::new_with_prefix(path)
                    .map_err(|e| Error::config(format!("Failed to open local stage: {e}")))?;
                (Arc::new(store), String::new(), "file")
            };

        Ok(Self::from_parts(store, prefix, scheme.to_string(), table))
    }

    /// Build a stage over an existing store (tests inject in-memory stores)
    pub fn with_store(store: Arc<dyn ObjectStore>, table: &str) -> Self {
        Self::from_parts(store, String::new(), "mem".to_string(), table)
    }

    fn from_parts(store: Arc<dyn ObjectStore>, prefix: String, scheme: String, table: &str) -> Self {
        Self {
            store,
            prefix,
            scheme,
            table: table.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self
    }

    /// The stage address used in logs: `@%TABLE`
    pub fn stage_name(&self) -> String {
        format!("@%{}", self.table)
    }

    /// URL scheme backing the stage (s3, gs, az, file, mem)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    fn object_path(&self, file_name: &str) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(file_name)
        } else {
            ObjectPath::from(format!(
                "{}/{file_name}",
                self.prefix.trim_end_matches('/')
            ))
        }
    }

    /// Upload a local file into the stage under its own name, then delete the
    /// local copy.
    ///
    /// The local file is deleted only after the put is acknowledged; on any
    /// failure it stays where it is.
    pub async fn upload(&self, local: &Path, file_name: &str) -> Result<()> {
        let data = tokio::fs::read(local).await.map_err(|e| {
            Error::stage_upload(format!("cannot read {}: {e}", local.display()))
        })?;
        let payload = PutPayload::from(Bytes::from(data));
        let path = self.object_path(file_name);

        let mut attempt = 0;
        loop {
            match self.store.put(&path, payload.clone()).await {
                Ok(_) => break,
                Err(e) if attempt < self.max_retries => {
                    let delay = self.initial_backoff * 2u32.pow(attempt);
                    warn!(
                        file = file_name,
                        stage = %self.stage_name(),
                        attempt = attempt + 1,
                        "stage put failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(Error::stage_upload(format!(
                        "PUT {file_name} to {}: {e}",
                        self.stage_name()
                    )));
                }
            }
        }

        debug!(file = file_name, stage = %self.stage_name(), "file staged");
        tokio::fs::remove_file(local).await?;
        Ok(())
    }

    /// Check whether a file is present in the stage
    pub async fn exists(&self, file_name: &str) -> Result<bool> {
        match self.store.head(&self.object_path(file_name)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(Error::from(e)),
        }
    }
}

fn split_bucket(rest: &str) -> (&str, String) {
    match rest.find('/') {
        Some(idx) => (&rest[..idx], rest[idx + 1..].to_string()),
        None => (rest, String::new()),
    }
}
