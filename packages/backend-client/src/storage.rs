//! Object storage API: upload and bulk removal of files in a bucket

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::client::{BackendClient, Surface};
use crate::error::{BackendError, BackendResult};
use crate::models::Access;

/// File operations against the hosted object storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` at `path` inside `bucket`; fails if the path is taken
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> BackendResult<()>;

    /// Remove the given paths from `bucket`; missing paths are ignored
    async fn remove(&self, bucket: &str, paths: &[String]) -> BackendResult<()>;
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

fn validate_path(path: &str) -> BackendResult<()> {
    if path.is_empty() || path.starts_with('/') || path.split('/').any(|seg| seg == "..") {
        return Err(BackendError::Configuration(format!(
            "invalid storage path: {}",
            path
        )));
    }
    Ok(())
}

#[async_trait]
impl ObjectStorage for BackendClient {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> BackendResult<()> {
        validate_path(path)?;
        let url = format!("{}/object/{}/{}", self.config.storage_url(), bucket, path);

        let response = self
            .http_client
            .post(&url)
            .headers(self.access_headers(&Access::Service)?)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.check(response, Surface::Storage, bucket).await?;
        Ok(())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> BackendResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = format!("{}/object/{}", self.config.storage_url(), bucket);

        let response = self
            .http_client
            .delete(&url)
            .headers(self.access_headers(&Access::Service)?)
            .json(&RemoveRequest { prefixes: paths })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.check(response, Surface::Storage, bucket).await?;
        Ok(())
    }
}
