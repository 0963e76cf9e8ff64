//! Blob store client.
//!
//! Uploads are a single `PUT {base}/{key}` with the raw bytes as body. The
//! store answers with JSON whose `url` field is the public address of the
//! object.

use super::{snippet, storage_key, ArtifactStore};
use crate::{ArtifactUrl, Error, Result, StorageConfig};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PutBlobResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    pathname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobErrorBody {
    error: BlobErrorDetail,
}

#[derive(Debug, Deserialize)]
struct BlobErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Object store reached over the blob HTTP API
pub struct BlobStore {
    client: Client,
    base_url: String,
    token: String,
    namespace: String,
    api_version: String,
}

impl BlobStore {
    pub fn new(client: Client, config: &StorageConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            namespace: config.namespace.clone(),
            api_version: config.api_version.clone(),
        }
    }

    fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
        match serde_json::from_str::<BlobErrorBody>(body) {
            Ok(BlobErrorBody { error }) => format!(
                "HTTP {} ({}): {}",
                status.as_u16(),
                error.code.as_deref().unwrap_or("unknown"),
                error.message.as_deref().unwrap_or("no message")
            ),
            Err(_) => format!("HTTP {}: {}", status.as_u16(), snippet(body)),
        }
    }
}

impl ArtifactStore for BlobStore {
    fn store_artifact(&self, bytes: &[u8], content_type: &str) -> Result<ArtifactUrl> {
        let key = storage_key(&self.namespace, bytes);
        let res = self
            .client
            .put(format!("{}/{}", self.base_url, key))
            .bearer_auth(&self.token)
            .header("x-api-version", &self.api_version)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "0")
            .header("x-access", "public")
            .body(bytes.to_vec())
            .send()
            .map_err(|e| Error::StorageFailed(format!("upload of {} failed: {}", key, e)))?;

        let status = res.status();
        let body = res
            .text()
            .map_err(|e| Error::StorageFailed(format!("failed to read body: {}", e)))?;
        if !status.is_success() {
            return Err(Error::StorageFailed(Self::describe_failure(status, &body)));
        }

        let parsed: PutBlobResponse = serde_json::from_str(&body).map_err(|e| {
            Error::StorageFailed(format!("unexpected response: {}: {}", e, snippet(&body)))
        })?;
        let url = parsed
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::StorageFailed("response carried no url".into()))?;

        debug!(
            "stored {} bytes as {}",
            bytes.len(),
            parsed.pathname.as_deref().unwrap_or(&key)
        );
        Ok(ArtifactUrl::new(url))
    }
}
