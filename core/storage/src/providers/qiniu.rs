//! Qiniu Kodo form upload.
//!
//! The upload runs as an event stream (`Next` progress, then `Error` or
//! `Complete`) which [`settle`] collapses into a single result.

use async_stream::stream;
use async_trait::async_trait;
use futures::{pin_mut, Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

use picbed_common::{Error, Result, UploadRequest};

use crate::config::{non_empty, QiniuConfig};
use crate::context::UploadContext;
use crate::filename::{date_filename, FilenameKey};
use crate::http;
use crate::provider::UploadProvider;
use crate::signer::{base64_encode, hmac_sha1, safe64};
use crate::store::ClientStoreExt;

/// Upload token lifetime in seconds.
const TOKEN_TTL_SECS: i64 = 3600;

/// Put policy signed into the upload token. Field order is significant.
#[derive(Debug, Serialize)]
pub struct PutPolicy<'a> {
    pub scope: &'a str,
    pub deadline: i64,
}

/// Composite upload token `accessKey:urlSafe(sig):base64(policy)`.
pub fn upload_token(access_key: &str, secret_key: &str, policy: &PutPolicy<'_>) -> Result<String> {
    let policy_json = serde_json::to_string(policy)?;
    let encoded = base64_encode(policy_json.as_bytes());
    let signature = base64_encode(&hmac_sha1(secret_key.as_bytes(), encoded.as_bytes()));
    Ok(format!("{}:{}:{}", access_key, safe64(&signature), encoded))
}

/// Form-upload host for a region code.
pub fn region_host(region: &str) -> String {
    match region {
        "" | "z0" => "https://upload.qiniup.com".to_string(),
        other => format!("https://upload-{}.qiniup.com", other),
    }
}

/// Progress and terminal events of one upload.
#[derive(Debug)]
pub enum UploadEvent {
    /// Bytes sent so far out of the total.
    Next { loaded: u64, total: u64 },
    /// Upload rejected.
    Error(Error),
    /// Upload stored under `key`.
    Complete { key: String },
}

#[derive(Debug, Deserialize)]
struct FormUploadResponse {
    key: Option<String>,
}

/// Resolve an event stream to its terminal event.
///
/// `Next` events are diagnostic only. A stream that ends without a terminal
/// event is a response-shape error.
pub async fn settle<S>(events: S) -> Result<String>
where
    S: Stream<Item = UploadEvent>,
{
    pin_mut!(events);
    while let Some(event) = events.next().await {
        match event {
            UploadEvent::Next { loaded, total } => debug!("Qiniu progress {}/{}", loaded, total),
            UploadEvent::Error(err) => return Err(err),
            UploadEvent::Complete { key } => return Ok(key),
        }
    }
    Err(Error::ResponseShape("Qiniu upload ended without completing".to_string()))
}

/// Uploads to Qiniu with a locally signed upload token.
pub struct QiniuProvider {
    ctx: UploadContext,
}

impl QiniuProvider {
    /// Create the provider.
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }

    fn events(
        &self,
        host: String,
        token: String,
        key: String,
        request: &UploadRequest,
    ) -> impl Stream<Item = UploadEvent> {
        let client = self.ctx.http.clone();
        let file = request.file.clone();

        stream! {
            let total = file.size;
            yield UploadEvent::Next { loaded: 0, total };

            let part = match Part::bytes(file.data.to_vec())
                .file_name(file.name.clone())
                .mime_str(&file.mime_type)
            {
                Ok(part) => part,
                Err(e) => {
                    yield UploadEvent::Error(Error::InvalidInput(format!("Invalid MIME type: {}", e)));
                    return;
                }
            };
            let form = Form::new()
                .text("token", token)
                .text("key", key)
                .part("file", part);

            let response = match client.post(&host).multipart(form).send().await {
                Ok(response) => response,
                Err(e) => {
                    yield UploadEvent::Error(http::network("Qiniu upload failed", e));
                    return;
                }
            };
            if !response.status().is_success() {
                yield UploadEvent::Error(http::status_error(response).await);
                return;
            }

            yield UploadEvent::Next { loaded: total, total };
            match response.json::<FormUploadResponse>().await {
                Ok(FormUploadResponse { key: Some(key) }) => {
                    yield UploadEvent::Complete { key };
                }
                Ok(_) => {
                    yield UploadEvent::Error(Error::ResponseShape("Response lacks key".to_string()));
                }
                Err(e) => {
                    yield UploadEvent::Error(Error::ResponseShape(format!("Failed to parse response: {}", e)));
                }
            }
        }
    }
}

#[async_trait]
impl UploadProvider for QiniuProvider {
    fn name(&self) -> &str {
        "qiniu"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let config: QiniuConfig = self.ctx.store.backend_config("qiniu").await?;

        let deadline = self.ctx.clock.now().timestamp() + TOKEN_TTL_SECS;
        let token = upload_token(
            &config.access_key,
            config.secret_key.expose(),
            &PutPolicy {
                scope: &config.bucket,
                deadline,
            },
        )?;

        let key = FilenameKey::under(
            non_empty(&config.path),
            date_filename(self.ctx.clock.as_ref(), &request.file.name),
        )
        .to_key();
        let host = self
            .ctx
            .endpoints
            .qiniu_upload
            .clone()
            .unwrap_or_else(|| region_host(&config.region));

        let stored_key = settle(self.events(host, token, key, request)).await?;
        Ok(format!("{}/{}", config.domain, stored_key))
    }
}
