//! Aliyun OSS upload with V1 header signing.

use async_trait::async_trait;
use reqwest::header;
use tracing::debug;

use picbed_common::{Result, UploadRequest};

use crate::config::{non_empty, AliOssConfig};
use crate::context::UploadContext;
use crate::filename::{date_filename, FilenameKey};
use crate::http;
use crate::provider::UploadProvider;
use crate::signer::{base64_encode, hmac_sha1, http_date, signing_string};
use crate::store::ClientStoreExt;

/// `OSS <ak>:<sig>` authorization over `PUT\n\n<type>\n<date>\n/<bucket>/<key>`.
pub fn authorization(config: &AliOssConfig, content_type: &str, date: &str, key: &str) -> String {
    let resource = format!("/{}/{}", config.bucket, key);
    let string_to_sign = signing_string(&["PUT", "", content_type, date, &resource], "\n");
    let signature = base64_encode(&hmac_sha1(
        config.access_key_secret.expose().as_bytes(),
        string_to_sign.as_bytes(),
    ));
    format!("OSS {}:{}", config.access_key_id, signature)
}

/// Virtual-hosted bucket origin.
pub fn bucket_origin(config: &AliOssConfig) -> String {
    let scheme = if config.secure() { "https" } else { "http" };
    format!("{}://{}.{}.aliyuncs.com", scheme, config.bucket, config.region)
}

/// Uploads an object with a signed PUT.
pub struct AliOssProvider {
    ctx: UploadContext,
}

impl AliOssProvider {
    /// Create the provider.
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl UploadProvider for AliOssProvider {
    fn name(&self) -> &str {
        "aliOSS"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let config: AliOssConfig = self.ctx.store.backend_config("aliOSS").await?;
        let key = FilenameKey::under(
            non_empty(&config.path),
            date_filename(self.ctx.clock.as_ref(), &request.file.name),
        )
        .to_key();

        let origin = bucket_origin(&config);
        let host = self.ctx.endpoints.ali_oss.clone().unwrap_or_else(|| origin.clone());
        let date = http_date(self.ctx.clock.now());
        let content_type = request.file.mime_type.as_str();
        debug!("Uploading {} to OSS bucket {}", key, config.bucket);

        let response = self
            .ctx
            .http
            .put(format!("{}/{}", host, key))
            .header(header::DATE, &date)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::AUTHORIZATION, authorization(&config, content_type, &date, &key))
            .body(request.file.data.clone())
            .send()
            .await
            .map_err(|e| http::network("OSS upload failed", e))?;
        http::ensure_success(response).await?;

        match non_empty(&config.cdn_host) {
            Some(cdn) => Ok(format!("{}/{}", cdn.trim_end_matches('/'), key)),
            None => Ok(format!("{}/{}", origin, key)),
        }
    }
}
