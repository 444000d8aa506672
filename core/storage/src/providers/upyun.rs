//! Upyun REST upload.

use async_trait::async_trait;
use reqwest::header;
use tracing::debug;

use picbed_common::{Result, UploadRequest};

use crate::config::{non_empty, UpyunConfig};
use crate::context::UploadContext;
use crate::filename::{date_filename, FilenameKey};
use crate::http;
use crate::provider::UploadProvider;
use crate::signer::{base64_encode, hmac_sha1, http_date, md5_hex, signing_string};
use crate::store::ClientStoreExt;

/// `UPYUN <operator>:<sig>` where sig is HMAC-SHA1 over `METHOD&URI&Date`
/// keyed with the MD5 hex of the password.
pub fn authorization(operator: &str, password: &str, uri: &str, date: &str) -> String {
    let string_to_sign = signing_string(&["PUT", uri, date], "&");
    let key = md5_hex(password.as_bytes());
    let signature = base64_encode(&hmac_sha1(key.as_bytes(), string_to_sign.as_bytes()));
    format!("UPYUN {}:{}", operator, signature)
}

pub struct UpyunProvider {
    ctx: UploadContext,
}

impl UpyunProvider {
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl UploadProvider for UpyunProvider {
    fn name(&self) -> &str {
        "upyun"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let config: UpyunConfig = self.ctx.store.backend_config("upyun").await?;
        let key = FilenameKey::under(
            non_empty(&config.path),
            date_filename(self.ctx.clock.as_ref(), &request.file.name),
        )
        .to_key();
        let uri = format!("/{}/{}", config.bucket, key);
        let date = http_date(self.ctx.clock.now());
        debug!("Uploading {} to Upyun", uri);

        let response = self
            .ctx
            .http
            .put(format!("{}{}", self.ctx.endpoints.upyun_api, uri))
            .header(
                header::AUTHORIZATION,
                authorization(&config.operator, config.password.expose(), &uri, &date),
            )
            .header("X-Date", &date)
            .header(header::CONTENT_TYPE, &request.file.mime_type)
            .body(request.file.data.clone())
            .send()
            .await
            .map_err(|e| http::network("Upyun upload failed", e))?;
        http::ensure_success(response).await?;

        Ok(format!("{}/{}", config.domain, key))
    }
}
