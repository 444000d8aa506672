//! Tencent COS upload with `q-sign-algorithm=sha1` request signing.

use async_trait::async_trait;
use reqwest::header;
use tracing::debug;

use picbed_common::{Result, UploadRequest};

use crate::config::{non_empty, TxCosConfig};
use crate::context::UploadContext;
use crate::filename::{date_filename, FilenameKey};
use crate::http;
use crate::provider::UploadProvider;
use crate::signer::{hmac_sha1, sha1_hex};
use crate::store::ClientStoreExt;

/// Validity window of a request signature, in seconds.
const SIGN_TTL_SECS: i64 = 600;

/// Authorization value for `PUT /<key>` valid from `start` for the signing window.
///
/// No headers or query parameters are signed.
pub fn authorization(secret_id: &str, secret_key: &str, key: &str, start: i64) -> String {
    let key_time = format!("{};{}", start, start + SIGN_TTL_SECS);
    let sign_key = hex::encode(hmac_sha1(secret_key.as_bytes(), key_time.as_bytes()));

    let http_string = format!("put\n/{}\n\n\n", key);
    let string_to_sign = format!("sha1\n{}\n{}\n", key_time, sha1_hex(http_string.as_bytes()));
    let signature = hex::encode(hmac_sha1(sign_key.as_bytes(), string_to_sign.as_bytes()));

    format!(
        "q-sign-algorithm=sha1&q-ak={}&q-sign-time={}&q-key-time={}&q-header-list=&q-url-param-list=&q-signature={}",
        secret_id, key_time, key_time, signature
    )
}

/// Default public origin of a bucket.
pub fn bucket_origin(config: &TxCosConfig) -> String {
    format!("https://{}.cos.{}.myqcloud.com", config.bucket, config.region)
}

/// Uploads an object with a signed PUT.
pub struct TxCosProvider {
    ctx: UploadContext,
}

impl TxCosProvider {
    /// Create the provider.
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl UploadProvider for TxCosProvider {
    fn name(&self) -> &str {
        "txCOS"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let config: TxCosConfig = self.ctx.store.backend_config("txCOS").await?;
        let key = FilenameKey::under(
            non_empty(&config.path),
            date_filename(self.ctx.clock.as_ref(), &request.file.name),
        )
        .to_key();

        let origin = bucket_origin(&config);
        let host = self.ctx.endpoints.tx_cos.clone().unwrap_or_else(|| origin.clone());
        let auth = authorization(
            &config.secret_id,
            config.secret_key.expose(),
            &key,
            self.ctx.clock.now().timestamp(),
        );
        debug!("Uploading {} to COS bucket {}", key, config.bucket);

        let response = self
            .ctx
            .http
            .put(format!("{}/{}", host, key))
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, &request.file.mime_type)
            .body(request.file.data.clone())
            .send()
            .await
            .map_err(|e| http::network("COS upload failed", e))?;
        http::ensure_success(response).await?;

        match non_empty(&config.cdn_host) {
            Some(cdn) => Ok(format!("{}/{}", cdn.trim_end_matches('/'), key)),
            None => Ok(format!("{}/{}", origin, key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{context, endpoints_for, png_request};
    use serde_json::json;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(path: &str, cdn: &str) -> MemoryStore {
        MemoryStore::with_entries([(
            "txCOSConfig",
            json!({
                "secretId": "sid", "secretKey": "skey", "bucket": "pics-1250000000",
                "region": "ap-guangzhou", "path": path, "cdnHost": cdn
            })
            .to_string(),
        )])
    }

    #[test]
    fn test_authorization_fields() {
        let auth = authorization("sid", "skey", "a.png", 1_700_000_000);
        assert!(auth.starts_with("q-sign-algorithm=sha1&q-ak=sid&q-sign-time=1700000000;1700000600&"));

        let sign_key = hex::encode(hmac_sha1(b"skey", b"1700000000;1700000600"));
        let string_to_sign = format!(
            "sha1\n1700000000;1700000600\n{}\n",
            sha1_hex(b"put\n/a.png\n\n\n")
        );
        let expected = hex::encode(hmac_sha1(sign_key.as_bytes(), string_to_sign.as_bytes()));
        assert!(auth.ends_with(&format!("q-signature={}", expected)));
    }

    #[tokio::test]
    async fn test_empty_path_omitted_from_key() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/\d{13}-[0-9a-f-]{36}\.png$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(store("", ""), endpoints_for(&server));
        let url = TxCosProvider::new(ctx).upload(&png_request(4)).await.unwrap();
        assert!(
            url.starts_with("https://pics-1250000000.cos.ap-guangzhou.myqcloud.com/1700000000000-"),
            "{}",
            url
        );
    }

    #[tokio::test]
    async fn test_cdn_host_with_path() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/blog/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(store("blog", "https://cdn.example.com"), endpoints_for(&server));
        let url = TxCosProvider::new(ctx).upload(&png_request(4)).await.unwrap();
        assert!(url.starts_with("https://cdn.example.com/blog/1700000000000-"), "{}", url);
    }
}
