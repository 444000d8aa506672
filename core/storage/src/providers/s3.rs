//! Presigned PUT flow shared by the S3-compatible backends.

use std::time::Duration;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use reqwest::header;
use tracing::debug;

use picbed_common::{Error, Result, UploadFile};

use crate::http;

/// Lifetime of a presigned upload URL.
pub const PRESIGN_TTL: Duration = Duration::from_secs(300);

/// Connection settings for one S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Target<'a> {
    pub endpoint: &'a str,
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub bucket: &'a str,
}

fn client(target: &S3Target<'_>) -> Client {
    let credentials = Credentials::new(target.access_key, target.secret_key, None, None, "picbed");
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("auto"))
        .endpoint_url(target.endpoint)
        .credentials_provider(credentials)
        .force_path_style(true)
        .build();
    Client::from_conf(config)
}

/// Presign a PUT of `key` and send `file` through it.
///
/// The presigned URL carries an expiring signature; callers build the
/// permanent object address themselves.
pub async fn presigned_put(
    http_client: &reqwest::Client,
    target: &S3Target<'_>,
    key: &str,
    file: &UploadFile,
) -> Result<()> {
    let presigning = PresigningConfig::expires_in(PRESIGN_TTL)
        .map_err(|e| Error::InvalidInput(format!("Invalid presign window: {}", e)))?;
    let presigned = client(target)
        .put_object()
        .bucket(target.bucket)
        .key(key)
        .content_type(&file.mime_type)
        .presigned(presigning)
        .await
        .map_err(|e| Error::Authentication(format!("Failed to presign upload: {}", e)))?;
    debug!("Presigned PUT for {}/{}", target.bucket, key);

    let mut request = http_client
        .put(presigned.uri())
        .header(header::CONTENT_TYPE, &file.mime_type);
    for (name, value) in presigned.headers() {
        if !name.eq_ignore_ascii_case("content-type") {
            request = request.header(name, value);
        }
    }
    let response = request
        .body(file.data.clone())
        .send()
        .await
        .map_err(|e| http::network("Presigned upload failed", e))?;
    http::ensure_success(response).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::file;
    use wiremock::matchers::{header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_presigned_put_is_path_style_and_signed() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/pics/a/b.png"))
            .and(query_param("X-Amz-Expires", "300"))
            .and(header_eq("Content-Type", "image/png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = server.uri();
        let target = S3Target {
            endpoint: &endpoint,
            access_key: "ak",
            secret_key: "sk",
            bucket: "pics",
        };
        presigned_put(&http::default_client(), &target, "a/b.png", &file("b.png", "image/png", 6))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default().to_string();
        assert!(query.contains("X-Amz-Signature="), "{}", query);
        assert!(query.contains("X-Amz-Credential=ak%2F"), "{}", query);
    }

    #[tokio::test]
    async fn test_non_success_status_rejects() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let endpoint = server.uri();
        let target = S3Target {
            endpoint: &endpoint,
            access_key: "ak",
            secret_key: "sk",
            bucket: "pics",
        };
        let err = presigned_put(&http::default_client(), &target, "k.png", &file("k.png", "image/png", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendStatus { status: 500, .. }));
    }
}
