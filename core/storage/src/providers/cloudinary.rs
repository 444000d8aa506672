//! Cloudinary upload, signed with the API secret or unsigned through a preset.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use picbed_common::{Error, Result, UploadRequest};

use crate::config::{non_empty, CloudinaryConfig};
use crate::context::UploadContext;
use crate::http;
use crate::provider::UploadProvider;
use crate::signer::sign_params;
use crate::store::ClientStoreExt;

/// How an upload authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// SHA1 signature over the sorted parameters and the API secret.
    Signed { signature: String },
    /// Unsigned upload through a named preset.
    Unsigned,
}

/// Choose the authorization for `config` at `timestamp` (seconds).
///
/// Signing covers `folder`, `upload_preset` and `timestamp` when present.
pub fn authorize(config: &CloudinaryConfig, timestamp: i64) -> Result<Authorization> {
    let folder = non_empty(&config.folder);
    let preset = non_empty(&config.upload_preset);

    match config.api_secret.as_ref().filter(|s| !s.is_empty()) {
        Some(secret) => {
            let timestamp = timestamp.to_string();
            let mut params = vec![("timestamp", timestamp.as_str())];
            if let Some(folder) = folder {
                params.push(("folder", folder));
            }
            if let Some(preset) = preset {
                params.push(("upload_preset", preset));
            }
            Ok(Authorization::Signed {
                signature: sign_params(&params, secret.expose()),
            })
        }
        None if preset.is_some() => Ok(Authorization::Unsigned),
        None => Err(Error::ConfigMissing(
            "Cloudinary needs an uploadPreset when no apiSecret is set".to_string(),
        )),
    }
}

/// Replace the scheme and host of `url` with `domain`, keeping path and query.
pub fn with_domain(url: &str, domain: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::ResponseShape(format!("Invalid Cloudinary URL: {}", e)))?;
    let query = parsed.query().map(|q| format!("?{}", q)).unwrap_or_default();
    Ok(format!("{}{}{}", domain.trim_end_matches('/'), parsed.path(), query))
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

pub struct CloudinaryProvider {
    ctx: UploadContext,
}

impl CloudinaryProvider {
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl UploadProvider for CloudinaryProvider {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let config: CloudinaryConfig = self.ctx.store.backend_config("cloudinary").await?;
        if config.cloud_name.is_empty() || config.api_key.is_empty() {
            return Err(Error::ConfigMissing("Cloudinary needs cloudName and apiKey".to_string()));
        }

        let timestamp = self.ctx.clock.now().timestamp();
        let authorization = authorize(&config, timestamp)?;

        let part = Part::bytes(request.file.data.to_vec())
            .file_name(request.file.name.clone())
            .mime_str(&request.file.mime_type)
            .map_err(|e| Error::InvalidInput(format!("Invalid MIME type: {}", e)))?;
        let mut form = Form::new()
            .part("file", part)
            .text("api_key", config.api_key.clone())
            .text("timestamp", timestamp.to_string());
        if let Authorization::Signed { signature } = authorization {
            form = form.text("signature", signature);
        }
        if let Some(preset) = non_empty(&config.upload_preset) {
            form = form.text("upload_preset", preset.to_string());
        }
        if let Some(folder) = non_empty(&config.folder) {
            form = form.text("folder", folder.to_string());
        }

        let url = format!("{}/{}/image/upload", self.ctx.endpoints.cloudinary_api, config.cloud_name);
        debug!("Uploading {} to Cloudinary", request.file.name);
        let response = self
            .ctx
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| http::network("Cloudinary upload failed", e))?;

        let body: UploadResponse = http::handle_json(response).await?;
        let origin_url = body
            .secure_url
            .or(body.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::ResponseShape("Cloudinary response lacks url".to_string()))?;

        match non_empty(&config.domain) {
            Some(domain) => with_domain(&origin_url, domain),
            None => Ok(origin_url),
        }
    }
}
