//! WeChat official-account media upload.
//!
//! Access tokens come from the `stable_token` endpoint and are cached per app
//! id. Small JPEG/PNG images go to the lightweight `uploadimg` endpoint; all
//! other files become permanent image material.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

use picbed_common::{Error, Result, UploadFile, UploadRequest};

use crate::config::{non_empty, MpConfig};
use crate::context::UploadContext;
use crate::http;
use crate::provider::UploadProvider;
use crate::store::ClientStoreExt;
use crate::token_cache::IssuedToken;

/// Token cache namespace.
pub const TOKEN_NAMESPACE: &str = "mpToken";

/// Files below this size may use the lightweight endpoint.
const UPLOADIMG_LIMIT: u64 = 1024 * 1024;

/// Characters left intact when encoding a URI component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Endpoint path and query for uploading `file` with `token`.
pub fn media_path(file: &UploadFile, token: &str) -> String {
    let mime = file.mime_type.to_ascii_lowercase();
    if file.size < UPLOADIMG_LIMIT && (mime == "image/jpeg" || mime == "image/png") {
        format!("/cgi-bin/media/uploadimg?access_token={}", token)
    } else {
        format!("/cgi-bin/material/add_material?access_token={}&type=image", token)
    }
}

/// Serve `url` through the image proxy.
pub fn proxied(image_proxy: &str, url: &str) -> String {
    format!("{}?url={}", image_proxy, utf8_percent_encode(url, COMPONENT))
}

#[derive(Serialize)]
struct StableTokenRequest<'a> {
    grant_type: &'a str,
    appid: &'a str,
    secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct StableTokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: i64,
    errmsg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    url: Option<String>,
    errmsg: Option<String>,
}

pub struct WeChatProvider {
    ctx: UploadContext,
}

impl WeChatProvider {
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }

    async fn issue_token(&self, base: &str, config: &MpConfig) -> Result<IssuedToken> {
        let response = self
            .ctx
            .http
            .post(format!("{}/cgi-bin/stable_token", base))
            .json(&StableTokenRequest {
                grant_type: "client_credential",
                appid: &config.app_id,
                secret: config.appsecret.expose(),
            })
            .send()
            .await
            .map_err(|e| http::network("WeChat token request failed", e))?;

        let body: StableTokenResponse = http::handle_json(response).await?;
        match body.access_token.filter(|t| !t.is_empty()) {
            Some(access_token) => Ok(IssuedToken {
                access_token,
                expires_in: body.expires_in,
            }),
            None => Err(Error::Authentication(format!(
                "Failed to obtain WeChat access token: {}",
                body.errmsg.unwrap_or_default()
            ))),
        }
    }
}

#[async_trait]
impl UploadProvider for WeChatProvider {
    fn name(&self) -> &str {
        "mp"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let config: MpConfig = self.ctx.store.backend_config("mp").await?;
        let proxy = non_empty(&config.proxy_origin);
        let base = proxy.unwrap_or(&self.ctx.endpoints.weixin_api).trim_end_matches('/');

        let token = self
            .ctx
            .token_cache(TOKEN_NAMESPACE)
            .get_token(&config.app_id, || self.issue_token(base, &config))
            .await?;

        let part = Part::bytes(request.file.data.to_vec())
            .file_name(request.file.name.clone())
            .mime_str(&request.file.mime_type)
            .map_err(|e| Error::InvalidInput(format!("Invalid MIME type: {}", e)))?;
        let url = format!("{}{}", base, media_path(&request.file, &token));
        debug!("Uploading {} ({} bytes) to WeChat", request.file.name, request.file.size);

        let response = self
            .ctx
            .http
            .post(&url)
            .multipart(Form::new().part("media", part))
            .send()
            .await
            .map_err(|e| http::network("WeChat upload failed", e))?;

        let body: MediaResponse = http::handle_json(response).await?;
        let image_url = match body.url.filter(|u| !u.is_empty()) {
            Some(url) => url,
            None => {
                return Err(Error::ResponseShape(format!(
                    "WeChat upload returned no url: {}",
                    body.errmsg.unwrap_or_default()
                )))
            }
        };

        if proxy.is_some() && self.ctx.origin.starts_with("http") {
            Ok(proxied(&self.ctx.endpoints.image_proxy, &image_url))
        } else {
            Ok(image_url)
        }
    }
}
