//! Telegram bot upload.
//!
//! The photo is posted to a chat; the largest rendition's file path becomes
//! the download URL. The message itself is where the asset lives.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use picbed_common::{Error, Result, UploadRequest};

use crate::config::TelegramConfig;
use crate::context::UploadContext;
use crate::http;
use crate::provider::UploadProvider;
use crate::store::ClientStoreExt;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    #[serde(default)]
    photo: Vec<PhotoSize>,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    file_path: String,
}

pub struct TelegramProvider {
    ctx: UploadContext,
}

impl TelegramProvider {
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }

    async fn send_photo(&self, config: &TelegramConfig, request: &UploadRequest) -> Result<String> {
        let part = Part::bytes(request.file.data.to_vec())
            .file_name(request.file.name.clone())
            .mime_str(&request.file.mime_type)
            .map_err(|e| Error::InvalidInput(format!("Invalid MIME type: {}", e)))?;
        let form = Form::new().text("chat_id", config.chat_id.clone()).part("photo", part);

        let url = format!("{}/bot{}/sendPhoto", self.ctx.endpoints.telegram_api, config.token.expose());
        let response = self
            .ctx
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| http::network("Telegram sendPhoto failed", e))?;

        let sent: Envelope<SentMessage> = http::handle_json(response).await?;
        let mut photos = match sent {
            Envelope { ok: true, result: Some(message) } => message.photo,
            _ => Vec::new(),
        };
        photos
            .pop()
            .map(|p| p.file_id)
            .ok_or_else(|| Error::ResponseShape("Telegram sendPhoto returned no photo".to_string()))
    }

    async fn file_path(&self, config: &TelegramConfig, file_id: &str) -> Result<String> {
        let url = format!("{}/bot{}/getFile", self.ctx.endpoints.telegram_api, config.token.expose());
        let response = self
            .ctx
            .http
            .get(&url)
            .query(&[("file_id", file_id)])
            .send()
            .await
            .map_err(|e| http::network("Telegram getFile failed", e))?;

        match http::handle_json::<Envelope<RemoteFile>>(response).await? {
            Envelope { ok: true, result: Some(file) } => Ok(file.file_path),
            _ => Err(Error::ResponseShape("Telegram getFile returned no file".to_string())),
        }
    }
}

#[async_trait]
impl UploadProvider for TelegramProvider {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let config: TelegramConfig = self.ctx.store.backend_config("telegram").await?;

        let file_id = self.send_photo(&config, request).await?;
        debug!("Telegram stored photo {}", file_id);
        let file_path = self.file_path(&config, &file_id).await?;

        Ok(format!(
            "{}/file/bot{}/{}",
            self.ctx.endpoints.telegram_api,
            config.token.expose(),
            file_path
        ))
    }
}
