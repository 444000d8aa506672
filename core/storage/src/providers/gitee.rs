//! Gitee contents-API upload.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use tracing::debug;

use picbed_common::{Result, UploadRequest};

use crate::context::UploadContext;
use crate::filename::{date_filename, FilenameKey};
use crate::http;
use crate::provider::UploadProvider;
use crate::resolver::GitPlatform;

use super::git::{download_url, upload_message};

/// Characters left intact when encoding a whole URI.
const URI_RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Percent-encode a full URI, leaving its structural characters intact.
pub fn encode_uri(uri: &str) -> String {
    utf8_percent_encode(uri, URI_RESERVED).to_string()
}

#[derive(Serialize)]
struct CreateContent<'a> {
    content: &'a str,
    branch: &'a str,
    access_token: &'a str,
    message: &'a str,
}

/// Uploads through `POST /repos/{owner}/{repo}/contents/{path}` with the
/// token carried in the request body.
pub struct GiteeProvider {
    ctx: UploadContext,
}

impl GiteeProvider {
    /// Create the provider.
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl UploadProvider for GiteeProvider {
    fn name(&self) -> &str {
        "gitee"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let target = self.ctx.resolver().resolve(GitPlatform::Gitee).await?;
        let key = FilenameKey::dated(
            self.ctx.clock.now(),
            date_filename(self.ctx.clock.as_ref(), &request.file.name),
        );
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.ctx.endpoints.gitee_api,
            target.username,
            target.repo,
            key.to_key()
        );
        debug!("Uploading to Gitee {}/{}", target.username, target.repo);

        let message = upload_message(&self.ctx.origin);
        let response = self
            .ctx
            .http
            .post(&url)
            .json(&CreateContent {
                content: &request.content,
                branch: &target.branch,
                access_token: target.access_token.expose(),
                message: &message,
            })
            .send()
            .await
            .map_err(|e| http::network("Gitee upload failed", e))?;

        let body: serde_json::Value = http::handle_json(response).await?;
        Ok(encode_uri(&download_url(&body)?))
    }
}
