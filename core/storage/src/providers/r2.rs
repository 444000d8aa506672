//! Cloudflare R2 upload through a presigned PUT.
//!
//! Files whose name already has the generated `image-<13 digits>-` shape are
//! stored under that name so re-uploading a processed asset keeps its key.

use async_trait::async_trait;
use tracing::debug;

use picbed_common::{Result, UploadRequest};

use crate::config::{non_empty, R2Config};
use crate::context::UploadContext;
use crate::filename::{date_filename, is_generated_name, FilenameKey};
use crate::provider::UploadProvider;
use crate::store::ClientStoreExt;

use super::s3::{presigned_put, S3Target};

/// Account-scoped R2 API endpoint.
pub fn account_endpoint(account_id: &str) -> String {
    format!("https://{}.r2.cloudflarestorage.com", account_id)
}

pub struct R2Provider {
    ctx: UploadContext,
}

impl R2Provider {
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }

    fn object_name(&self, original: &str) -> String {
        if is_generated_name(original) {
            original.to_string()
        } else {
            date_filename(self.ctx.clock.as_ref(), original)
        }
    }
}

#[async_trait]
impl UploadProvider for R2Provider {
    fn name(&self) -> &str {
        "r2"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let config: R2Config = self.ctx.store.backend_config("r2").await?;
        let key = FilenameKey::under(non_empty(&config.path), self.object_name(&request.file.name)).to_key();
        let endpoint = self
            .ctx
            .endpoints
            .r2
            .clone()
            .unwrap_or_else(|| account_endpoint(&config.account_id));
        debug!("Uploading {} to R2 bucket {}", key, config.bucket);

        let target = S3Target {
            endpoint: &endpoint,
            access_key: &config.access_key,
            secret_key: config.secret_key.expose(),
            bucket: &config.bucket,
        };
        presigned_put(&self.ctx.http, &target, &key, &request.file).await?;

        Ok(format!("{}/{}", config.domain, key))
    }
}
