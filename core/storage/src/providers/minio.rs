//! Minio upload through a presigned PUT.

use async_trait::async_trait;

use picbed_common::{Result, UploadRequest};

use crate::config::MinioConfig;
use crate::context::UploadContext;
use crate::filename::date_filename;
use crate::provider::UploadProvider;
use crate::store::ClientStoreExt;

use super::s3::{presigned_put, S3Target};

pub struct MinioProvider {
    ctx: UploadContext,
}

impl MinioProvider {
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl UploadProvider for MinioProvider {
    fn name(&self) -> &str {
        "minio"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let config: MinioConfig = self.ctx.store.backend_config("minio").await?;
        let key = date_filename(self.ctx.clock.as_ref(), &request.file.name);
        let base_url = config.base_url();

        let target = S3Target {
            endpoint: &base_url,
            access_key: &config.access_key,
            secret_key: config.secret_key.expose(),
            bucket: &config.bucket,
        };
        presigned_put(&self.ctx.http, &target, &key, &request.file).await?;

        Ok(format!("{}/{}/{}", base_url, config.bucket, key))
    }
}
