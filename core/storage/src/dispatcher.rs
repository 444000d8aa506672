//! Routes an upload to the backend selected in the client store.

use tracing::{debug, info};

use picbed_common::{Result, UploadFile, UploadRequest};

use crate::backend::Backend;
use crate::context::UploadContext;
use crate::provider::UploadProvider;
use crate::providers::{
    AliOssProvider, CloudinaryProvider, CustomProvider, GitHubProvider, GiteeProvider, MinioProvider,
    QiniuProvider, R2Provider, TelegramProvider, TxCosProvider, UpyunProvider, WeChatProvider,
};
use crate::store::BACKEND_KEY;

/// Value written to the backend key when nothing was selected yet.
pub const UNSET_BACKEND: &str = "default";

/// Uploads through whichever backend the store selects.
///
/// Performs no retries of its own; errors from the strategy are returned
/// unchanged.
pub struct Dispatcher {
    ctx: UploadContext,
}

impl Dispatcher {
    /// Create a dispatcher over `ctx`.
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }

    /// Backend selected in the store.
    ///
    /// An absent selection is initialised to `"default"`, which like any
    /// unrecognised id selects the default backend.
    pub async fn selected_backend(&self) -> Result<Backend> {
        let stored = self.ctx.store.get(BACKEND_KEY).await?;
        if stored.is_none() {
            debug!("No backend selected, storing '{}'", UNSET_BACKEND);
            self.ctx.store.set(BACKEND_KEY, UNSET_BACKEND).await?;
        }
        Ok(Backend::from_id(stored.as_deref()))
    }

    /// Strategy for `backend`.
    pub fn provider(&self, backend: Backend) -> Box<dyn UploadProvider> {
        let ctx = self.ctx.clone();
        match backend {
            Backend::AliOss => Box::new(AliOssProvider::new(ctx)),
            Backend::Minio => Box::new(MinioProvider::new(ctx)),
            Backend::TxCos => Box::new(TxCosProvider::new(ctx)),
            Backend::Qiniu => Box::new(QiniuProvider::new(ctx)),
            Backend::Gitee => Box::new(GiteeProvider::new(ctx)),
            Backend::GitHub => Box::new(GitHubProvider::new(ctx)),
            Backend::WeChat => Box::new(WeChatProvider::new(ctx)),
            Backend::R2 => Box::new(R2Provider::new(ctx)),
            Backend::Upyun => Box::new(UpyunProvider::new(ctx)),
            Backend::Telegram => Box::new(TelegramProvider::new(ctx)),
            Backend::Cloudinary => Box::new(CloudinaryProvider::new(ctx)),
            Backend::Custom => Box::new(CustomProvider::new(ctx)),
        }
    }

    /// Upload `file` (and its textual `content`) to the selected backend.
    ///
    /// # Postconditions
    /// - Returns the public URL reported by the strategy
    ///
    /// # Errors
    /// - Store failures reading the selection
    /// - Whatever the selected strategy fails with
    pub async fn dispatch(&self, content: impl Into<String>, file: UploadFile) -> Result<String> {
        self.upload(&UploadRequest::new(content, file)).await
    }

    /// Upload a prepared request to the selected backend.
    pub async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let backend = self.selected_backend().await?;
        let provider = self.provider(backend);
        debug!("Dispatching {} to {}", request.file.name, provider.name());

        let url = provider.upload(request).await?;
        info!("Uploaded {} via {}", request.file.name, backend);
        Ok(url)
    }
}
