//! Upload through a registered extension chosen by the `formCustom` config.

use async_trait::async_trait;
use tracing::debug;

use picbed_common::{Result, UploadRequest};

use crate::config::ExtensionConfig;
use crate::context::UploadContext;
use crate::extension::{ExtensionRunner, ExtensionUtil};
use crate::provider::UploadProvider;
use crate::store::ClientStoreExt;

pub struct CustomProvider {
    ctx: UploadContext,
}

impl CustomProvider {
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl UploadProvider for CustomProvider {
    fn name(&self) -> &str {
        "formCustom"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let config: ExtensionConfig = self.ctx.store.backend_config("formCustom").await?;
        let extension = self.ctx.extensions.resolve(&config.extension)?;
        debug!("Running extension {}", config.extension);

        let runner = ExtensionRunner::new(ExtensionUtil::new(self.ctx.http.clone(), self.ctx.clock.clone()));
        runner.run(extension.as_ref(), request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{Completion, Extension, ExtensionRegistry};
    use crate::store::MemoryStore;
    use crate::testing::{context, png_request};
    use picbed_common::{Error, UploadFile};
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl Extension for Echo {
        async fn run(&self, _content: &str, file: &UploadFile, util: &ExtensionUtil, done: Completion) -> Result<()> {
            done.succeed(format!("https://echo.example.com/{}", util.date_filename(&file.name)));
            Ok(())
        }
    }

    fn registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry.register("echo", Arc::new(Echo)).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_selected_extension_runs() {
        let store = MemoryStore::with_entries([("formCustomConfig", r#"{"extension":"echo"}"#)]);
        let ctx = context(store, Default::default()).with_extensions(registry());
        let url = CustomProvider::new(ctx).upload(&png_request(2)).await.unwrap();
        assert!(url.starts_with("https://echo.example.com/1700000000000-"), "{}", url);
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_unknown_extension() {
        let store = MemoryStore::with_entries([("formCustomConfig", r#"{"extension":"nope"}"#)]);
        let ctx = context(store, Default::default()).with_extensions(registry());
        let err = CustomProvider::new(ctx).upload(&png_request(2)).await.unwrap_err();
        assert!(matches!(err, Error::Extension(_)));
    }

    #[tokio::test]
    async fn test_missing_config() {
        let ctx = context(MemoryStore::new(), Default::default()).with_extensions(registry());
        let err = CustomProvider::new(ctx).upload(&png_request(2)).await.unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
    }
}
