//! Injected collaborators shared by every upload strategy.

use std::sync::Arc;

use picbed_common::{Clock, SystemClock};

use crate::extension::ExtensionRegistry;
use crate::http;
use crate::resolver::{ConfigResolver, SharedPools};
use crate::store::ClientStore;
use crate::token_cache::TokenCache;

/// Remote base URLs.
///
/// Production hosts by default. Backends whose host is derived from the
/// bucket or account (OSS, COS, R2, Qiniu) take an optional override that
/// replaces the request origin while the returned public URL keeps the real
/// host.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub github_api: String,
    pub gitee_api: String,
    pub upyun_api: String,
    pub telegram_api: String,
    pub cloudinary_api: String,
    pub weixin_api: String,
    pub qiniu_upload: Option<String>,
    pub ali_oss: Option<String>,
    pub tx_cos: Option<String>,
    pub r2: Option<String>,
    /// Image proxy used to serve WeChat images through a reverse proxy.
    pub image_proxy: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_string(),
            gitee_api: "https://gitee.com/api/v5".to_string(),
            upyun_api: "https://v0.api.upyun.com".to_string(),
            telegram_api: "https://api.telegram.org".to_string(),
            cloudinary_api: "https://api.cloudinary.com/v1_1".to_string(),
            weixin_api: "https://api.weixin.qq.com".to_string(),
            qiniu_upload: None,
            ali_oss: None,
            tx_cos: None,
            r2: None,
            image_proxy: "https://wsrv.nl".to_string(),
        }
    }
}

/// Everything a strategy needs besides its own configuration.
#[derive(Clone)]
pub struct UploadContext {
    pub store: Arc<dyn ClientStore>,
    pub clock: Arc<dyn Clock>,
    pub http: reqwest::Client,
    pub endpoints: Arc<Endpoints>,
    pub pools: Arc<SharedPools>,
    pub extensions: Arc<ExtensionRegistry>,
    /// Origin URL of the host application, used in audit messages.
    pub origin: String,
}

impl UploadContext {
    /// Create a context over `store` with production defaults.
    pub fn new(store: Arc<dyn ClientStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            http: http::default_client(),
            endpoints: Arc::new(Endpoints::default()),
            pools: Arc::new(SharedPools::default()),
            extensions: Arc::new(ExtensionRegistry::new()),
            origin: String::new(),
        }
    }

    /// Set the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the remote endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Arc::new(endpoints);
        self
    }

    /// Set the shared git pools.
    pub fn with_pools(mut self, pools: SharedPools) -> Self {
        self.pools = Arc::new(pools);
        self
    }

    /// Set the extension registry.
    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = Arc::new(extensions);
        self
    }

    /// Set the origin used in audit messages.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Git credential resolver over this context.
    pub fn resolver(&self) -> ConfigResolver {
        ConfigResolver::new(self.store.clone(), self.pools.clone())
    }

    /// Token cache for `namespace` over this context.
    pub fn token_cache(&self, namespace: &str) -> TokenCache {
        TokenCache::new(self.store.clone(), self.clock.clone(), namespace)
    }
}
