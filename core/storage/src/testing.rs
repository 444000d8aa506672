//! Fixtures shared by the strategy tests.

use std::sync::Arc;

use picbed_common::{FixedClock, UploadFile, UploadRequest};
use wiremock::MockServer;

use crate::context::{Endpoints, UploadContext};
use crate::store::MemoryStore;

/// 2023-11-14T22:13:20Z.
pub const NOW_MILLIS: i64 = 1_700_000_000_000;

/// Context over `store` with a frozen clock.
pub fn context(store: MemoryStore, endpoints: Endpoints) -> UploadContext {
    UploadContext::new(Arc::new(store))
        .with_clock(Arc::new(FixedClock::from_millis(NOW_MILLIS)))
        .with_endpoints(endpoints)
}

/// Endpoints routing every backend to `server`.
pub fn endpoints_for(server: &MockServer) -> Endpoints {
    let uri = server.uri();
    Endpoints {
        github_api: uri.clone(),
        gitee_api: uri.clone(),
        upyun_api: uri.clone(),
        telegram_api: uri.clone(),
        cloudinary_api: uri.clone(),
        weixin_api: uri.clone(),
        qiniu_upload: Some(uri.clone()),
        ali_oss: Some(uri.clone()),
        tx_cos: Some(uri.clone()),
        r2: Some(uri.clone()),
        image_proxy: "https://wsrv.nl".to_string(),
    }
}

/// A file with the given name, type and size.
pub fn file(name: &str, mime_type: &str, size: usize) -> UploadFile {
    UploadFile::new(name, mime_type, vec![7u8; size])
}

/// `photo.png` request of `size` bytes.
pub fn png_request(size: usize) -> UploadRequest {
    UploadRequest::new("aGVsbG8=", file("photo.png", "image/png", size))
}
