//! User-supplied upload extensions.
//!
//! An extension is trusted code registered under a name and selected through
//! the `formCustom` configuration. It runs with the full privileges of the
//! host: it receives the raw content, the file, a bundle of helpers and a
//! [`Completion`] it must settle exactly once.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error};

use picbed_common::{Clock, Error, Result, UploadFile, UploadRequest};

use crate::filename;
use crate::signer;

/// Helpers handed to an extension.
#[derive(Clone)]
pub struct ExtensionUtil {
    /// Shared HTTP client.
    pub http: reqwest::Client,
    clock: Arc<dyn Clock>,
}

impl ExtensionUtil {
    /// Create the helper bundle.
    pub fn new(http: reqwest::Client, clock: Arc<dyn Clock>) -> Self {
        Self { http, clock }
    }

    /// `YYYY/MM/DD` directory for the current date.
    pub fn date_directory(&self) -> String {
        filename::date_directory(self.clock.now())
    }

    /// Collision-resistant name for `original`.
    pub fn date_filename(&self, original: &str) -> String {
        filename::date_filename(self.clock.as_ref(), original)
    }

    pub fn hmac_sha1(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        signer::hmac_sha1(key, data)
    }

    pub fn base64(&self, data: &[u8]) -> String {
        signer::base64_encode(data)
    }

    pub fn url_safe_base64(&self, data: &[u8]) -> String {
        signer::url_safe_base64(data)
    }

    pub fn md5_hex(&self, data: &[u8]) -> String {
        signer::md5_hex(data)
    }

    pub fn utf16_to_utf8(&self, units: &[u16]) -> Result<String> {
        signer::utf16_to_utf8(units)
    }
}

/// Settles an extension's upload. Consumed on first use.
pub struct Completion {
    tx: oneshot::Sender<Result<String>>,
}

impl Completion {
    /// Report the uploaded URL.
    pub fn succeed(self, url: impl Into<String>) {
        let _ = self.tx.send(Ok(url.into()));
    }

    /// Report a failure.
    pub fn fail(self, err: Error) {
        let _ = self.tx.send(Err(err));
    }
}

/// A named upload extension.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Perform the upload and settle `done`.
    ///
    /// `done` may be settled after this returns, e.g. from a spawned task.
    /// Returning an error before `done` is settled fails the upload.
    async fn run(&self, content: &str, file: &UploadFile, util: &ExtensionUtil, done: Completion) -> Result<()>;
}

/// Registry of extensions by name.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: HashMap<String, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension.
    ///
    /// # Errors
    /// - `name` is already registered
    pub fn register(&mut self, name: impl Into<String>, extension: Arc<dyn Extension>) -> Result<()> {
        let name = name.into();
        if self.extensions.contains_key(&name) {
            return Err(Error::Extension(format!("Extension '{}' is already registered", name)));
        }
        self.extensions.insert(name, extension);
        Ok(())
    }

    /// Look up an extension by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Extension>> {
        self.extensions
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Extension(format!("Extension '{}' is not registered", name)))
    }
}

/// Drives one extension to a single result.
///
/// The first settlement wins: a [`Completion`] settled before the extension
/// returns an error still decides the outcome; an error returned before
/// settling is reported as [`Error::Extension`]. An extension that drops its
/// completion unsettled fails the upload.
pub struct ExtensionRunner {
    util: ExtensionUtil,
}

impl ExtensionRunner {
    pub fn new(util: ExtensionUtil) -> Self {
        Self { util }
    }

    /// Run `extension` for `request`.
    pub async fn run(&self, extension: &dyn Extension, request: &UploadRequest) -> Result<String> {
        let (tx, mut rx) = oneshot::channel();
        let outcome = extension
            .run(&request.content, &request.file, &self.util, Completion { tx })
            .await;

        if let Err(err) = outcome {
            return match rx.try_recv() {
                Ok(settled) => settled,
                Err(_) => {
                    error!("Extension failed: {}", err);
                    Err(Error::Extension(format!("Extension failed: {}", err)))
                }
            };
        }

        match rx.await {
            Ok(settled) => {
                debug!("Extension settled");
                settled
            }
            Err(_) => Err(Error::Extension(
                "Extension finished without reporting a result".to_string(),
            )),
        }
    }
}
