//! Upload strategy trait definition.

use async_trait::async_trait;

use picbed_common::{Result, UploadRequest};

/// A backend that stores an asset and returns its public URL.
///
/// Implementations own their backend's authentication and request
/// choreography. Configuration is read fresh from the client store on every
/// call, and failures surface unchanged to the dispatcher.
#[async_trait]
pub trait UploadProvider: Send + Sync {
    /// Get the provider name, matching its store identifier (e.g. "github", "r2").
    fn name(&self) -> &str;

    /// Upload the asset.
    ///
    /// # Postconditions
    /// - Returns an absolute URL at which the asset is publicly reachable
    ///
    /// # Errors
    /// - `ConfigMissing` when the backend configuration is absent or invalid
    /// - `Authentication`, `Network`, `BackendStatus` or `ResponseShape`
    ///   for failures talking to the backend
    async fn upload(&self, request: &UploadRequest) -> Result<String>;
}
