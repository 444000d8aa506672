//! Common types used throughout picbed.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Binary asset handed to an upload strategy.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Original file name, including extension.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// File content.
    pub data: Bytes,
}

impl UploadFile {
    /// Create a file from its name, MIME type and content.
    ///
    /// The size is taken from the content length.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// A single upload call.
///
/// `content` is the base64 text of the asset, consumed by the git-hosting
/// backends; every other backend reads `file`.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Base64/text representation of the asset.
    pub content: String,
    /// The binary asset.
    pub file: UploadFile,
}

impl UploadRequest {
    /// Create a new request.
    pub fn new(content: impl Into<String>, file: UploadFile) -> Self {
        Self {
            content: content.into(),
            file,
        }
    }
}

/// Credential string that zeroizes on drop and never prints its value.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, Serialize, Deserialize)]
#[zeroize(drop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a credential.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the credential value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}
