//! Storage key naming.
//!
//! Keys are `<epoch-ms>-<uuid4>.<ext>`, optionally under a `YYYY/MM/DD`
//! date directory or a user-configured path prefix.

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use picbed_common::Clock;

/// A storage key split into its directory and file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameKey {
    /// Directory part, without leading or trailing slash. May be empty.
    pub directory: String,
    /// File name part.
    pub name: String,
}

impl FilenameKey {
    /// Create a key from a directory and name.
    pub fn new(directory: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
        }
    }

    /// Key with the name placed under the date directory of `now`.
    pub fn dated(now: DateTime<Utc>, name: impl Into<String>) -> Self {
        Self::new(date_directory(now), name)
    }

    /// Key with the name under an optional user path; empty paths are dropped.
    pub fn under(path: Option<&str>, name: impl Into<String>) -> Self {
        let directory = path
            .map(|p| p.trim_matches('/'))
            .unwrap_or_default();
        Self::new(directory, name)
    }

    /// Full object key, joining directory and name with `/`.
    pub fn to_key(&self) -> String {
        if self.directory.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.directory, self.name)
        }
    }
}

/// Zero-padded `YYYY/MM/DD` directory for the given instant.
pub fn date_directory(now: DateTime<Utc>) -> String {
    format!("{}/{:02}/{:02}", now.year(), now.month(), now.day())
}

/// Extension of `filename`: everything after the last `.`, or the whole
/// name when it has no dot.
pub fn extension(filename: &str) -> &str {
    filename.rsplit('.').next().unwrap_or_default()
}

/// Collision-resistant name `<epoch-ms>-<uuid4>.<ext>` for `original`.
pub fn date_filename(clock: &dyn Clock, original: &str) -> String {
    format!("{}-{}.{}", clock.now_millis(), Uuid::new_v4(), extension(original))
}

/// Check whether `name` already looks like an uploaded asset name.
///
/// Matches names containing `image-` and a 13-digit millisecond timestamp
/// immediately followed by `-`.
pub fn is_generated_name(name: &str) -> bool {
    if !name.contains("image-") {
        return false;
    }
    let bytes = name.as_bytes();
    bytes.iter().enumerate().any(|(i, b)| {
        *b == b'-' && i >= 13 && bytes[i - 13..i].iter().all(u8::is_ascii_digit)
    })
}
