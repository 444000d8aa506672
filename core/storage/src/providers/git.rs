//! Helpers shared by the git-hosting backends.

use picbed_common::{Error, Result};

/// Commit message recorded for an upload.
pub fn upload_message(origin: &str) -> String {
    format!("Upload by {}", origin)
}

/// Extract `content.download_url`, also accepting it nested under `data`.
pub fn download_url(body: &serde_json::Value) -> Result<String> {
    body.pointer("/data/content/download_url")
        .or_else(|| body.pointer("/content/download_url"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::ResponseShape("Response lacks content.download_url".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_download_url_shapes() {
        let flat = json!({"content": {"download_url": "https://a/x.png"}});
        assert_eq!(download_url(&flat).unwrap(), "https://a/x.png");

        let nested = json!({"data": {"content": {"download_url": "https://b/x.png"}}, "content": {"download_url": "https://a/x.png"}});
        assert_eq!(download_url(&nested).unwrap(), "https://b/x.png");

        assert!(matches!(download_url(&json!({})), Err(Error::ResponseShape(_))));
    }
}
