//! Per-backend configuration objects.
//!
//! Each struct mirrors the JSON persisted under `<backend>Config` in the
//! client store. They are deserialized fresh on every upload call.

use serde::{Deserialize, Deserializer, Serialize};

use picbed_common::Secret;

/// Custom repository settings for a git-hosting backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepoConfig {
    /// Repository as `user/repo` or a full repository URL.
    pub repo: String,
    /// Target branch; empty means `main`.
    #[serde(default)]
    pub branch: String,
    /// Personal access token.
    pub access_token: Secret,
}

/// Qiniu Kodo settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QiniuConfig {
    pub access_key: String,
    pub secret_key: Secret,
    pub bucket: String,
    /// Region code such as `z0` or `na0`.
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub path: Option<String>,
    /// Public domain objects are served from, including scheme.
    pub domain: String,
}

/// Aliyun OSS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliOssConfig {
    /// Region endpoint prefix such as `oss-cn-hangzhou`.
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub access_key_secret: Secret,
    /// Defaults to true when unset.
    #[serde(default, rename = "useSSL")]
    pub use_ssl: Option<bool>,
    #[serde(default)]
    pub cdn_host: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl AliOssConfig {
    /// Whether requests and URLs use https.
    pub fn secure(&self) -> bool {
        self.use_ssl.unwrap_or(true)
    }
}

/// Tencent COS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxCosConfig {
    pub secret_id: String,
    pub secret_key: Secret,
    /// Bucket name including the app id suffix.
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub cdn_host: Option<String>,
}

/// Minio settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinioConfig {
    /// Host name without scheme.
    pub endpoint: String,
    #[serde(default, deserialize_with = "port_from_any")]
    pub port: Option<u16>,
    #[serde(default, rename = "useSSL")]
    pub use_ssl: bool,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: Secret,
}

impl MinioConfig {
    /// Base URL `http(s)://endpoint[:port]`.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        match self.port {
            Some(port) => format!("{}://{}:{}", scheme, self.endpoint, port),
            None => format!("{}://{}", scheme, self.endpoint),
        }
    }
}

/// Cloudflare R2 settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct R2Config {
    pub account_id: String,
    pub access_key: String,
    pub secret_key: Secret,
    pub bucket: String,
    #[serde(default)]
    pub path: Option<String>,
    /// Public domain objects are served from, including scheme.
    pub domain: String,
}

/// Upyun settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpyunConfig {
    pub bucket: String,
    pub operator: String,
    pub password: Secret,
    #[serde(default)]
    pub path: Option<String>,
    pub domain: String,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    pub token: Secret,
    pub chat_id: String,
}

/// Cloudinary settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudinaryConfig {
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub api_key: String,
    /// Enables signed uploads when present.
    #[serde(default)]
    pub api_secret: Option<Secret>,
    /// Required for unsigned uploads.
    #[serde(default)]
    pub upload_preset: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    /// Replaces the host of returned URLs.
    #[serde(default)]
    pub domain: Option<String>,
}

/// WeChat official-account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MpConfig {
    #[serde(rename = "appID")]
    pub app_id: String,
    pub appsecret: Secret,
    /// Reverse-proxy origin substituted for the API host.
    #[serde(default)]
    pub proxy_origin: Option<String>,
}

/// Custom extension settings: the name of a registered extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionConfig {
    pub extension: String,
}

/// Treat empty strings as unset.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Accept a port given as a number, a numeric string, an empty string or null.
fn port_from_any<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid port {}", n))),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid port '{}'", s))),
        other => Err(D::Error::custom(format!("invalid port {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minio_port_variants() {
        let parse = |port: &str| -> MinioConfig {
            serde_json::from_str(&format!(
                r#"{{"endpoint":"minio.local","port":{},"bucket":"b","accessKey":"a","secretKey":"s"}}"#,
                port
            ))
            .unwrap()
        };

        assert_eq!(parse("9000").port, Some(9000));
        assert_eq!(parse("\"9000\"").port, Some(9000));
        assert_eq!(parse("\"\"").port, None);
        assert_eq!(parse("null").port, None);
        assert_eq!(parse("9000").base_url(), "http://minio.local:9000");
    }

    #[test]
    fn test_minio_invalid_port_rejected() {
        let raw = r#"{"endpoint":"m","port":"abc","bucket":"b","accessKey":"a","secretKey":"s"}"#;
        assert!(serde_json::from_str::<MinioConfig>(raw).is_err());
    }

    #[test]
    fn test_ali_oss_secure_default() {
        let raw = r#"{"region":"oss-cn-hangzhou","bucket":"b","accessKeyId":"id","accessKeySecret":"s"}"#;
        let config: AliOssConfig = serde_json::from_str(raw).unwrap();
        assert!(config.secure());

        let raw = r#"{"region":"r","bucket":"b","accessKeyId":"id","accessKeySecret":"s","useSSL":false}"#;
        let config: AliOssConfig = serde_json::from_str(raw).unwrap();
        assert!(!config.secure());
    }

    #[test]
    fn test_mp_field_names() {
        let raw = r#"{"appID":"wx1","appsecret":"s","proxyOrigin":"https://proxy.example"}"#;
        let config: MpConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.app_id, "wx1");
        assert_eq!(config.proxy_origin.as_deref(), Some("https://proxy.example"));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(&Some(String::new())), None);
        assert_eq!(non_empty(&None), None);
        assert_eq!(non_empty(&Some("x".to_string())), Some("x"));
    }
}
