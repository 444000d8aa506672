//! The closed set of upload backends.

use std::fmt;

/// Upload backend, identified in the client store by its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    AliOss,
    Minio,
    TxCos,
    Qiniu,
    Gitee,
    GitHub,
    WeChat,
    #[default]
    R2,
    Upyun,
    Telegram,
    Cloudinary,
    Custom,
}

impl Backend {
    /// Every backend, in selection-menu order.
    pub const ALL: [Backend; 12] = [
        Backend::AliOss,
        Backend::Minio,
        Backend::TxCos,
        Backend::Qiniu,
        Backend::Gitee,
        Backend::GitHub,
        Backend::WeChat,
        Backend::R2,
        Backend::Upyun,
        Backend::Telegram,
        Backend::Cloudinary,
        Backend::Custom,
    ];

    /// Store identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::AliOss => "aliOSS",
            Backend::Minio => "minio",
            Backend::TxCos => "txCOS",
            Backend::Qiniu => "qiniu",
            Backend::Gitee => "gitee",
            Backend::GitHub => "github",
            Backend::WeChat => "mp",
            Backend::R2 => "r2",
            Backend::Upyun => "upyun",
            Backend::Telegram => "telegram",
            Backend::Cloudinary => "cloudinary",
            Backend::Custom => "formCustom",
        }
    }

    /// Parse a store identifier, if it names a backend.
    pub fn parse(id: &str) -> Option<Backend> {
        Backend::ALL.into_iter().find(|b| b.as_str() == id)
    }

    /// Backend for a stored identifier. Unknown or missing ids select the
    /// default backend.
    pub fn from_id(id: Option<&str>) -> Backend {
        id.and_then(Backend::parse).unwrap_or_default()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for backend in Backend::ALL {
            assert_eq!(Backend::parse(backend.as_str()), Some(backend));
        }
    }

    #[test]
    fn test_unknown_falls_back_to_r2() {
        assert_eq!(Backend::from_id(None), Backend::R2);
        assert_eq!(Backend::from_id(Some("default")), Backend::R2);
        assert_eq!(Backend::from_id(Some("GitHub")), Backend::R2);
        assert_eq!(Backend::from_id(Some("mp")), Backend::WeChat);
    }
}
