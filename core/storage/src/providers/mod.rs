//! Upload strategies, one per backend.
//!
//! - Git hosting: GitHub (header token, branch fallback) and Gitee (token in body)
//! - Region object stores: Qiniu, Aliyun OSS, Tencent COS
//! - S3-compatible presigned PUT: Minio, Cloudflare R2
//! - Upyun, Telegram, Cloudinary, WeChat official accounts
//! - Registered extensions

pub mod aliyun;
pub mod cloudinary;
pub mod custom;
mod git;
pub mod gitee;
pub mod github;
pub mod minio;
pub mod qiniu;
pub mod r2;
pub mod s3;
pub mod telegram;
pub mod tencent;
pub mod upyun;
pub mod wechat;

pub use aliyun::AliOssProvider;
pub use cloudinary::CloudinaryProvider;
pub use custom::CustomProvider;
pub use gitee::GiteeProvider;
pub use github::GitHubProvider;
pub use minio::MinioProvider;
pub use qiniu::QiniuProvider;
pub use r2::R2Provider;
pub use telegram::TelegramProvider;
pub use tencent::TxCosProvider;
pub use upyun::UpyunProvider;
pub use wechat::WeChatProvider;
