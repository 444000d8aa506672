//! Multi-backend image upload for picbed.
//!
//! A [`Dispatcher`] reads the selected backend from an injected
//! [`ClientStore`] and hands the asset to one [`UploadProvider`] strategy,
//! which signs and sends it and returns the public URL.
//!
//! # Design Principles
//! - Closed backend set: [`Backend`] is an exhaustive enum
//! - Injected state: configuration, token cache, clock and endpoints come
//!   from [`UploadContext`], never from globals
//! - Async operations: every network step is awaited, nothing blocks
//! - Unified error semantics: one error taxonomy across all backends

pub mod backend;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod extension;
pub mod file_store;
pub mod filename;
pub mod http;
pub mod provider;
pub mod providers;
pub mod resolver;
pub mod signer;
pub mod store;
pub mod token_cache;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::Backend;
pub use context::{Endpoints, UploadContext};
pub use dispatcher::Dispatcher;
pub use extension::{Completion, Extension, ExtensionRegistry, ExtensionRunner, ExtensionUtil};
pub use file_store::JsonFileStore;
pub use filename::{date_directory, date_filename, FilenameKey};
pub use provider::UploadProvider;
pub use resolver::{ConfigResolver, GitPool, SharedPools};
pub use store::{ClientStore, ClientStoreExt, MemoryStore};
pub use token_cache::{TokenCache, TokenCacheEntry};
