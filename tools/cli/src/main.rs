//! picbed CLI - Command line interface for image uploads.
//!
//! Selects and configures backends in a JSON client store and uploads files
//! through the dispatcher.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use picbed_common::UploadFile;
use picbed_storage::config::{
    AliOssConfig, CloudinaryConfig, ExtensionConfig, GitRepoConfig, MinioConfig, MpConfig, QiniuConfig,
    R2Config, TelegramConfig, TxCosConfig, UpyunConfig,
};
use picbed_storage::store::{config_key, BACKEND_KEY, SHARED_POOL_KEY};
use picbed_storage::{Backend, ClientStore, Dispatcher, JsonFileStore, SharedPools, UploadContext};

#[derive(Parser)]
#[command(name = "picbed")]
#[command(about = "picbed - Upload images to the configured backend")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Client store file (default: <config dir>/picbed/store.json).
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and print its URL.
    Upload {
        /// File to upload.
        file: PathBuf,

        /// Shared git pools as JSON ({"github": {...}, "gitee": {...}}).
        #[arg(short, long)]
        pools: Option<PathBuf>,

        /// Origin recorded in git commit messages.
        #[arg(short, long, default_value = "picbed-cli")]
        origin: String,
    },

    /// Select the upload backend.
    Use {
        /// Backend id, e.g. "github", "r2", "aliOSS".
        backend: String,

        /// Use the shared pool instead of your own repository (git backends).
        #[arg(long)]
        shared: bool,
    },

    /// Show the selected backend and configured backends.
    Show,

    /// Store a backend configuration.
    Config {
        /// Backend id.
        backend: String,

        /// Configuration as a JSON object.
        json: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = open_store(cli.store)?;

    match cli.command {
        Commands::Upload { file, pools, origin } => cmd_upload(store, &file, pools.as_deref(), origin).await,

        Commands::Use { backend, shared } => cmd_use(store.as_ref(), &backend, shared).await,

        Commands::Show => cmd_show(store.as_ref()).await,

        Commands::Config { backend, json } => cmd_config(store.as_ref(), &backend, &json).await,
    }
}

/// Open the JSON client store.
fn open_store(path: Option<PathBuf>) -> Result<Arc<JsonFileStore>> {
    let path = match path {
        Some(path) => path,
        None => dirs::config_dir()
            .context("Cannot determine config directory, pass --store")?
            .join("picbed")
            .join("store.json"),
    };
    let store = JsonFileStore::new(&path).with_context(|| format!("Failed to open store {}", path.display()))?;
    Ok(Arc::new(store))
}

fn parse_backend(id: &str) -> Result<Backend> {
    Backend::parse(id).with_context(|| {
        let ids: Vec<&str> = Backend::ALL.iter().map(Backend::as_str).collect();
        format!("Unknown backend '{}'. Use one of: {}", id, ids.join(", "))
    })
}

/// Upload a file.
async fn cmd_upload(store: Arc<JsonFileStore>, path: &Path, pools: Option<&Path>, origin: String) -> Result<()> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .context("Upload path has no file name")?;
    let mime_type = mime_guess::from_path(path).first_or_octet_stream().to_string();
    let content = BASE64_STANDARD.encode(&data);
    info!("Uploading {} ({}, {} bytes)", name, mime_type, data.len());

    let mut ctx = UploadContext::new(store).with_origin(origin);
    if let Some(pools) = pools {
        let raw = tokio::fs::read_to_string(pools)
            .await
            .with_context(|| format!("Failed to read pools {}", pools.display()))?;
        let pools: SharedPools = serde_json::from_str(&raw).context("Invalid pools file")?;
        ctx = ctx.with_pools(pools);
    }

    let url = Dispatcher::new(ctx)
        .dispatch(content, UploadFile::new(name, mime_type, data))
        .await
        .context("Upload failed")?;

    println!("{}", url);

    Ok(())
}

/// Select the backend.
async fn cmd_use(store: &dyn ClientStore, id: &str, shared: bool) -> Result<()> {
    let backend = parse_backend(id)?;
    store.set(BACKEND_KEY, backend.as_str()).await?;

    if matches!(backend, Backend::GitHub | Backend::Gitee) {
        store
            .set(SHARED_POOL_KEY, if shared { "true" } else { "false" })
            .await?;
    } else if shared {
        anyhow::bail!("--shared only applies to github and gitee");
    }

    println!("Using backend: {}", backend);

    Ok(())
}

/// Show the current selection.
async fn cmd_show(store: &dyn ClientStore) -> Result<()> {
    let stored = store.get(BACKEND_KEY).await?;
    let backend = Backend::from_id(stored.as_deref());

    println!("Backend: {}", backend);
    if stored.as_deref() != Some(backend.as_str()) {
        println!("  (stored id: {})", stored.as_deref().unwrap_or("<unset>"));
    }
    if matches!(backend, Backend::GitHub | Backend::Gitee) {
        let shared = store.get(SHARED_POOL_KEY).await?.as_deref() == Some("true");
        println!("  Shared pool: {}", shared);
    }

    println!("Configured backends:");
    for candidate in Backend::ALL {
        if store.get(&config_key(candidate.as_str())).await?.is_some() {
            println!("  {}", candidate);
        }
    }

    Ok(())
}

fn check<T: DeserializeOwned>(value: &serde_json::Value) -> Result<()> {
    serde_json::from_value::<T>(value.clone())?;
    Ok(())
}

/// Validate and store a backend configuration.
async fn cmd_config(store: &dyn ClientStore, id: &str, json: &str) -> Result<()> {
    let backend = parse_backend(id)?;
    let value: serde_json::Value = serde_json::from_str(json).context("Configuration is not valid JSON")?;

    match backend {
        Backend::GitHub | Backend::Gitee => check::<GitRepoConfig>(&value),
        Backend::Qiniu => check::<QiniuConfig>(&value),
        Backend::AliOss => check::<AliOssConfig>(&value),
        Backend::TxCos => check::<TxCosConfig>(&value),
        Backend::Minio => check::<MinioConfig>(&value),
        Backend::R2 => check::<R2Config>(&value),
        Backend::Upyun => check::<UpyunConfig>(&value),
        Backend::Telegram => check::<TelegramConfig>(&value),
        Backend::Cloudinary => check::<CloudinaryConfig>(&value),
        Backend::WeChat => check::<MpConfig>(&value),
        Backend::Custom => check::<ExtensionConfig>(&value),
    }
    .with_context(|| format!("Invalid {} configuration", backend))?;

    store.set(&config_key(backend.as_str()), &value.to_string()).await?;
    println!("Stored {} configuration", backend);

    Ok(())
}
