//! Run one receipt image through extraction and persistence.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use civet_backend::domain::ports::{ReceiptIngestionCommand, ReceiptOwner};
use civet_backend::domain::{
    BestEffortCache, LineReconstructor, ReceiptExtractionService, ReceiptIngestionService,
    StructuredExtractionService, TextExtractionService,
};
use civet_backend::outbound::cache::FileResponseCache;
use civet_backend::outbound::openai::OpenAiHttpStructuredExtractor;
use civet_backend::outbound::persistence::{
    DbPool, DieselReceiptRepository, PoolConfig, run_pending_migrations,
};
use civet_backend::outbound::storage::FilesystemBlobStore;
use civet_backend::outbound::vision::VisionHttpTextDetector;
use civet_backend::settings::PipelineSettings;
use clap::Parser;
use ortho_config::OrthoConfig as _;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

/// `ingest-receipt` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ingest-receipt",
    about = "Extract a receipt image into structured records, skipping images already stored",
    version
)]
struct CliArgs {
    /// Path to the receipt image.
    #[arg(long = "image", value_name = "path")]
    image_path: PathBuf,
    /// Outing the receipt belongs to.
    #[arg(long = "outing-id", value_name = "uuid")]
    outing_id: Uuid,
    /// Original file name recorded with the receipt. Defaults to the image
    /// path's final component.
    #[arg(long = "file-name", value_name = "name")]
    file_name: Option<String>,
}

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = load_settings()?;

    let file_name = resolve_file_name(&args.image_path, args.file_name)?;
    let image = read_image(&args.image_path)?;

    let database_url = settings.database_url().map_err(io::Error::other)?.to_owned();
    let migration_url = database_url.clone();
    tokio::task::spawn_blocking(move || run_pending_migrations(&migration_url))
        .await
        .map_err(|error| io::Error::other(format!("migration task failed: {error}")))?
        .map_err(io::Error::other)?;
    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;

    let cache = BestEffortCache::new(Arc::new(
        FileResponseCache::open(settings.cache_dir())
            .map_err(|error| io::Error::other(format!("open response cache: {error}")))?,
    ));
    let blob_store = Arc::new(
        FilesystemBlobStore::open(
            settings.blob_root(),
            settings.blob_public_url().map_err(io::Error::other)?,
        )
        .map_err(|error| io::Error::other(format!("open blob store: {error}")))?,
    );
    let detector = Arc::new(
        VisionHttpTextDetector::new(
            &settings.vision_endpoint().map_err(io::Error::other)?,
            settings.vision_api_key().map_err(io::Error::other)?,
            settings.request_timeout(),
        )
        .map_err(|error| io::Error::other(format!("create vision client: {error}")))?,
    );
    let extractor = Arc::new(
        OpenAiHttpStructuredExtractor::new(
            &settings.openai_base_url().map_err(io::Error::other)?,
            settings.openai_api_key().map_err(io::Error::other)?,
            settings.openai_model(),
            settings.request_timeout(),
        )
        .map_err(|error| io::Error::other(format!("create openai client: {error}")))?,
    );

    let extraction = ReceiptExtractionService::new(
        blob_store,
        TextExtractionService::new(
            detector,
            cache.clone(),
            LineReconstructor::new(settings.line_y_threshold()),
        ),
        StructuredExtractionService::new(extractor, cache),
    );
    let command =
        ReceiptIngestionService::new(Arc::new(DieselReceiptRepository::new(pool)), extraction);

    let outcome = command
        .process_upload(
            &image,
            &file_name,
            ReceiptOwner {
                outing_id: args.outing_id,
            },
        )
        .await
        .map_err(|error| {
            io::Error::other(format!("ingest failed at {}: {error}", error.stage()))
        })?;

    println!("fingerprint={}", outcome.fingerprint);
    println!("already_existed={}", outcome.already_existed);
    match outcome.receipt_id {
        Some(receipt_id) => println!("receipt_id={receipt_id}"),
        None => println!("receipt_id="),
    }

    Ok(())
}

/// Load `CIVET_*` settings without consuming the command-line arguments.
fn load_settings() -> io::Result<PipelineSettings> {
    PipelineSettings::load_from_iter([OsString::from("ingest-receipt")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))
}

fn resolve_file_name(path: &Path, explicit: Option<String>) -> io::Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "--file-name must not be empty when provided",
            ));
        }
        return Ok(value);
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "image path must be a file"))
}

fn read_image(path: &Path) -> io::Result<Vec<u8>> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "image path must be a file"))?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
        io::Error::other(format!(
            "open image parent directory '{}': {error}",
            parent.display()
        ))
    })?;
    let bytes = directory.read(Path::new(file_name)).map_err(|error| {
        io::Error::other(format!("read image '{}': {error}", path.display()))
    })?;
    if bytes.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("image '{}' is empty", path.display()),
        ));
    }
    Ok(bytes)
}
