//! Thumb Server - resize-on-demand image thumbnails.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thumb_server::{
    config::{CheckConfig, Cli, Command, ServeConfig},
    server::create_router,
    store::{DirectoryStore, FsStore, StoreDir},
    thumbnail::{is_hidden, ImageCodec, ThumbnailService},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let store = FsStore::new(config.store.layout());
    if let Err(e) = store.ensure_layout().await {
        error!("Cannot prepare image directories: {}", e);
        return ExitCode::FAILURE;
    }

    let thumbnail_config = config.thumbnail_config();

    info!("Thumb Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Store: {}", store.identifier());
    info!(
        "  Full images: {}",
        store.layout().dir_path(StoreDir::Full).display()
    );
    info!(
        "  Thumbnails: {}",
        store.layout().dir_path(StoreDir::Thumb).display()
    );
    info!(
        "  Default size: {}x{} (max {})",
        thumbnail_config.default_width, thumbnail_config.default_height, thumbnail_config.max_dimension
    );
    info!("  JPEG quality: {}", config.jpeg_quality);
    match thumbnail_config.codec_timeout {
        Some(limit) => info!("  Codec timeout: {:?}", limit),
        None => info!("  Codec timeout: none"),
    }
    info!(
        "  Cache: {}MB in memory, max-age {}s",
        config.cache_bytes / (1024 * 1024),
        config.cache_max_age
    );

    let service = ThumbnailService::with_config(
        Arc::new(store),
        Arc::new(ImageCodec::with_quality(config.jpeg_quality)),
        thumbnail_config,
        config.cache_bytes,
    );

    let router = create_router(service, config.router_config());

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/api/images/list", addr);
    info!(
        "    curl -F files=@photo.jpg http://{}/api/images/upload",
        addr
    );
    info!(
        "    curl -o thumb.jpg 'http://{}/api/images?filename=photo&width=200&height=200'",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "thumb_server=debug,tower_http=debug"
    } else {
        "thumb_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Thumb Server Configuration Check");
    println!("════════════════════════════════");
    println!();

    if let Err(e) = config.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let store = FsStore::new(config.store.layout());
    let mut failed = false;

    for dir in [StoreDir::Full, StoreDir::Thumb] {
        let path = store.layout().dir_path(dir);
        match store.list_entries(dir).await {
            Ok(entries) => {
                let visible: Vec<_> = entries.iter().filter(|name| !is_hidden(name)).collect();
                println!(
                    "✓ {} directory: {} ({} file(s))",
                    dir,
                    path.display(),
                    visible.len()
                );

                if config.list_images {
                    for name in &visible {
                        println!("    {}", name);
                    }
                }
            }
            Err(e) => {
                println!("✗ {} directory: {}", dir, e);
                failed = true;
            }
        }
    }

    println!();
    println!("════════════════════════════════");

    if failed {
        println!("✗ Some checks failed");
        println!();
        println!("Please check:");
        println!("  - The assets directory exists (the server creates it on start)");
        println!("  - The process can read both image directories");
        return ExitCode::FAILURE;
    }

    println!("✓ All checks passed!");
    ExitCode::SUCCESS
}
